use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "bannerkit", version)]
struct Cli {
    /// Log debug output to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a banner descriptor to a JPEG or PNG.
    Render(RenderArgs),
    /// Inspect and edit per-entity sticker/background slots in a JSON slot file.
    Slots(SlotsArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input banner descriptor JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output image path; `.png` writes PNG, anything else JPEG.
    #[arg(long)]
    out: PathBuf,

    /// `native` (1350), `capture` (1080) or `WxH`.
    #[arg(long, default_value = "native")]
    profile: String,

    /// Engine config JSON. Without it, assets resolve next to the descriptor.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Font for banner text; overrides the config.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Slot file to pull stickers and backgrounds from.
    #[arg(long)]
    slots: Option<PathBuf>,

    /// Entity whose slots are drawn.
    #[arg(long, requires = "slots")]
    entity: Option<String>,

    /// Slot group category; defaults to the descriptor's category.
    #[arg(long, requires = "entity")]
    banner_category: Option<String>,
}

#[derive(Parser, Debug)]
struct SlotsArgs {
    /// JSON slot file. Created on first write.
    #[arg(long)]
    file: PathBuf,

    #[command(subcommand)]
    cmd: SlotsCommand,
}

#[derive(Subcommand, Debug)]
enum SlotsCommand {
    /// Print every slot of a group as JSON.
    List(GroupArgs),
    /// Create or replace a slot's image (and optionally its transform).
    Upsert(UpsertArgs),
    /// Patch a slot's transform.
    Transform(TransformArgs),
    /// Flip a slot's active flag.
    Toggle(SlotArgs),
    /// Delete a slot.
    Remove(SlotArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindChoice {
    Sticker,
    Background,
}

impl From<KindChoice> for bannerkit::SlotKind {
    fn from(k: KindChoice) -> Self {
        match k {
            KindChoice::Sticker => bannerkit::SlotKind::Sticker,
            KindChoice::Background => bannerkit::SlotKind::Background,
        }
    }
}

#[derive(Args, Debug)]
struct GroupArgs {
    #[arg(long)]
    entity: String,

    #[arg(long)]
    banner_category: String,

    #[arg(long, value_enum, default_value_t = KindChoice::Sticker)]
    kind: KindChoice,
}

impl GroupArgs {
    fn group(&self) -> bannerkit::GroupKey {
        bannerkit::GroupKey::new(&self.entity, &self.banner_category)
    }
}

#[derive(Args, Debug)]
struct SlotArgs {
    #[command(flatten)]
    group: GroupArgs,

    /// Slot number, 1-16.
    #[arg(long)]
    slot: u8,
}

impl SlotArgs {
    fn key(&self) -> bannerkit::SlotKey {
        self.group.group().slot(self.slot)
    }
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Horizontal center, percent of the canvas.
    #[arg(long, allow_negative_numbers = true)]
    x: Option<f64>,

    /// Vertical center, percent of the canvas.
    #[arg(long, allow_negative_numbers = true)]
    y: Option<f64>,

    #[arg(long)]
    scale: Option<f64>,

    /// Degrees.
    #[arg(long, allow_negative_numbers = true)]
    rotation: Option<f64>,
}

impl PatchArgs {
    fn patch(&self) -> bannerkit::TransformPatch {
        bannerkit::TransformPatch {
            position_x: self.x,
            position_y: self.y,
            scale: self.scale,
            rotation_deg: self.rotation,
        }
    }
}

#[derive(Args, Debug)]
struct UpsertArgs {
    #[command(flatten)]
    slot: SlotArgs,

    /// Image URI stored on the slot.
    #[arg(long)]
    image: String,

    #[command(flatten)]
    patch: PatchArgs,
}

#[derive(Args, Debug)]
struct TransformArgs {
    #[command(flatten)]
    slot: SlotArgs,

    #[command(flatten)]
    patch: PatchArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Slots(args) => cmd_slots(args),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &RenderArgs) -> anyhow::Result<bannerkit::EngineConfig> {
    let mut cfg = match &args.config {
        Some(path) => bannerkit::EngineConfig::from_path(path)?,
        None => bannerkit::EngineConfig {
            asset_root: args
                .in_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf(),
            ..bannerkit::EngineConfig::default()
        },
    }
    .with_env_overrides();
    if let Some(font) = &args.font {
        cfg.font_path = Some(font.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let descriptor = bannerkit::BannerDescriptor::from_path(&args.in_path)?;
    let cfg = load_config(&args)?;
    let profile = bannerkit::ExportProfile::parse(&args.profile)?;

    let persistence: Arc<dyn bannerkit::SlotPersistence> = match &args.slots {
        Some(path) => Arc::new(bannerkit::JsonFileSlotPersistence::new(path)),
        None => Arc::new(bannerkit::InMemorySlotPersistence::new()),
    };
    let group = args.entity.as_ref().map(|entity| {
        let category = args
            .banner_category
            .clone()
            .unwrap_or_else(|| descriptor.category.as_str().to_string());
        bannerkit::GroupKey::new(entity, category)
    });

    let mut session = bannerkit::BannerSession::from_config(descriptor, &cfg, persistence)?;
    if let Some(group) = group {
        session = session.with_slot_group(group);
    }

    let outcome = session.load(|event| {
        if let bannerkit::LoadEvent::Resolved {
            asset, progress, ..
        } = event
        {
            tracing::debug!(
                uri = %asset.uri,
                loaded = asset.is_loaded(),
                percent = progress.percent(),
                "asset resolved"
            );
        }
    })?;
    let assets = outcome
        .assets()
        .context("asset batch did not commit")?
        .clone();
    for failed in assets.iter().filter(|a| !a.is_loaded()) {
        eprintln!("missing asset: {}", failed.uri);
    }

    let raster = session.export_to_path(profile, &args.out)?;
    eprintln!(
        "wrote {} ({}x{})",
        args.out.display(),
        raster.width,
        raster.height
    );
    Ok(())
}

fn cmd_slots(args: SlotsArgs) -> anyhow::Result<()> {
    let persistence = Arc::new(bannerkit::JsonFileSlotPersistence::new(&args.file));
    let mut bank = bannerkit::SlotBank::new(persistence);

    match args.cmd {
        SlotsCommand::List(g) => {
            let slots = bank.store_mut(g.kind.into()).slots(&g.group())?;
            println!("{}", serde_json::to_string_pretty(&slots)?);
        }
        SlotsCommand::Upsert(a) => {
            let store = bank.store_mut(a.slot.group.kind.into());
            let key = a.slot.key();
            let current = store
                .get(&key)?
                .map(|s| s.transform)
                .unwrap_or_default();
            let transform = current.merged(&a.patch.patch());
            let slot = store.upsert_slot(&key, a.image, Some(transform))?;
            println!("{}", serde_json::to_string_pretty(&slot)?);
        }
        SlotsCommand::Transform(a) => {
            let patch = a.patch.patch();
            anyhow::ensure!(!patch.is_empty(), "pass at least one of --x --y --scale --rotation");
            let slot = bank
                .store_mut(a.slot.group.kind.into())
                .set_transform(&a.slot.key(), &patch)?;
            println!("{}", serde_json::to_string_pretty(&slot)?);
        }
        SlotsCommand::Toggle(a) => {
            let active = bank
                .store_mut(a.group.kind.into())
                .toggle_active(&a.key())?;
            println!("{}", if active { "active" } else { "inactive" });
        }
        SlotsCommand::Remove(a) => {
            let removed = bank
                .store_mut(a.group.kind.into())
                .remove_slot(&a.key())?;
            anyhow::ensure!(removed.is_some(), "slot {} does not exist", a.key());
            println!("removed {}", a.key());
        }
    }
    Ok(())
}
