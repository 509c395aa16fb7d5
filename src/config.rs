use std::{path::PathBuf, sync::Arc};

use anyhow::Context;

use crate::{
    assets::{
        loader::{AssetLoader, AssetLoaderOpts, DiagnosticFn},
        source::{AssetSource, FsAssetSource, RoutedAssetSource},
    },
    compile::layout::LayoutConfig,
    foundation::core::Rgba8,
    foundation::error::{BannerError, BannerResult},
    render::{RenderSettings, export::DEFAULT_JPEG_QUALITY},
};

/// Default network timeout for remote assets.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
/// Engine-wide settings. Every field has a default, so `{}` is a valid config file.
pub struct EngineConfig {
    /// Root that relative asset URIs resolve against.
    pub asset_root: PathBuf,
    /// Font used for all banner text. Unset picks an installed sans-serif face.
    pub font_path: Option<PathBuf>,
    pub http_timeout_secs: u64,
    /// Fetch/decode worker count. `None` picks the loader default.
    pub loader_threads: Option<usize>,
    pub jpeg_quality: u8,
    /// Color exports are flattened over.
    pub background_rgba: Rgba8,
    pub layout: LayoutConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let layout = LayoutConfig::default();
        Self {
            asset_root: PathBuf::from("."),
            font_path: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            loader_threads: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            background_rgba: layout.colors.background,
            layout,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> BannerResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| BannerError::serde(format!("config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> BannerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> BannerResult<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(BannerError::validation("jpeg_quality must be in 1..=100"));
        }
        if self.loader_threads == Some(0) {
            return Err(BannerError::validation("loader_threads must be > 0"));
        }
        if self.http_timeout_secs == 0 {
            return Err(BannerError::validation("http_timeout_secs must be > 0"));
        }
        Ok(())
    }

    /// Apply `BANNERKIT_*` environment overrides. Unparseable values are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = var("BANNERKIT_FONT_PATH").filter(|v| !v.trim().is_empty()) {
            self.font_path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("BANNERKIT_ASSET_ROOT").filter(|v| !v.trim().is_empty()) {
            self.asset_root = PathBuf::from(v);
        }
        if let Some(n) = var("BANNERKIT_LOADER_THREADS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            self.loader_threads = Some(n);
        }
        if let Some(q) = var("BANNERKIT_JPEG_QUALITY")
            .and_then(|v| v.trim().parse::<u8>().ok())
            .filter(|q| (1..=100).contains(q))
        {
            self.jpeg_quality = q;
        }
        self
    }

    /// Filesystem source rooted at `asset_root`, with a network fallback when the `http`
    /// feature is enabled.
    pub fn asset_source(&self) -> BannerResult<Arc<dyn AssetSource>> {
        let routed = RoutedAssetSource::new(FsAssetSource::new(self.asset_root.clone()));
        #[cfg(feature = "http")]
        let routed = routed.with_http(Box::new(crate::assets::source::HttpAssetSource::new(
            std::time::Duration::from_secs(self.http_timeout_secs),
        )?));
        Ok(Arc::new(routed))
    }

    pub fn loader(&self, diagnostics: Option<DiagnosticFn>) -> BannerResult<AssetLoader> {
        let opts = AssetLoaderOpts {
            threads: self.loader_threads,
        };
        let source = self.asset_source()?;
        match diagnostics {
            Some(d) => AssetLoader::with_diagnostics(source, opts, d),
            None => AssetLoader::new(source, opts),
        }
    }

    /// Render settings with the configured font, or an installed sans-serif face when
    /// `font_path` is unset.
    pub fn render_settings(&self) -> BannerResult<RenderSettings> {
        let settings = RenderSettings::default();
        match &self.font_path {
            Some(path) => settings.with_font_file(path),
            None => Ok(settings.with_system_font()),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
