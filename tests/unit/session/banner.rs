use std::{collections::HashMap, io::Cursor};

use super::*;
use crate::{
    assets::{loader::AssetLoaderOpts, source::AssetSource},
    compile::plan::Layer,
    composition::model::{BannerCategory, StickerPlacement, TextFields},
    foundation::error::BannerError,
    slots::{
        gesture::GestureSession,
        persistence::InMemorySlotPersistence,
        store::{SlotKey, SlotKind, TransformPatch},
    },
};

fn png(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

struct MapSource(HashMap<String, Vec<u8>>);

impl AssetSource for MapSource {
    fn fetch(&self, uri: &str) -> BannerResult<Vec<u8>> {
        self.0
            .get(uri)
            .cloned()
            .ok_or_else(|| BannerError::evaluation(format!("404 {uri}")))
    }
}

fn session() -> (BannerSession, Arc<InMemorySlotPersistence>) {
    let source = MapSource(HashMap::from([
        ("achiever.png".to_string(), png(8, 10, [200, 0, 0, 255])),
        ("sticker.png".to_string(), png(4, 4, [0, 200, 0, 255])),
        ("slot-bg.png".to_string(), png(6, 6, [0, 0, 200, 255])),
    ]));
    let loader = AssetLoader::new(Arc::new(source), AssetLoaderOpts { threads: Some(2) }).unwrap();
    let persistence = Arc::new(InMemorySlotPersistence::new());

    let mut d = BannerDescriptor::new(BannerCategory::Birthday);
    d.image_refs.achiever = Some("achiever.png".into());
    d.text_fields = TextFields {
        user_name: Some("Asha Rao".into()),
        ..TextFields::default()
    };

    let s = BannerSession::new(
        d,
        loader,
        SlotBank::new(persistence.clone()),
        &EngineConfig::default(),
    )
    .unwrap()
    .with_slot_group(GroupKey::new("asha", "birthday"));
    (s, persistence)
}

#[test]
fn load_pulls_in_slot_assets_and_caches_identical_sets() {
    let (mut s, _) = session();
    let key = SlotKey::new("asha", "birthday", 1);
    s.slots_mut()
        .store_mut(SlotKind::Sticker)
        .upsert_slot(&key, "sticker.png", None)
        .unwrap();
    s.slots_mut()
        .store_mut(SlotKind::Background)
        .upsert_slot(&key, "slot-bg.png", None)
        .unwrap();

    let uris = s.uri_set().unwrap();
    assert_eq!(
        uris.iter().collect::<Vec<_>>(),
        ["achiever.png", "slot-bg.png", "sticker.png"]
    );

    let outcome = s.load(|_| {}).unwrap();
    assert!(matches!(outcome, LoadOutcome::Committed(_)));
    assert!(s.assets().all_succeeded());
    let fetched = s.loader().fetch_count();

    assert!(matches!(s.load(|_| {}).unwrap(), LoadOutcome::Cached(_)));
    assert_eq!(s.loader().fetch_count(), fetched);

    let plan = s.compose().unwrap();
    assert!(plan.has_layer(Layer::Achiever));
    assert!(plan.has_layer(Layer::BackgroundImage));
    assert!(plan.has_layer(Layer::Stickers));
}

#[test]
fn preview_waits_for_a_real_width() {
    let (mut s, _) = session();
    s.load(|_| {}).unwrap();
    assert!(s.preview(0.0).unwrap().is_none());
    assert!(!s.viewport().is_renderable());

    let frame = s.preview(270.0).unwrap().unwrap();
    assert_eq!((frame.width, frame.height), (270, 270));
    assert_eq!(s.viewport().scale(), 0.2);
}

#[test]
fn export_ignores_the_preview_scale() {
    let (mut s, _) = session();
    s.load(|_| {}).unwrap();

    let before = s.export(ExportProfile::Capture).unwrap();
    s.preview(135.0).unwrap();
    let after = s.export(ExportProfile::Capture).unwrap();
    assert_eq!((after.width, after.height), (1080, 1080));
    assert_eq!(before, after);
}

#[test]
fn committed_gestures_show_up_in_the_next_composition() {
    let (mut s, persistence) = session();
    let key = SlotKey::new("asha", "birthday", 1);
    let store = s.slots_mut().store_mut(SlotKind::Sticker);
    store.upsert_slot(&key, "sticker.png", None).unwrap();
    s.load(|_| {}).unwrap();
    let first = s.compose().unwrap().fingerprint();

    let store = s.slots_mut().store_mut(SlotKind::Sticker);
    let mut g = GestureSession::begin(store, key.clone()).unwrap();
    g.update(store, &TransformPatch::rotation(45.0)).unwrap();
    g.commit(store).unwrap();
    assert_eq!(persistence.records()[0].rotation, 45.0);

    let second = s.compose().unwrap();
    assert_ne!(second.fingerprint(), first);
    assert_eq!(second.ops_for(Layer::Stickers).count(), 1);
}

#[test]
fn descriptor_stickers_and_unknown_categories_still_render() {
    let (mut s, _) = session();
    let mut d = BannerDescriptor::new("graduation".to_string());
    d.image_refs.achiever = Some("achiever.png".into());
    d.stickers = vec![StickerPlacement::new("s1", "sticker.png")];
    s.set_descriptor(d);
    s.load(|_| {}).unwrap();

    let plan = s.compose().unwrap();
    assert!(!plan.has_layer(Layer::CategoryBlock));
    assert!(plan.has_layer(Layer::Achiever));
    assert!(plan.has_layer(Layer::Stickers));
    assert!(s.export(ExportProfile::Custom { width: 64, height: 64 }).is_ok());
}

#[test]
fn torn_down_sessions_keep_their_last_assets() {
    let (mut s, _) = session();
    s.load(|_| {}).unwrap();
    let before = s.assets().clone();
    s.teardown();
    let mut d = s.descriptor().clone();
    d.image_refs.achiever = Some("sticker.png".into());
    s.set_descriptor(d);
    assert!(matches!(s.load(|_| {}).unwrap(), LoadOutcome::TornDown));
    assert!(Arc::ptr_eq(s.assets(), &before));
}
