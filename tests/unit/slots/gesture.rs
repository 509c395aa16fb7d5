use std::sync::Arc;

use super::*;
use crate::slots::{persistence::InMemorySlotPersistence, store::SlotKind};

fn setup() -> (Arc<InMemorySlotPersistence>, SlotTransformStore, SlotKey) {
    let backend = Arc::new(InMemorySlotPersistence::new());
    let mut store = SlotTransformStore::new(SlotKind::Sticker, backend.clone());
    let key = SlotKey::new("trip-bali", "bonanza", 1);
    store.upsert_slot(&key, "palm.png", None).unwrap();
    (backend, store, key)
}

#[test]
fn a_drag_is_one_write_regardless_of_moves() {
    let (backend, mut store, key) = setup();
    let writes_before = backend.write_count();

    let mut g = GestureSession::begin(&mut store, key.clone()).unwrap();
    for i in 1..=50 {
        g.drag_by(&mut store, f64::from(i) * 0.1, -f64::from(i) * 0.1)
            .unwrap();
    }
    // Live value is visible before commit.
    let live = store.get(&key).unwrap().unwrap().transform;
    assert!((live.position_x - 82.0).abs() < 1e-9);
    assert_eq!(backend.write_count(), writes_before);

    let slot = g.commit(&mut store).unwrap();
    assert_eq!(backend.write_count(), writes_before + 1);
    assert!((slot.transform.position_y - 57.0).abs() < 1e-9);
    assert_eq!(slot.transform.scale, 9.3);
    assert!((backend.records()[0].position_x - 82.0).abs() < 1e-9);
}

#[test]
fn cancel_restores_snapshot_without_writing() {
    let (backend, mut store, key) = setup();
    let writes_before = backend.write_count();

    let mut g = GestureSession::begin(&mut store, key.clone()).unwrap();
    g.update(&mut store, &TransformPatch::scale(2.0)).unwrap();
    g.update(&mut store, &TransformPatch::rotation(30.0)).unwrap();
    assert_eq!(g.current().rotation_deg, 30.0);
    g.cancel(&mut store).unwrap();

    assert_eq!(
        store.get(&key).unwrap().unwrap().transform,
        SlotTransform::default()
    );
    assert_eq!(backend.write_count(), writes_before);
}

#[test]
fn resize_and_rotate_do_not_clobber_each_other() {
    let (_, mut store, key) = setup();
    let mut resize = GestureSession::begin(&mut store, key.clone()).unwrap();
    resize.update(&mut store, &TransformPatch::scale(4.0)).unwrap();
    resize.commit(&mut store).unwrap();

    let mut rotate = GestureSession::begin(&mut store, key.clone()).unwrap();
    assert_eq!(rotate.snapshot().scale, 4.0);
    rotate
        .update(&mut store, &TransformPatch::rotation(-15.0))
        .unwrap();
    let slot = rotate.commit(&mut store).unwrap();
    assert_eq!(slot.transform.scale, 4.0);
    assert_eq!(slot.transform.rotation_deg, -15.0);
}

#[test]
fn invalidation_mid_gesture_blocks_commit() {
    let (backend, mut store, key) = setup();
    let writes_before = backend.write_count();
    let mut g = GestureSession::begin(&mut store, key.clone()).unwrap();
    g.update(&mut store, &TransformPatch::scale(5.0)).unwrap();

    store.invalidate(&key.group());
    assert!(g.update(&mut store, &TransformPatch::scale(6.0)).is_err());
    assert!(g.commit(&mut store).is_err());
    assert_eq!(backend.write_count(), writes_before);
    // The working copy was re-read from persistence.
    assert_eq!(store.get(&key).unwrap().unwrap().transform.scale, 9.3);
}

#[test]
fn begin_requires_an_existing_slot() {
    let (_, mut store, _) = setup();
    let err = GestureSession::begin(&mut store, SlotKey::new("trip-bali", "bonanza", 2)).unwrap_err();
    assert!(matches!(err, BannerError::SlotNotFound { slot_number: 2, .. }));
}
