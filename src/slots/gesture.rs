//! Interactive drag, resize and rotate editing.
//!
//! A gesture snapshots the slot transform on begin, applies every intermediate value to the
//! in-memory store only, and issues exactly one persistence write on commit. Cancel restores
//! the snapshot without writing.

use crate::{
    foundation::error::{BannerError, BannerResult},
    slots::store::{GroupKey, Slot, SlotKey, SlotTransform, SlotTransformStore, TransformPatch},
};

#[derive(Debug)]
#[must_use = "a gesture must be committed or cancelled"]
pub struct GestureSession {
    key: SlotKey,
    group: GroupKey,
    snapshot: SlotTransform,
    current: SlotTransform,
    epoch: u64,
    updates: u32,
}

impl GestureSession {
    /// Start editing `key`. The slot must exist.
    pub fn begin(store: &mut SlotTransformStore, key: SlotKey) -> BannerResult<Self> {
        let slot = store.get(&key)?.ok_or_else(|| BannerError::SlotNotFound {
            entity_id: key.entity_id.clone(),
            banner_category: key.banner_category.clone(),
            slot_number: key.slot_number,
        })?;
        let group = key.group();
        let epoch = store.epoch(&group);
        tracing::debug!(key = %key, "gesture begin");
        Ok(Self {
            key,
            group,
            snapshot: slot.transform,
            current: slot.transform,
            epoch,
            updates: 0,
        })
    }

    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    /// Transform captured when the gesture began.
    pub fn snapshot(&self) -> SlotTransform {
        self.snapshot
    }

    pub fn current(&self) -> SlotTransform {
        self.current
    }

    /// Apply an intermediate value. Only the in-memory store changes.
    pub fn update(
        &mut self,
        store: &mut SlotTransformStore,
        patch: &TransformPatch,
    ) -> BannerResult<SlotTransform> {
        self.ensure_current(store)?;
        let slot = store.apply_live(&self.key, patch)?;
        self.current = slot.transform;
        self.updates += 1;
        Ok(self.current)
    }

    /// Move the center by a percent offset measured from the gesture start, as produced by a
    /// pointer drag.
    pub fn drag_by(
        &mut self,
        store: &mut SlotTransformStore,
        dx_percent: f64,
        dy_percent: f64,
    ) -> BannerResult<SlotTransform> {
        let patch = TransformPatch::position(
            self.snapshot.position_x + dx_percent,
            self.snapshot.position_y + dy_percent,
        );
        self.update(store, &patch)
    }

    /// Persist the final transform with a single write.
    ///
    /// Fails without writing if the slot group was invalidated after the gesture began; the
    /// store then re-reads persistence on next access.
    pub fn commit(self, store: &mut SlotTransformStore) -> BannerResult<Slot> {
        self.ensure_current(store)?;
        let slot = store.persist(&self.key)?;
        tracing::debug!(key = %self.key, updates = self.updates, "gesture committed");
        Ok(slot)
    }

    /// Restore the snapshot in memory. Nothing is written.
    pub fn cancel(self, store: &mut SlotTransformStore) -> BannerResult<()> {
        if store.epoch(&self.group) != self.epoch {
            // The stale copy was already dropped; nothing to restore.
            return Ok(());
        }
        store.restore_live(&self.key, self.snapshot)?;
        tracing::debug!(key = %self.key, "gesture cancelled");
        Ok(())
    }

    fn ensure_current(&self, store: &SlotTransformStore) -> BannerResult<()> {
        if store.epoch(&self.group) != self.epoch {
            tracing::warn!(key = %self.key, "slot group invalidated during gesture");
            return Err(BannerError::validation(format!(
                "slot group for {} was invalidated during the gesture",
                self.key
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/slots/gesture.rs"]
mod tests;
