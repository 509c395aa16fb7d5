use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::{
    compile::{
        layout::{
            DEFAULT_STICKER_POSITION_X, DEFAULT_STICKER_POSITION_Y, DEFAULT_STICKER_ROTATION_DEG,
            DEFAULT_STICKER_SCALE,
        },
        plan::SlotLayers,
    },
    composition::model::StickerPlacement,
    foundation::error::{BannerError, BannerResult},
    slots::persistence::{SlotPersistence, SlotRecord},
};

/// Maximum number of slots per (entity, banner category) pair.
pub const SLOT_CAPACITY: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
/// The (entity, banner category) pair that owns a group of slots.
pub struct GroupKey {
    pub entity_id: String,
    pub banner_category: String,
}

impl GroupKey {
    pub fn new(entity_id: impl Into<String>, banner_category: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            banner_category: banner_category.into(),
        }
    }

    pub fn slot(&self, slot_number: u8) -> SlotKey {
        SlotKey {
            entity_id: self.entity_id.clone(),
            banner_category: self.banner_category.clone(),
            slot_number,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
/// Uniqueness key of one slot.
pub struct SlotKey {
    pub entity_id: String,
    pub banner_category: String,
    pub slot_number: u8,
}

impl SlotKey {
    pub fn new(
        entity_id: impl Into<String>,
        banner_category: impl Into<String>,
        slot_number: u8,
    ) -> Self {
        GroupKey::new(entity_id, banner_category).slot(slot_number)
    }

    pub fn group(&self) -> GroupKey {
        GroupKey::new(self.entity_id.clone(), self.banner_category.clone())
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}#{}",
            self.entity_id, self.banner_category, self.slot_number
        )
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
/// The two independent slot families an entity owns.
pub enum SlotKind {
    #[default]
    Sticker,
    Background,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Normalized transform: percent position of the center, scale multiplier, degrees.
pub struct SlotTransform {
    pub position_x: f64,
    pub position_y: f64,
    pub scale: f64,
    pub rotation_deg: f64,
}

impl Default for SlotTransform {
    fn default() -> Self {
        Self {
            position_x: DEFAULT_STICKER_POSITION_X,
            position_y: DEFAULT_STICKER_POSITION_Y,
            scale: DEFAULT_STICKER_SCALE,
            rotation_deg: DEFAULT_STICKER_ROTATION_DEG,
        }
    }
}

impl SlotTransform {
    pub fn validate(&self) -> BannerResult<()> {
        let vals = [self.position_x, self.position_y, self.scale, self.rotation_deg];
        if !vals.iter().all(|v| v.is_finite()) {
            return Err(BannerError::validation("slot transform values must be finite"));
        }
        if self.scale <= 0.0 {
            return Err(BannerError::validation("slot scale must be > 0"));
        }
        Ok(())
    }

    /// Copy with every provided field of `patch` applied.
    pub fn merged(self, patch: &TransformPatch) -> Self {
        Self {
            position_x: patch.position_x.unwrap_or(self.position_x),
            position_y: patch.position_y.unwrap_or(self.position_y),
            scale: patch.scale.unwrap_or(self.scale),
            rotation_deg: patch.rotation_deg.unwrap_or(self.rotation_deg),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Partial transform update; `None` keeps the current value.
pub struct TransformPatch {
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub scale: Option<f64>,
    pub rotation_deg: Option<f64>,
}

impl TransformPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            position_x: Some(x),
            position_y: Some(y),
            ..Self::default()
        }
    }

    pub fn scale(scale: f64) -> Self {
        Self {
            scale: Some(scale),
            ..Self::default()
        }
    }

    pub fn rotation(rotation_deg: f64) -> Self {
        Self {
            rotation_deg: Some(rotation_deg),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position_x.is_none()
            && self.position_y.is_none()
            && self.scale.is_none()
            && self.rotation_deg.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Slot {
    pub slot_number: u8,
    pub image_uri: String,
    pub transform: SlotTransform,
    /// Inactive slots stay editable but are hidden from end-user renders.
    pub is_active: bool,
}

impl Slot {
    pub fn to_placement(&self) -> StickerPlacement {
        StickerPlacement {
            id: format!("slot-{}", self.slot_number),
            image_uri: self.image_uri.clone(),
            position_x: Some(self.transform.position_x),
            position_y: Some(self.transform.position_y),
            scale: Some(self.transform.scale),
            rotation_deg: Some(self.transform.rotation_deg),
        }
    }
}

#[derive(Debug)]
enum GroupState {
    Loaded(BTreeMap<u8, Slot>),
    /// Re-read from persistence on next access.
    Stale,
}

/// Working copy over a [`SlotPersistence`] backend for one slot family.
///
/// Every public mutation is one logical write and goes to the backend before it is applied in
/// memory, so a failed write leaves the working copy untouched. Gesture edits use the
/// crate-private live path and write once on commit.
pub struct SlotTransformStore {
    kind: SlotKind,
    persistence: Arc<dyn SlotPersistence>,
    groups: HashMap<GroupKey, GroupState>,
    epochs: HashMap<GroupKey, u64>,
}

impl std::fmt::Debug for SlotTransformStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotTransformStore")
            .field("kind", &self.kind)
            .field("groups", &self.groups.len())
            .finish()
    }
}

impl SlotTransformStore {
    pub fn new(kind: SlotKind, persistence: Arc<dyn SlotPersistence>) -> Self {
        Self {
            kind,
            persistence,
            groups: HashMap::new(),
            epochs: HashMap::new(),
        }
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Slots of `group` ordered by slot number.
    pub fn slots(&mut self, group: &GroupKey) -> BannerResult<Vec<Slot>> {
        Ok(self.group_mut(group)?.values().cloned().collect())
    }

    pub fn get(&mut self, key: &SlotKey) -> BannerResult<Option<Slot>> {
        Ok(self.group_mut(&key.group())?.get(&key.slot_number).cloned())
    }

    /// Create or replace the slot at `key`.
    ///
    /// Replacing an existing slot swaps only the image unless `transform` is given; `is_active`
    /// is kept. New slots start active with the default transform. A new slot number in a group
    /// that already holds [`SLOT_CAPACITY`] slots fails with
    /// [`BannerError::SlotCapacityExceeded`].
    #[tracing::instrument(level = "debug", skip(self, image_uri, transform), fields(key = %key))]
    pub fn upsert_slot(
        &mut self,
        key: &SlotKey,
        image_uri: impl Into<String>,
        transform: Option<SlotTransform>,
    ) -> BannerResult<Slot> {
        let image_uri = image_uri.into();
        if image_uri.trim().is_empty() {
            return Err(BannerError::validation("slot image uri must be non-empty"));
        }
        if let Some(t) = &transform {
            t.validate()?;
        }

        let group = key.group();
        let kind = self.kind;
        let slots = self.group_mut(&group)?;
        let slot = match slots.get(&key.slot_number) {
            Some(existing) => Slot {
                image_uri,
                transform: transform.unwrap_or(existing.transform),
                ..existing.clone()
            },
            None => {
                if slots.len() >= SLOT_CAPACITY {
                    tracing::warn!(key = %key, "slot capacity reached");
                    return Err(BannerError::SlotCapacityExceeded {
                        entity_id: key.entity_id.clone(),
                        banner_category: key.banner_category.clone(),
                        capacity: SLOT_CAPACITY,
                    });
                }
                check_slot_number(key.slot_number)?;
                Slot {
                    slot_number: key.slot_number,
                    image_uri,
                    transform: transform.unwrap_or_default(),
                    is_active: true,
                }
            }
        };

        self.persistence
            .upsert(&SlotRecord::from_slot(kind, &group, &slot))?;
        self.group_mut(&group)?.insert(slot.slot_number, slot.clone());
        Ok(slot)
    }

    /// Merge the provided fields into the slot's transform; unset fields keep their values.
    pub fn set_transform(&mut self, key: &SlotKey, patch: &TransformPatch) -> BannerResult<Slot> {
        let group = key.group();
        let mut slot = self.require(key)?;
        let next = slot.transform.merged(patch);
        next.validate()?;
        slot.transform = next;
        self.persistence
            .upsert(&SlotRecord::from_slot(self.kind, &group, &slot))?;
        self.group_mut(&group)?.insert(slot.slot_number, slot.clone());
        Ok(slot)
    }

    /// Flip `is_active`; returns the new state.
    pub fn toggle_active(&mut self, key: &SlotKey) -> BannerResult<bool> {
        let group = key.group();
        let kind = self.kind;
        let mut slot = self.require(key)?;
        slot.is_active = !slot.is_active;
        self.persistence
            .upsert(&SlotRecord::from_slot(kind, &group, &slot))?;
        let active = slot.is_active;
        self.group_mut(&group)?.insert(slot.slot_number, slot);
        Ok(active)
    }

    /// Delete the slot; returns it if it existed.
    pub fn remove_slot(&mut self, key: &SlotKey) -> BannerResult<Option<Slot>> {
        let group = key.group();
        if !self.group_mut(&group)?.contains_key(&key.slot_number) {
            return Ok(None);
        }
        self.persistence.delete(self.kind, key)?;
        Ok(self.group_mut(&group)?.remove(&key.slot_number))
    }

    /// Active slots as sticker placements, ordered by slot number.
    pub fn sticker_placements(&mut self, group: &GroupKey) -> BannerResult<Vec<StickerPlacement>> {
        Ok(self
            .group_mut(group)?
            .values()
            .filter(|s| s.is_active)
            .map(Slot::to_placement)
            .collect())
    }

    /// Replace the working copy of `group` with the persisted records.
    pub fn rehydrate(&mut self, group: &GroupKey) -> BannerResult<usize> {
        let records = self.persistence.load_group(self.kind, group)?;
        let mut slots = BTreeMap::new();
        for record in records {
            let slot = record.into_slot();
            if check_slot_number(slot.slot_number).is_err() || slots.len() >= SLOT_CAPACITY {
                tracing::warn!(
                    entity = %group.entity_id,
                    category = %group.banner_category,
                    slot = slot.slot_number,
                    "ignoring out-of-range persisted slot"
                );
                continue;
            }
            slots.insert(slot.slot_number, slot);
        }
        let n = slots.len();
        tracing::debug!(entity = %group.entity_id, category = %group.banner_category, slots = n, "rehydrated slot group");
        self.groups.insert(group.clone(), GroupState::Loaded(slots));
        Ok(n)
    }

    /// Write the full working copy of `group` back to persistence.
    pub fn flush(&mut self, group: &GroupKey) -> BannerResult<()> {
        let kind = self.kind;
        let records: Vec<SlotRecord> = self
            .group_mut(group)?
            .values()
            .map(|slot| SlotRecord::from_slot(kind, group, slot))
            .collect();
        self.persistence.replace_group(kind, group, &records)
    }

    /// Drop the cached copy of `group`; the next access re-reads persistence. Gestures begun
    /// before this call can no longer commit.
    pub fn invalidate(&mut self, group: &GroupKey) {
        self.groups.insert(group.clone(), GroupState::Stale);
        *self.epochs.entry(group.clone()).or_default() += 1;
    }

    pub(crate) fn epoch(&self, group: &GroupKey) -> u64 {
        self.epochs.get(group).copied().unwrap_or(0)
    }

    /// Update the in-memory transform without touching persistence.
    pub(crate) fn apply_live(&mut self, key: &SlotKey, patch: &TransformPatch) -> BannerResult<Slot> {
        let mut slot = self.require(key)?;
        let next = slot.transform.merged(patch);
        next.validate()?;
        slot.transform = next;
        self.group_mut(&key.group())?
            .insert(slot.slot_number, slot.clone());
        Ok(slot)
    }

    /// Restore a transform in memory without touching persistence.
    pub(crate) fn restore_live(&mut self, key: &SlotKey, transform: SlotTransform) -> BannerResult<()> {
        if let Some(slot) = self.group_mut(&key.group())?.get_mut(&key.slot_number) {
            slot.transform = transform;
        }
        Ok(())
    }

    /// Write the current in-memory state of one slot.
    pub(crate) fn persist(&mut self, key: &SlotKey) -> BannerResult<Slot> {
        let slot = self.require(key)?;
        self.persistence
            .upsert(&SlotRecord::from_slot(self.kind, &key.group(), &slot))?;
        Ok(slot)
    }

    fn require(&mut self, key: &SlotKey) -> BannerResult<Slot> {
        self.get(key)?.ok_or_else(|| BannerError::SlotNotFound {
            entity_id: key.entity_id.clone(),
            banner_category: key.banner_category.clone(),
            slot_number: key.slot_number,
        })
    }

    fn group_mut(&mut self, group: &GroupKey) -> BannerResult<&mut BTreeMap<u8, Slot>> {
        if !matches!(self.groups.get(group), Some(GroupState::Loaded(_))) {
            self.rehydrate(group)?;
        }
        match self.groups.get_mut(group) {
            Some(GroupState::Loaded(slots)) => Ok(slots),
            _ => Err(BannerError::persistence(format!(
                "slot group {}/{} failed to load",
                group.entity_id, group.banner_category
            ))),
        }
    }
}

fn check_slot_number(n: u8) -> BannerResult<()> {
    if (1..=SLOT_CAPACITY as u8).contains(&n) {
        Ok(())
    } else {
        Err(BannerError::validation(format!(
            "slot number {n} out of range 1..={SLOT_CAPACITY}"
        )))
    }
}

/// Sticker and background slot families of every entity.
#[derive(Debug)]
pub struct SlotBank {
    pub stickers: SlotTransformStore,
    pub backgrounds: SlotTransformStore,
}

impl SlotBank {
    pub fn new(persistence: Arc<dyn SlotPersistence>) -> Self {
        Self {
            stickers: SlotTransformStore::new(SlotKind::Sticker, persistence.clone()),
            backgrounds: SlotTransformStore::new(SlotKind::Background, persistence),
        }
    }

    pub fn store_mut(&mut self, kind: SlotKind) -> &mut SlotTransformStore {
        match kind {
            SlotKind::Sticker => &mut self.stickers,
            SlotKind::Background => &mut self.backgrounds,
        }
    }

    /// Composition input for `group`: active stickers plus the lowest-numbered active
    /// background slot.
    pub fn layers(&mut self, group: &GroupKey) -> BannerResult<SlotLayers> {
        let background = self
            .backgrounds
            .slots(group)?
            .into_iter()
            .find(|s| s.is_active)
            .map(|s| s.image_uri);
        Ok(SlotLayers {
            background,
            stickers: self.stickers.sticker_placements(group)?,
        })
    }

    pub fn invalidate(&mut self, group: &GroupKey) {
        self.stickers.invalidate(group);
        self.backgrounds.invalidate(group);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/slots/store.rs"]
mod tests;
