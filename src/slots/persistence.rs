use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    foundation::error::{BannerError, BannerResult},
    slots::store::{GroupKey, Slot, SlotKey, SlotKind, SlotTransform},
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Persisted form of one slot, field-compatible with the external slot tables.
pub struct SlotRecord {
    pub entity_id: String,
    pub banner_category: String,
    pub slot_number: u8,
    #[serde(default)]
    pub slot_kind: SlotKind,
    pub image_url: String,
    pub position_x: f64,
    pub position_y: f64,
    pub scale: f64,
    pub rotation: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl SlotRecord {
    pub fn from_slot(kind: SlotKind, group: &GroupKey, slot: &Slot) -> Self {
        Self {
            entity_id: group.entity_id.clone(),
            banner_category: group.banner_category.clone(),
            slot_number: slot.slot_number,
            slot_kind: kind,
            image_url: slot.image_uri.clone(),
            position_x: slot.transform.position_x,
            position_y: slot.transform.position_y,
            scale: slot.transform.scale,
            rotation: slot.transform.rotation_deg,
            is_active: slot.is_active,
        }
    }

    pub fn into_slot(self) -> Slot {
        Slot {
            slot_number: self.slot_number,
            image_uri: self.image_url,
            transform: SlotTransform {
                position_x: self.position_x,
                position_y: self.position_y,
                scale: self.scale,
                rotation_deg: self.rotation,
            },
            is_active: self.is_active,
        }
    }

    fn key(&self) -> RecordKey {
        (
            self.slot_kind,
            self.entity_id.clone(),
            self.banner_category.clone(),
            self.slot_number,
        )
    }

    fn in_group(&self, kind: SlotKind, group: &GroupKey) -> bool {
        self.slot_kind == kind
            && self.entity_id == group.entity_id
            && self.banner_category == group.banner_category
    }
}

type RecordKey = (SlotKind, String, String, u8);

/// External store for slot records.
///
/// Implementations must be safe to share between threads; the store calls exactly one write
/// method per logical edit.
pub trait SlotPersistence: Send + Sync {
    fn load_group(&self, kind: SlotKind, group: &GroupKey) -> BannerResult<Vec<SlotRecord>>;
    fn upsert(&self, record: &SlotRecord) -> BannerResult<()>;
    fn delete(&self, kind: SlotKind, key: &SlotKey) -> BannerResult<()>;
    fn replace_group(
        &self,
        kind: SlotKind,
        group: &GroupKey,
        records: &[SlotRecord],
    ) -> BannerResult<()>;
}

#[derive(Debug, Default)]
/// Process-local backend that counts writes.
pub struct InMemorySlotPersistence {
    records: Mutex<BTreeMap<RecordKey, SlotRecord>>,
    writes: AtomicU64,
}

impl InMemorySlotPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = SlotRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.key(), r)).collect();
        Self {
            records: Mutex::new(map),
            writes: AtomicU64::new(0),
        }
    }

    /// Number of write calls (upsert, delete, replace) served so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Snapshot of every record.
    pub fn records(&self) -> Vec<SlotRecord> {
        self.lock().values().cloned().collect()
    }

    /// Overwrite one record as if another session wrote it. Not counted as a write.
    pub fn put_external(&self, record: SlotRecord) {
        self.lock().insert(record.key(), record);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<RecordKey, SlotRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SlotPersistence for InMemorySlotPersistence {
    fn load_group(&self, kind: SlotKind, group: &GroupKey) -> BannerResult<Vec<SlotRecord>> {
        Ok(self
            .lock()
            .values()
            .filter(|r| r.in_group(kind, group))
            .cloned()
            .collect())
    }

    fn upsert(&self, record: &SlotRecord) -> BannerResult<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(record.key(), record.clone());
        Ok(())
    }

    fn delete(&self, kind: SlotKind, key: &SlotKey) -> BannerResult<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.lock().remove(&(
            kind,
            key.entity_id.clone(),
            key.banner_category.clone(),
            key.slot_number,
        ));
        Ok(())
    }

    fn replace_group(
        &self,
        kind: SlotKind,
        group: &GroupKey,
        records: &[SlotRecord],
    ) -> BannerResult<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut map = self.lock();
        map.retain(|_, r| !r.in_group(kind, group));
        for r in records {
            map.insert(r.key(), r.clone());
        }
        Ok(())
    }
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct SlotFile {
    #[serde(default)]
    slots: Vec<SlotRecord>,
}

#[derive(Debug)]
/// Backend holding every record in one JSON document (`{"slots": [...]}`).
///
/// A missing file reads as empty. Writes replace the file through a sibling temp file.
pub struct JsonFileSlotPersistence {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileSlotPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in the file.
    pub fn all_records(&self) -> BannerResult<Vec<SlotRecord>> {
        let _g = self.lock();
        Ok(self.read()?.slots)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self) -> BannerResult<SlotFile> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SlotFile::default()),
            Err(e) => {
                return Err(BannerError::persistence(format!(
                    "read slot file '{}': {e}",
                    self.path.display()
                )));
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(SlotFile::default());
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            BannerError::persistence(format!("parse slot file '{}': {e}", self.path.display()))
        })
    }

    fn write(&self, mut file: SlotFile) -> BannerResult<()> {
        file.slots.sort_by_key(SlotRecord::key);
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| BannerError::persistence(format!("serialize slot file: {e}")))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                BannerError::persistence(format!("create '{}': {e}", parent.display()))
            })?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| BannerError::persistence(format!("write '{}': {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            BannerError::persistence(format!("replace '{}': {e}", self.path.display()))
        })
    }

    fn modify(&self, f: impl FnOnce(&mut Vec<SlotRecord>)) -> BannerResult<()> {
        let _g = self.lock();
        let mut file = self.read()?;
        f(&mut file.slots);
        self.write(file)
    }
}

impl SlotPersistence for JsonFileSlotPersistence {
    fn load_group(&self, kind: SlotKind, group: &GroupKey) -> BannerResult<Vec<SlotRecord>> {
        let _g = self.lock();
        Ok(self
            .read()?
            .slots
            .into_iter()
            .filter(|r| r.in_group(kind, group))
            .collect())
    }

    fn upsert(&self, record: &SlotRecord) -> BannerResult<()> {
        self.modify(|slots| {
            let key = record.key();
            slots.retain(|r| r.key() != key);
            slots.push(record.clone());
        })
    }

    fn delete(&self, kind: SlotKind, key: &SlotKey) -> BannerResult<()> {
        self.modify(|slots| {
            slots.retain(|r| {
                !(r.in_group(kind, &key.group()) && r.slot_number == key.slot_number)
            });
        })
    }

    fn replace_group(
        &self,
        kind: SlotKind,
        group: &GroupKey,
        records: &[SlotRecord],
    ) -> BannerResult<()> {
        self.modify(|slots| {
            slots.retain(|r| !r.in_group(kind, group));
            slots.extend_from_slice(records);
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/slots/persistence.rs"]
mod tests;
