//! Parcel store contract and the in-memory reference store.
//!
//! The store is the only persistent state the island core touches. All
//! methods take `&self` so one store can be shared between the manager and
//! running teardown tasks.

use std::fs;
use std::io::Write;
use std::path::Path;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use skyisle_common::{GridCellKey, OwnerId};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::parcel::{ParcelRecord, ParcelState, PlayerProfile};

/// Read/write contract for parcel records and player profiles.
pub trait ParcelStore {
    /// Parcel held by an owner in a slot.
    fn parcel(&self, owner: &OwnerId, slot: u32) -> Option<ParcelRecord>;

    /// Parcel occupying a cell.
    fn parcel_by_cell(&self, key: GridCellKey) -> Option<ParcelRecord>;

    /// All parcels of an owner, by slot.
    fn parcels_of(&self, owner: &OwnerId) -> Vec<ParcelRecord>;

    /// Inserts a record. Fails if its cell is taken.
    fn insert(&self, record: ParcelRecord) -> StoreResult<()>;

    /// Replaces the record occupying the same cell.
    fn update(&self, record: ParcelRecord) -> StoreResult<()>;

    /// Removes and returns the record of a cell.
    fn delete(&self, key: GridCellKey) -> StoreResult<ParcelRecord>;

    /// Records waiting for teardown.
    fn pending_teardowns(&self) -> Vec<ParcelRecord>;

    /// Profile of an owner, if one was ever stored.
    fn profile(&self, owner: &OwnerId) -> Option<PlayerProfile>;

    /// Inserts or replaces a profile.
    fn update_profile(&self, profile: PlayerProfile) -> StoreResult<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    parcels: Vec<ParcelRecord>,
    profiles: Vec<PlayerProfile>,
}

#[derive(Debug, Default)]
struct StoreState {
    parcels: AHashMap<GridCellKey, ParcelRecord>,
    profiles: AHashMap<OwnerId, PlayerProfile>,
}

/// In-memory store with JSON snapshots.
#[derive(Debug, Default)]
pub struct MemoryParcelStore {
    state: RwLock<StoreState>,
}

impl MemoryParcelStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a snapshot. A missing file yields an empty store.
    pub fn load_from<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No store snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let snapshot: StoreSnapshot = serde_json::from_slice(&fs::read(path)?)?;
        let store = Self::new();
        {
            let mut state = store.state.write();
            for record in snapshot.parcels {
                state.parcels.insert(record.key, record);
            }
            for profile in snapshot.profiles {
                state.profiles.insert(profile.owner.clone(), profile);
            }
        }
        info!("Loaded {} parcels from {}", store.len(), path.display());
        Ok(store)
    }

    /// Writes a snapshot, replacing the file only once fully written.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> StoreResult<()> {
        let path = path.as_ref();
        let snapshot = {
            let state = self.state.read();
            let mut parcels: Vec<_> = state.parcels.values().cloned().collect();
            parcels.sort_by_key(|record| record.key);
            let mut profiles: Vec<_> = state.profiles.values().cloned().collect();
            profiles.sort_by(|a, b| a.owner.as_str().cmp(b.owner.as_str()));
            StoreSnapshot { parcels, profiles }
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Number of parcel records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().parcels.len()
    }

    /// Whether the store holds no parcels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().parcels.is_empty()
    }
}

impl ParcelStore for MemoryParcelStore {
    fn parcel(&self, owner: &OwnerId, slot: u32) -> Option<ParcelRecord> {
        self.state
            .read()
            .parcels
            .values()
            .find(|record| record.owner == *owner && record.slot == slot)
            .cloned()
    }

    fn parcel_by_cell(&self, key: GridCellKey) -> Option<ParcelRecord> {
        self.state.read().parcels.get(&key).cloned()
    }

    fn parcels_of(&self, owner: &OwnerId) -> Vec<ParcelRecord> {
        let mut parcels: Vec<_> = self
            .state
            .read()
            .parcels
            .values()
            .filter(|record| record.owner == *owner)
            .cloned()
            .collect();
        parcels.sort_by_key(|record| record.slot);
        parcels
    }

    fn insert(&self, record: ParcelRecord) -> StoreResult<()> {
        let mut state = self.state.write();
        if state.parcels.contains_key(&record.key) {
            return Err(StoreError::CellTaken(record.key));
        }
        state.parcels.insert(record.key, record);
        Ok(())
    }

    fn update(&self, record: ParcelRecord) -> StoreResult<()> {
        let mut state = self.state.write();
        match state.parcels.get_mut(&record.key) {
            Some(existing) => {
                *existing = record;
                Ok(())
            },
            None => Err(StoreError::NotFound(record.key)),
        }
    }

    fn delete(&self, key: GridCellKey) -> StoreResult<ParcelRecord> {
        self.state
            .write()
            .parcels
            .remove(&key)
            .ok_or(StoreError::NotFound(key))
    }

    fn pending_teardowns(&self) -> Vec<ParcelRecord> {
        let mut pending: Vec<_> = self
            .state
            .read()
            .parcels
            .values()
            .filter(|record| record.state == ParcelState::PendingTeardown)
            .cloned()
            .collect();
        pending.sort_by_key(|record| record.key);
        pending
    }

    fn profile(&self, owner: &OwnerId) -> Option<PlayerProfile> {
        self.state.read().profiles.get(owner).cloned()
    }

    fn update_profile(&self, profile: PlayerProfile) -> StoreResult<()> {
        self.state
            .write()
            .profiles
            .insert(profile.owner.clone(), profile);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcel::tests::record;
    use skyisle_common::BlockPos;

    #[test]
    fn test_insert_rejects_taken_cell() {
        let store = MemoryParcelStore::new();
        store
            .insert(record("alice", BlockPos::new(50, 60, 50)))
            .expect("insert failed");
        let clash = store.insert(record("bob", BlockPos::new(50, 60, 50)));
        assert!(matches!(clash, Err(StoreError::CellTaken(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_lookup_by_owner_case_insensitive() {
        let store = MemoryParcelStore::new();
        store
            .insert(record("Alice", BlockPos::new(50, 60, 50)))
            .expect("insert failed");
        let found = store.parcel(&OwnerId::new("alice"), 1).expect("not found");
        assert_eq!(found.owner.as_str(), "Alice");
        assert!(store.parcel(&OwnerId::new("alice"), 2).is_none());
    }

    #[test]
    fn test_update_and_delete() {
        let store = MemoryParcelStore::new();
        let mut parcel = record("alice", BlockPos::new(50, 60, 50));
        store.insert(parcel.clone()).expect("insert failed");
        parcel.state = ParcelState::PendingTeardown;
        store.update(parcel.clone()).expect("update failed");
        assert_eq!(store.pending_teardowns().len(), 1);
        store.delete(parcel.key).expect("delete failed");
        assert!(matches!(store.delete(parcel.key), Err(StoreError::NotFound(_))));
        assert!(matches!(store.update(parcel), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let path = dir.path().join("store").join("parcels.json");

        let store = MemoryParcelStore::new();
        store
            .insert(record("alice", BlockPos::new(50, 60, 50)))
            .expect("insert failed");
        store
            .update_profile(PlayerProfile::new(OwnerId::new("alice"), 2))
            .expect("profile failed");
        store.save_to(&path).expect("save failed");

        let loaded = MemoryParcelStore::load_from(&path).expect("load failed");
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.profile(&OwnerId::new("ALICE")).map(|p| p.resets_left),
            Some(2)
        );
    }

    #[test]
    fn test_load_missing_snapshot() {
        let store = MemoryParcelStore::load_from("/nonexistent/skyisle/parcels.json").expect("load failed");
        assert!(store.is_empty());
    }
}
