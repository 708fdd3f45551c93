// Copyright 2025 Aeropub (https://github.com/aeropub)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Content-addressable object store.
//!
//! Objects are keyed by the hash of their encoded bytes, so storing the
//! same content twice is a no-op and snapshots that share files share
//! storage.

use super::objects::{GitObject, ObjectId, ObjectType};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    #[error("type mismatch for {oid}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        oid: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object encoding error: {0}")]
    Encoding(String),
}

/// Encoded object with its type tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredObject {
    obj_type: ObjectType,
    data: Vec<u8>,
}

/// Store statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_objects: u64,
    pub blob_count: u64,
    pub tree_count: u64,
    pub commit_count: u64,
    pub total_size_bytes: u64,
}

/// Object store backing one organization's repository.
///
/// Concurrent readers share the map freely; writers only ever insert, so no
/// object is observed half-written.
pub struct ObjectStore {
    objects: DashMap<ObjectId, StoredObject>,
    blob_count: AtomicU64,
    tree_count: AtomicU64,
    commit_count: AtomicU64,
    total_size: AtomicU64,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            blob_count: AtomicU64::new(0),
            tree_count: AtomicU64::new(0),
            commit_count: AtomicU64::new(0),
            total_size: AtomicU64::new(0),
        }
    }

    /// Store an object. Idempotent: identical content yields the same ID
    /// and is stored once.
    pub fn put<T: GitObject>(&self, obj: &T) -> Result<ObjectId, StoreError> {
        let data = obj.serialize_bytes();
        let oid = ObjectId::from_content(&data);

        if self.objects.contains_key(&oid) {
            return Ok(oid);
        }

        self.count_insert(T::TYPE, data.len());
        self.objects.insert(oid, StoredObject {
            obj_type: T::TYPE,
            data,
        });
        Ok(oid)
    }

    /// Fetch an object by ID, `None` if absent.
    pub fn get<T: GitObject>(&self, oid: &ObjectId) -> Result<Option<T>, StoreError> {
        match self.objects.get(oid) {
            Some(stored) => {
                if stored.obj_type != T::TYPE {
                    return Err(StoreError::TypeMismatch {
                        oid: *oid,
                        expected: T::TYPE,
                        actual: stored.obj_type,
                    });
                }
                let obj = T::deserialize_bytes(&stored.data)
                    .map_err(|e| StoreError::Encoding(e.to_string()))?;
                Ok(Some(obj))
            }
            None => Ok(None),
        }
    }

    /// Fetch an object, erroring if absent.
    pub fn get_required<T: GitObject>(&self, oid: &ObjectId) -> Result<T, StoreError> {
        self.get(oid)?.ok_or(StoreError::NotFound(*oid))
    }

    pub fn exists(&self, oid: &ObjectId) -> bool {
        self.objects.contains_key(oid)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_objects: self.objects.len() as u64,
            blob_count: self.blob_count.load(Ordering::Relaxed),
            tree_count: self.tree_count.load(Ordering::Relaxed),
            commit_count: self.commit_count.load(Ordering::Relaxed),
            total_size_bytes: self.total_size.load(Ordering::Relaxed),
        }
    }

    fn count_insert(&self, obj_type: ObjectType, size: usize) {
        match obj_type {
            ObjectType::Blob => self.blob_count.fetch_add(1, Ordering::Relaxed),
            ObjectType::Tree => self.tree_count.fetch_add(1, Ordering::Relaxed),
            ObjectType::Commit => self.commit_count.fetch_add(1, Ordering::Relaxed),
        };
        self.total_size.fetch_add(size as u64, Ordering::Relaxed);
    }

    // === Persistence ===

    /// Write every object to `path` (bincode).
    pub fn save_to_file(&self, path: &Path) -> Result<(), StoreError> {
        let objects: Vec<(ObjectId, StoredObject)> = self
            .objects
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();

        let data =
            bincode::serialize(&objects).map_err(|e| StoreError::Encoding(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Load a store previously written with [`save_to_file`].
    ///
    /// [`save_to_file`]: ObjectStore::save_to_file
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let data = std::fs::read(path)?;
        let objects: Vec<(ObjectId, StoredObject)> =
            bincode::deserialize(&data).map_err(|e| StoreError::Encoding(e.to_string()))?;

        let store = Self::new();
        for (oid, stored) in objects {
            store.count_insert(stored.obj_type, stored.data.len());
            store.objects.insert(oid, stored);
        }
        Ok(store)
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_git::objects::{Author, Blob, Commit, Tree};

    #[test]
    fn blob_roundtrip() {
        let store = ObjectStore::new();
        let blob = Blob::document(b"{\"id\":\"doc-1\"}".to_vec());
        let oid = store.put(&blob).unwrap();

        let fetched: Blob = store.get_required(&oid).unwrap();
        assert_eq!(fetched.data, blob.data);
    }

    #[test]
    fn content_addressable_dedup() {
        let store = ObjectStore::new();
        let oid1 = store.put(&Blob::document(b"same".to_vec())).unwrap();
        let oid2 = store.put(&Blob::document(b"same".to_vec())).unwrap();
        let oid3 = store.put(&Blob::document(b"other".to_vec())).unwrap();

        assert_eq!(oid1, oid2);
        assert_ne!(oid1, oid3);
        assert_eq!(store.stats().blob_count, 2);
    }

    #[test]
    fn type_mismatch_is_detected() {
        let store = ObjectStore::new();
        let oid = store.put(&Blob::document(b"content".to_vec())).unwrap();

        let result: Result<Option<Tree>, _> = store.get(&oid);
        assert!(matches!(result, Err(StoreError::TypeMismatch { .. })));
    }

    #[test]
    fn missing_object_errors_on_required_get() {
        let store = ObjectStore::new();
        let absent = ObjectId::from_content(b"never stored");
        let result: Result<Blob, _> = store.get_required(&absent);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.bin");

        let store = ObjectStore::new();
        let blob_oid = store.put(&Blob::document(b"payload".to_vec())).unwrap();
        let mut tree = Tree::new();
        tree.set_entry("documents/doc-1".into(), blob_oid);
        let tree_oid = store.put(&tree).unwrap();
        let commit = Commit::initial(tree_oid, "first", Author::new("e", "e@x.org"));
        let commit_oid = store.put(&commit).unwrap();

        store.save_to_file(&path).unwrap();

        let reloaded = ObjectStore::load_from_file(&path).unwrap();
        assert!(reloaded.exists(&blob_oid));
        assert!(reloaded.exists(&tree_oid));
        let fetched: Commit = reloaded.get_required(&commit_oid).unwrap();
        assert_eq!(fetched.message, "first");
        assert_eq!(reloaded.stats().total_objects, 3);
    }
}
