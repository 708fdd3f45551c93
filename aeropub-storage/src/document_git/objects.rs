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

//! Object types for the document store.
//!
//! Content-addressable objects: Blob, Tree, Commit. All objects are
//! immutable once created; the hash of an object's encoded bytes is its
//! identity.

use aeropub_core::ActorIdentity;
use blake3::Hasher;
use serde::{Deserialize, Serialize};

/// Object ID - BLAKE3 hash over the encoded object (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub [u8; 32]);

impl ObjectId {
    /// Derive an ID from content bytes.
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex form for display (14 chars).
    pub fn short(&self) -> String {
        hex::encode(&self.0[..7])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, ParseIdError> {
        let bytes = hex::decode(hex_str).map_err(|_| ParseIdError::InvalidHex)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| ParseIdError::InvalidLength)?;
        Ok(Self(arr))
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self([0u8; 32])
    }
}

/// Parse errors for [`ObjectId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    #[error("invalid hex string")]
    InvalidHex,
    #[error("invalid length (expected 32 bytes)")]
    InvalidLength,
}

/// Object type tag, stored alongside the encoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectType {
    Blob = 1,
    Tree = 2,
    Commit = 3,
}

/// Content type hint for blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    /// Canonical document JSON (`documents/<doc-id>`).
    Document,
    /// Metadata sidecar JSON (`metadata/<doc-id>`).
    Sidecar,
    /// Anything else.
    Text,
}

/// Blob - raw file content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blob {
    pub data: Vec<u8>,
    pub content_type: ContentType,
}

impl Blob {
    pub fn new(data: Vec<u8>, content_type: ContentType) -> Self {
        Self { data, content_type }
    }

    pub fn document(data: Vec<u8>) -> Self {
        Self::new(data, ContentType::Document)
    }

    pub fn sidecar(data: Vec<u8>) -> Self {
        Self::new(data, ContentType::Sidecar)
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::from_content(&self.serialize_bytes())
    }

    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Tree entry - one repository path pointing at a blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Repository path, e.g. `documents/<doc-id>`.
    pub path: String,
    pub oid: ObjectId,
}

/// Tree - the full working-tree snapshot referenced by one commit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tree {
    /// Entries sorted by path so identical trees hash identically.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry at `path`, keeping sort order.
    pub fn set_entry(&mut self, path: String, oid: ObjectId) {
        self.entries.retain(|e| e.path != path);
        self.entries.push(TreeEntry { path, oid });
        self.entries.sort_by(|a, b| a.path.cmp(&b.path));
    }

    pub fn get(&self, path: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::from_content(&self.serialize_bytes())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }
}

/// Commit author or committer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl From<&ActorIdentity> for Author {
    fn from(actor: &ActorIdentity) -> Self {
        Self {
            name: actor.name.clone(),
            email: actor.email.clone(),
        }
    }
}

/// Document-level facts recorded on every commit.
///
/// `changed_paths` is ordered: document file first, sidecar second.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitSummary {
    pub document_id: Option<String>,
    pub airac_cycle: Option<String>,
    pub status: Option<String>,
    pub changed_paths: Vec<String>,
}

impl CommitSummary {
    /// True when this commit touched the given document's file.
    pub fn touches_document(&self, doc_id: &str) -> bool {
        self.document_id.as_deref() == Some(doc_id)
            || self
                .changed_paths
                .iter()
                .any(|p| p == &format!("documents/{doc_id}"))
    }
}

/// Commit - immutable, attributed snapshot with parent chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub tree: ObjectId,
    /// Empty for the initial commit, one parent for a linear commit, two
    /// for a merge.
    pub parents: Vec<ObjectId>,
    pub message: String,
    pub author: Author,
    pub committer: Author,
    /// Microseconds since epoch.
    pub timestamp_us: u64,
    pub summary: CommitSummary,
}

impl Commit {
    pub fn initial(tree: ObjectId, message: impl Into<String>, author: Author) -> Self {
        Self {
            tree,
            parents: vec![],
            message: message.into(),
            author: author.clone(),
            committer: author,
            timestamp_us: current_timestamp_us(),
            summary: CommitSummary::default(),
        }
    }

    pub fn child(
        parent: ObjectId,
        tree: ObjectId,
        message: impl Into<String>,
        author: Author,
    ) -> Self {
        Self {
            tree,
            parents: vec![parent],
            message: message.into(),
            author: author.clone(),
            committer: author,
            timestamp_us: current_timestamp_us(),
            summary: CommitSummary::default(),
        }
    }

    pub fn merge(
        parents: Vec<ObjectId>,
        tree: ObjectId,
        message: impl Into<String>,
        author: Author,
    ) -> Self {
        Self {
            tree,
            parents,
            message: message.into(),
            author: author.clone(),
            committer: author,
            timestamp_us: current_timestamp_us(),
            summary: CommitSummary::default(),
        }
    }

    pub fn with_summary(mut self, summary: CommitSummary) -> Self {
        self.summary = summary;
        self
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::from_content(&self.serialize_bytes())
    }

    pub fn is_initial(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Trait for storable objects.
pub trait GitObject: Sized + Serialize + for<'de> Deserialize<'de> {
    const TYPE: ObjectType;

    fn object_type(&self) -> ObjectType {
        Self::TYPE
    }

    fn serialize_bytes(&self) -> Vec<u8> {
        // Plain serde structs; bincode cannot fail on them.
        bincode::serialize(self).unwrap()
    }

    fn deserialize_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }

    fn compute_oid(&self) -> ObjectId {
        ObjectId::from_content(&self.serialize_bytes())
    }
}

impl GitObject for Blob {
    const TYPE: ObjectType = ObjectType::Blob;
}

impl GitObject for Tree {
    const TYPE: ObjectType = ObjectType::Tree;
}

impl GitObject for Commit {
    const TYPE: ObjectType = ObjectType::Commit;
}

/// Current timestamp in microseconds since epoch.
pub(crate) fn current_timestamp_us() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_is_content_derived() {
        let a = ObjectId::from_content(b"same bytes");
        let b = ObjectId::from_content(b"same bytes");
        let c = ObjectId::from_content(b"other bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn object_id_hex_roundtrip() {
        let oid = ObjectId::from_content(b"doc");
        let parsed = ObjectId::from_hex(&oid.to_hex()).unwrap();
        assert_eq!(oid, parsed);
        assert!(oid.to_hex().starts_with(&oid.short()));
    }

    #[test]
    fn tree_entries_stay_sorted() {
        let mut tree = Tree::new();
        tree.set_entry("metadata/doc-1".into(), ObjectId::from_content(b"m"));
        tree.set_entry("documents/doc-1".into(), ObjectId::from_content(b"d"));
        assert_eq!(tree.entries[0].path, "documents/doc-1");
        assert_eq!(tree.entries[1].path, "metadata/doc-1");

        // Replacing a path must not duplicate it.
        tree.set_entry("documents/doc-1".into(), ObjectId::from_content(b"d2"));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn identical_trees_hash_identically() {
        let mut a = Tree::new();
        a.set_entry("documents/x".into(), ObjectId::from_content(b"1"));
        a.set_entry("metadata/x".into(), ObjectId::from_content(b"2"));

        let mut b = Tree::new();
        b.set_entry("metadata/x".into(), ObjectId::from_content(b"2"));
        b.set_entry("documents/x".into(), ObjectId::from_content(b"1"));

        assert_eq!(a.object_id(), b.object_id());
    }

    #[test]
    fn commit_parent_shapes() {
        let tree = ObjectId::from_content(b"tree");
        let author = Author::new("Editor", "editor@example.org");

        let initial = Commit::initial(tree, "first", author.clone());
        assert!(initial.is_initial());

        let child = Commit::child(initial.object_id(), tree, "second", author.clone());
        assert!(!child.is_initial());
        assert!(!child.is_merge());

        let merge = Commit::merge(
            vec![child.object_id(), initial.object_id()],
            tree,
            "merge",
            author,
        );
        assert!(merge.is_merge());
    }

    #[test]
    fn summary_document_match() {
        let summary = CommitSummary {
            document_id: Some("doc-9".into()),
            airac_cycle: Some("2025-03".into()),
            status: Some("draft".into()),
            changed_paths: vec!["documents/doc-9".into(), "metadata/doc-9".into()],
        };
        assert!(summary.touches_document("doc-9"));
        assert!(!summary.touches_document("doc-8"));
    }
}
