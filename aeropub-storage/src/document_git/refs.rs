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

//! References: branches, tags, HEAD.
//!
//! Branches are mutable pointers used to isolate review edits from the
//! published line. Tags mark published releases and are immutable: a tag
//! name, once created, is never reassigned.

use super::objects::{current_timestamp_us, Author, ObjectId};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// The branch carrying the published line of every document.
pub const DEFAULT_BRANCH: &str = "main";

/// Reference errors.
#[derive(Debug, Error)]
pub enum RefError {
    #[error("reference not found: {0}")]
    NotFound(String),

    #[error("tag already exists: {0}")]
    DuplicateTag(String),

    #[error("invalid reference name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("reference I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("reference encoding error: {0}")]
    Encoding(String),
}

/// A reference: direct to a commit, or symbolic to another ref.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Ref {
    Direct(ObjectId),
    Symbolic(String),
}

impl Ref {
    pub fn direct(oid: ObjectId) -> Self {
        Self::Direct(oid)
    }

    pub fn symbolic(target: impl Into<String>) -> Self {
        Self::Symbolic(target.into())
    }
}

/// Branch - mutable pointer to the latest commit on a line of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub commit: ObjectId,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Branch {
    pub fn new(name: impl Into<String>, commit: ObjectId) -> Self {
        let now = current_timestamp_us();
        Self {
            name: name.into(),
            commit,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tag - immutable pointer marking a published release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub target: ObjectId,
    pub tagger: Option<Author>,
    pub message: Option<String>,
    pub created_at: u64,
}

/// Reference store: branches, tags, and HEAD for one repository.
pub struct RefStore {
    branches: DashMap<String, Branch>,
    tags: DashMap<String, Tag>,
    head: RwLock<Ref>,
}

impl RefStore {
    pub fn new() -> Self {
        Self {
            branches: DashMap::new(),
            tags: DashMap::new(),
            head: RwLock::new(Ref::Symbolic(format!("refs/heads/{DEFAULT_BRANCH}"))),
        }
    }

    /// Create or move a branch.
    pub fn update_branch(&self, name: &str, commit: ObjectId) -> Result<(), RefError> {
        validate_ref_name(name)?;

        self.branches
            .entry(name.to_string())
            .and_modify(|b| {
                b.commit = commit;
                b.updated_at = current_timestamp_us();
            })
            .or_insert_with(|| Branch::new(name, commit));
        Ok(())
    }

    pub fn delete_branch(&self, name: &str) -> Result<Branch, RefError> {
        let (_, branch) = self
            .branches
            .remove(name)
            .ok_or_else(|| RefError::NotFound(format!("refs/heads/{name}")))?;
        Ok(branch)
    }

    /// Create a tag. Fails with [`RefError::DuplicateTag`] if the name is
    /// taken; the existing tag is left untouched.
    pub fn create_tag(
        &self,
        name: &str,
        target: ObjectId,
        message: Option<String>,
        tagger: Option<Author>,
    ) -> Result<(), RefError> {
        validate_ref_name(name)?;

        if self.tags.contains_key(name) {
            return Err(RefError::DuplicateTag(name.to_string()));
        }

        self.tags.insert(
            name.to_string(),
            Tag {
                name: name.to_string(),
                target,
                tagger,
                message,
                created_at: current_timestamp_us(),
            },
        );
        Ok(())
    }

    /// Resolve a name to a commit ID.
    ///
    /// Accepts HEAD, `refs/heads/<branch>`, `refs/tags/<tag>`, bare branch
    /// or tag names, and full hex commit IDs.
    pub fn resolve(&self, ref_name: &str) -> Result<ObjectId, RefError> {
        if ref_name == "HEAD" {
            let head = self.head.read().clone();
            return match head {
                Ref::Direct(oid) => Ok(oid),
                Ref::Symbolic(target) => self.resolve(&target),
            };
        }

        if let Some(rest) = ref_name.strip_prefix("refs/heads/") {
            if let Some(branch) = self.branches.get(rest) {
                return Ok(branch.commit);
            }
        }

        if let Some(rest) = ref_name.strip_prefix("refs/tags/") {
            if let Some(tag) = self.tags.get(rest) {
                return Ok(tag.target);
            }
        }

        if let Some(branch) = self.branches.get(ref_name) {
            return Ok(branch.commit);
        }

        if let Some(tag) = self.tags.get(ref_name) {
            return Ok(tag.target);
        }

        if ref_name.len() == 64 && ref_name.chars().all(|c| c.is_ascii_hexdigit()) {
            return ObjectId::from_hex(ref_name)
                .map_err(|_| RefError::NotFound(ref_name.to_string()));
        }

        Err(RefError::NotFound(ref_name.to_string()))
    }

    pub fn set_head(&self, target: Ref) {
        *self.head.write() = target;
    }

    pub fn get_head(&self) -> Ref {
        self.head.read().clone()
    }

    /// HEAD commit ID, resolving symbolic refs. `None` before the first
    /// commit.
    pub fn head(&self) -> Option<ObjectId> {
        self.resolve("HEAD").ok()
    }

    /// Branch HEAD points at, `None` when detached.
    pub fn current_branch(&self) -> Option<String> {
        match &*self.head.read() {
            Ref::Symbolic(target) => target.strip_prefix("refs/heads/").map(str::to_string),
            Ref::Direct(_) => None,
        }
    }

    pub fn list_branches(&self) -> Vec<Branch> {
        let mut branches: Vec<Branch> = self.branches.iter().map(|r| r.value().clone()).collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        branches
    }

    pub fn list_tags(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self.tags.iter().map(|r| r.value().clone()).collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    pub fn get_branch(&self, name: &str) -> Option<Branch> {
        self.branches.get(name).map(|r| r.clone())
    }

    pub fn get_tag(&self, name: &str) -> Option<Tag> {
        self.tags.get(name).map(|r| r.clone())
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }

    pub fn tag_exists(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    // === Persistence ===

    pub fn save_to_file(&self, path: &Path) -> Result<(), RefError> {
        let head = self.head.read().clone();
        let branches: Vec<Branch> = self.branches.iter().map(|r| r.value().clone()).collect();
        let tags: Vec<Tag> = self.tags.iter().map(|r| r.value().clone()).collect();

        let data = bincode::serialize(&(head, branches, tags))
            .map_err(|e| RefError::Encoding(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, RefError> {
        let data = std::fs::read(path)?;
        let (head, branches, tags): (Ref, Vec<Branch>, Vec<Tag>) =
            bincode::deserialize(&data).map_err(|e| RefError::Encoding(e.to_string()))?;

        let store = Self::new();
        *store.head.write() = head;
        for branch in branches {
            store.branches.insert(branch.name.clone(), branch);
        }
        for tag in tags {
            store.tags.insert(tag.name.clone(), tag);
        }
        Ok(store)
    }
}

impl Default for RefStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a branch or tag name (Git-style rules).
fn validate_ref_name(name: &str) -> Result<(), RefError> {
    let invalid = |reason: &str| RefError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err(invalid("cannot start or end with '.'"));
    }
    if name.contains("..") || name.contains("//") {
        return Err(invalid("cannot contain '..' or '//'"));
    }
    const INVALID_CHARS: &[char] = &['~', '^', ':', '\\', '?', '*', '[', ' ', '\t', '\n'];
    if name.contains(INVALID_CHARS) {
        return Err(invalid("contains a forbidden character"));
    }
    Ok(())
}
