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

//! Document repository: one per organization.
//!
//! Combines the object store and reference store into the version-control
//! surface the rest of the platform consumes: committing document snapshots,
//! reading history, creating review branches, merging them back, and tagging
//! published releases.
//!
//! Mutations are serialized by a per-repository write gate; reads resolve
//! through refs, so a commit only becomes visible once all of its objects
//! are stored and the branch pointer has moved (stage-then-commit ordering).

use super::objects::{Author, Blob, Commit, CommitSummary, ObjectId, Tree};
use super::refs::{Ref, RefError, RefStore, DEFAULT_BRANCH};
use super::store::{ObjectStore, StoreError};
use aeropub_core::{ActorIdentity, DocumentSnapshot};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("document {document_id} not found at {reference}")]
    DocumentNotFound {
        document_id: String,
        reference: String,
    },

    #[error("path {path} not found at {reference}")]
    PathNotFound { path: String, reference: String },

    #[error("commit not found: {0}")]
    CommitNotFound(ObjectId),

    #[error("reference not found: {0}")]
    RefNotFound(String),

    #[error("branch already exists: {0}")]
    BranchExists(String),

    #[error("tag already exists: {0}")]
    DuplicateTag(String),

    #[error("merge of {source_branch} into {target} conflicts on {paths:?}")]
    MergeConflict {
        source_branch: String,
        target: String,
        paths: Vec<String>,
    },

    #[error("repository has no commits yet")]
    EmptyRepository,

    #[error("document encoding error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ref(#[from] RefError),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(e: serde_json::Error) -> Self {
        RepositoryError::Serialization(e.to_string())
    }
}

/// Result of a commit attempt.
///
/// `NoChanges` is a success variant, not a failure: committing a snapshot
/// byte-identical to the tip is a no-op and history is left untouched.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    Committed(CommitRecord),
    NoChanges,
}

impl CommitOutcome {
    pub fn commit_id(&self) -> Option<ObjectId> {
        match self {
            CommitOutcome::Committed(record) => Some(record.commit_id),
            CommitOutcome::NoChanges => None,
        }
    }
}

/// One history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub commit_id: ObjectId,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub parents: Vec<ObjectId>,
}

/// Result of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Target already contained the source commits.
    AlreadyUpToDate,
    /// Target pointer moved forward to the source commit.
    FastForward(ObjectId),
    /// A merge commit was created.
    Merged(ObjectId),
}

/// Version-control repository for one organization's documents.
pub struct DocumentRepository {
    org_id: String,
    store: ObjectStore,
    refs: RefStore,
    /// One writer at a time per repository; readers never take this.
    write_gate: Mutex<()>,
    path: Option<PathBuf>,
}

impl DocumentRepository {
    /// Create an in-memory repository (tests, dry runs).
    pub fn in_memory(org_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            store: ObjectStore::new(),
            refs: RefStore::new(),
            write_gate: Mutex::new(()),
            path: None,
        }
    }

    /// Open a repository at `path`, loading prior state when present.
    pub fn open(org_id: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let org_id = org_id.into();
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path).map_err(StoreError::Io)?;

        let objects_file = path.join("objects.bin");
        let refs_file = path.join("refs.bin");

        let store = if objects_file.exists() {
            ObjectStore::load_from_file(&objects_file)?
        } else {
            ObjectStore::new()
        };
        let refs = if refs_file.exists() {
            RefStore::load_from_file(&refs_file)?
        } else {
            RefStore::new()
        };

        debug!(org = %org_id, "opened document repository");
        Ok(Self {
            org_id,
            store,
            refs,
            write_gate: Mutex::new(()),
            path: Some(path),
        })
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn is_empty(&self) -> bool {
        self.refs.head().is_none()
    }

    // === Snapshot writer ===

    /// Commit a document snapshot, attributed to the editing user.
    ///
    /// Writes the canonical document file and its metadata sidecar in one
    /// commit. Returns [`CommitOutcome::NoChanges`] when the serialized
    /// document is byte-identical to the tip.
    pub fn commit_document(
        &self,
        document: &DocumentSnapshot,
        editor: &ActorIdentity,
        message: Option<&str>,
    ) -> Result<CommitOutcome, RepositoryError> {
        let _guard = self.write_gate.lock();

        let doc_path = format!("documents/{}", document.id);
        let meta_path = format!("metadata/{}", document.id);

        let doc_bytes = document.canonical_bytes()?;

        let tip = self.refs.head();
        let mut tree = match tip {
            Some(oid) => {
                let commit: Commit = self.store.get_required(&oid)?;
                self.store.get_required::<Tree>(&commit.tree)?
            }
            None => Tree::new(),
        };

        let existing = match tree.get(&doc_path) {
            Some(entry) => Some(self.store.get_required::<Blob>(&entry.oid)?),
            None => None,
        };
        if let Some(ref blob) = existing {
            if blob.data == doc_bytes {
                debug!(org = %self.org_id, doc = %document.id, "snapshot identical to tip, skipping commit");
                return Ok(CommitOutcome::NoChanges);
            }
        }

        let sidecar = document.sidecar(&editor.name, Utc::now());
        let sidecar_bytes = sidecar.canonical_bytes()?;

        let doc_oid = self.store.put(&Blob::document(doc_bytes))?;
        let meta_oid = self.store.put(&Blob::sidecar(sidecar_bytes))?;
        tree.set_entry(doc_path.clone(), doc_oid);
        tree.set_entry(meta_path.clone(), meta_oid);
        let tree_oid = self.store.put(&tree)?;

        let action = if existing.is_some() { "Update" } else { "Create" };
        let message = match message {
            Some(m) => m.to_string(),
            None => default_message(action, document),
        };

        let author = Author::from(editor);
        let summary = CommitSummary {
            document_id: Some(document.id.clone()),
            airac_cycle: Some(document.airac_cycle.clone()),
            status: Some(document.status.to_string()),
            changed_paths: vec![doc_path, meta_path],
        };
        let commit = match tip {
            Some(parent) => Commit::child(parent, tree_oid, message, author),
            None => Commit::initial(tree_oid, message, author),
        }
        .with_summary(summary);

        let record = self.finish_commit(commit)?;
        info!(
            org = %self.org_id,
            doc = %document.id,
            commit = %record.commit_id,
            "committed document snapshot"
        );
        Ok(CommitOutcome::Committed(record))
    }

    /// Remove a document (and its sidecar) from the working tree.
    pub fn delete_document(
        &self,
        doc_id: &str,
        editor: &ActorIdentity,
        message: Option<&str>,
    ) -> Result<CommitOutcome, RepositoryError> {
        let _guard = self.write_gate.lock();

        let tip = self.refs.head().ok_or(RepositoryError::EmptyRepository)?;
        let commit: Commit = self.store.get_required(&tip)?;
        let mut tree = self.store.get_required::<Tree>(&commit.tree)?;

        let doc_path = format!("documents/{doc_id}");
        let meta_path = format!("metadata/{doc_id}");
        if tree.get(&doc_path).is_none() {
            return Err(RepositoryError::DocumentNotFound {
                document_id: doc_id.to_string(),
                reference: "HEAD".to_string(),
            });
        }

        tree.entries.retain(|e| e.path != doc_path && e.path != meta_path);
        let tree_oid = self.store.put(&tree)?;

        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("Delete document: {doc_id}"));
        let commit = Commit::child(tip, tree_oid, message, Author::from(editor)).with_summary(
            CommitSummary {
                document_id: Some(doc_id.to_string()),
                airac_cycle: None,
                status: None,
                changed_paths: vec![doc_path, meta_path],
            },
        );

        let record = self.finish_commit(commit)?;
        info!(org = %self.org_id, doc = %doc_id, commit = %record.commit_id, "deleted document");
        Ok(CommitOutcome::Committed(record))
    }

    /// Store a fully built commit, advance the current branch, persist.
    ///
    /// Objects land in the store before the branch pointer moves, so readers
    /// either see the whole commit or none of it.
    fn finish_commit(&self, commit: Commit) -> Result<CommitRecord, RepositoryError> {
        let record = commit_record(&commit, self.store.put(&commit)?);

        match self.refs.current_branch() {
            Some(branch) => self.refs.update_branch(&branch, record.commit_id)?,
            None => {
                self.refs.update_branch(DEFAULT_BRANCH, record.commit_id)?;
                self.refs
                    .set_head(Ref::symbolic(format!("refs/heads/{DEFAULT_BRANCH}")));
            }
        }

        self.save()?;
        Ok(record)
    }

    // === History reader ===

    /// Commits affecting `doc_id`, most recent first.
    ///
    /// An empty repository or an unknown document yields an empty list, not
    /// an error: a document with zero or one commit is simply an initial
    /// version with nothing to compare against.
    pub fn history(&self, doc_id: &str, limit: usize) -> Result<Vec<CommitRecord>, RepositoryError> {
        let Some(head) = self.refs.head() else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([head]);

        while let Some(oid) = queue.pop_front() {
            if !seen.insert(oid) {
                continue;
            }
            let commit: Commit = self
                .store
                .get(&oid)?
                .ok_or(RepositoryError::CommitNotFound(oid))?;
            if commit.summary.touches_document(doc_id) {
                records.push((commit.timestamp_us, commit_record(&commit, oid)));
            }
            queue.extend(commit.parents.iter().copied());
        }

        records.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(records
            .into_iter()
            .map(|(_, record)| record)
            .take(limit)
            .collect())
    }

    /// Fetch a document's snapshot as of `reference` (commit hex, branch,
    /// tag, or HEAD).
    pub fn read_at(
        &self,
        doc_id: &str,
        reference: &str,
    ) -> Result<DocumentSnapshot, RepositoryError> {
        let bytes = self
            .read_file_at(&format!("documents/{doc_id}"), reference)
            .map_err(|e| match e {
                RepositoryError::PathNotFound { reference, .. } => {
                    RepositoryError::DocumentNotFound {
                        document_id: doc_id.to_string(),
                        reference,
                    }
                }
                other => other,
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Raw file content at `reference`. A document's metadata sidecar lives
    /// at `metadata/<doc-id>`.
    pub fn read_file_at(&self, path: &str, reference: &str) -> Result<Vec<u8>, RepositoryError> {
        let oid = self.resolve(reference)?;
        let tree = self.tree_of(oid)?;
        let entry = tree.get(path).ok_or_else(|| RepositoryError::PathNotFound {
            path: path.to_string(),
            reference: reference.to_string(),
        })?;
        let blob: Blob = self.store.get_required(&entry.oid)?;
        Ok(blob.data)
    }

    /// Resolve a ref-ish string to a commit ID.
    pub fn resolve(&self, reference: &str) -> Result<ObjectId, RepositoryError> {
        self.refs.resolve(reference).map_err(|e| match e {
            RefError::NotFound(name) => RepositoryError::RefNotFound(name),
            other => RepositoryError::Ref(other),
        })
    }

    // === Branch/tag coordinator ===

    /// Create a review branch. `from` defaults to the current published
    /// line (HEAD of the default branch).
    pub fn create_branch(&self, name: &str, from: Option<&str>) -> Result<(), RepositoryError> {
        let _guard = self.write_gate.lock();

        if self.refs.branch_exists(name) {
            return Err(RepositoryError::BranchExists(name.to_string()));
        }
        let base = match from {
            Some(reference) => self.resolve(reference)?,
            None => self.refs.head().ok_or(RepositoryError::EmptyRepository)?,
        };
        self.refs.update_branch(name, base)?;
        self.save()?;
        info!(org = %self.org_id, branch = %name, base = %base, "created review branch");
        Ok(())
    }

    /// Point HEAD at a branch (or detach it at a commit).
    pub fn checkout(&self, reference: &str) -> Result<ObjectId, RepositoryError> {
        let _guard = self.write_gate.lock();

        if let Some(branch) = self.refs.get_branch(reference) {
            self.refs
                .set_head(Ref::symbolic(format!("refs/heads/{reference}")));
            self.save()?;
            return Ok(branch.commit);
        }
        let oid = self.resolve(reference)?;
        self.refs.set_head(Ref::direct(oid));
        self.save()?;
        Ok(oid)
    }

    pub fn current_branch(&self) -> Option<String> {
        self.refs.current_branch()
    }

    pub fn list_branches(&self) -> Vec<(String, ObjectId)> {
        self.refs
            .list_branches()
            .into_iter()
            .map(|b| (b.name, b.commit))
            .collect()
    }

    /// Merge `source` into `target` (the published line by default).
    ///
    /// Fast-forwards when possible, otherwise builds a file-level three-way
    /// merge commit. Content conflicts are never auto-resolved: when both
    /// sides changed the same path since the merge base, the merge fails
    /// with [`RepositoryError::MergeConflict`]. The source branch is removed
    /// after a successful merge; HEAD ends on `target`.
    pub fn merge(
        &self,
        source: &str,
        target: &str,
        merger: &ActorIdentity,
    ) -> Result<MergeOutcome, RepositoryError> {
        let _guard = self.write_gate.lock();

        if self.refs.get_branch(target).is_none() {
            return Err(RepositoryError::RefNotFound(target.to_string()));
        }
        let source_oid = self.resolve(source)?;
        let target_oid = self.resolve(target)?;

        if source_oid == target_oid {
            return Ok(MergeOutcome::AlreadyUpToDate);
        }

        let base = self.merge_base(source_oid, target_oid)?;

        if base == Some(source_oid) {
            // Source is already contained in target.
            return Ok(MergeOutcome::AlreadyUpToDate);
        }

        let outcome = if base == Some(target_oid) {
            self.refs.update_branch(target, source_oid)?;
            info!(
                org = %self.org_id,
                source = %source,
                target = %target,
                commit = %source_oid,
                "fast-forward merge"
            );
            MergeOutcome::FastForward(source_oid)
        } else {
            let merged = self.three_way_merge(source, source_oid, target, target_oid, base, merger)?;
            MergeOutcome::Merged(merged)
        };

        if self.refs.branch_exists(source) {
            self.refs.delete_branch(source)?;
        }
        self.refs
            .set_head(Ref::symbolic(format!("refs/heads/{target}")));
        self.save()?;
        Ok(outcome)
    }

    fn three_way_merge(
        &self,
        source: &str,
        source_oid: ObjectId,
        target: &str,
        target_oid: ObjectId,
        base: Option<ObjectId>,
        merger: &ActorIdentity,
    ) -> Result<ObjectId, RepositoryError> {
        let source_tree = self.tree_of(source_oid)?;
        let target_tree = self.tree_of(target_oid)?;
        let base_tree = match base {
            Some(oid) => self.tree_of(oid)?,
            None => Tree::new(),
        };

        let base_paths: HashMap<&str, ObjectId> = base_tree
            .iter()
            .map(|e| (e.path.as_str(), e.oid))
            .collect();
        let source_paths: HashMap<&str, ObjectId> = source_tree
            .iter()
            .map(|e| (e.path.as_str(), e.oid))
            .collect();
        let target_paths: HashMap<&str, ObjectId> = target_tree
            .iter()
            .map(|e| (e.path.as_str(), e.oid))
            .collect();

        let mut all_paths: Vec<&str> = source_paths
            .keys()
            .chain(target_paths.keys())
            .chain(base_paths.keys())
            .copied()
            .collect();
        all_paths.sort_unstable();
        all_paths.dedup();

        let mut merged = Tree::new();
        let mut conflicts = Vec::new();
        let mut changed_paths = Vec::new();

        for path in all_paths {
            let b = base_paths.get(path).copied();
            let s = source_paths.get(path).copied();
            let t = target_paths.get(path).copied();

            let keep = if s == t {
                t
            } else if t == b {
                s
            } else if s == b {
                t
            } else {
                conflicts.push(path.to_string());
                continue;
            };

            if keep != t {
                changed_paths.push(path.to_string());
            }
            if let Some(oid) = keep {
                merged.set_entry(path.to_string(), oid);
            }
        }

        if !conflicts.is_empty() {
            return Err(RepositoryError::MergeConflict {
                source_branch: source.to_string(),
                target: target.to_string(),
                paths: conflicts,
            });
        }

        let tree_oid = self.store.put(&merged)?;
        let commit = Commit::merge(
            vec![target_oid, source_oid],
            tree_oid,
            format!("Merge branch '{source}' into {target}"),
            Author::from(merger),
        )
        .with_summary(CommitSummary {
            document_id: None,
            airac_cycle: None,
            status: None,
            changed_paths,
        });
        let commit_oid = self.store.put(&commit)?;
        self.refs.update_branch(target, commit_oid)?;

        info!(
            org = %self.org_id,
            source = %source,
            target = %target,
            commit = %commit_oid,
            "merge commit created"
        );
        Ok(commit_oid)
    }

    /// Closest common ancestor of two commits (BFS over parent links).
    fn merge_base(
        &self,
        a: ObjectId,
        b: ObjectId,
    ) -> Result<Option<ObjectId>, RepositoryError> {
        let mut ancestors = HashSet::new();
        let mut queue = VecDeque::from([a]);
        while let Some(oid) = queue.pop_front() {
            if !ancestors.insert(oid) {
                continue;
            }
            let commit: Commit = self
                .store
                .get(&oid)?
                .ok_or(RepositoryError::CommitNotFound(oid))?;
            queue.extend(commit.parents.iter().copied());
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([b]);
        while let Some(oid) = queue.pop_front() {
            if ancestors.contains(&oid) {
                return Ok(Some(oid));
            }
            if !seen.insert(oid) {
                continue;
            }
            let commit: Commit = self
                .store
                .get(&oid)?
                .ok_or(RepositoryError::CommitNotFound(oid))?;
            queue.extend(commit.parents.iter().copied());
        }
        Ok(None)
    }

    fn tree_of(&self, commit_oid: ObjectId) -> Result<Tree, RepositoryError> {
        let commit: Commit = self
            .store
            .get(&commit_oid)?
            .ok_or(RepositoryError::CommitNotFound(commit_oid))?;
        Ok(self.store.get_required(&commit.tree)?)
    }

    /// Tag the current HEAD as a published release.
    ///
    /// Tag names are immutable: reusing one fails with
    /// [`RepositoryError::DuplicateTag`] and leaves the existing tag alone.
    pub fn tag_release(&self, name: &str, message: &str) -> Result<ObjectId, RepositoryError> {
        let _guard = self.write_gate.lock();

        if self.refs.tag_exists(name) {
            return Err(RepositoryError::DuplicateTag(name.to_string()));
        }
        let head = self.refs.head().ok_or(RepositoryError::EmptyRepository)?;
        self.refs
            .create_tag(name, head, Some(message.to_string()), None)?;
        self.save()?;
        info!(org = %self.org_id, tag = %name, commit = %head, "tagged release");
        Ok(head)
    }

    pub fn list_tags(&self) -> Vec<String> {
        self.refs.list_tags().into_iter().map(|t| t.name).collect()
    }

    // === Persistence ===

    /// Persist the repository. Objects are written before refs so a crash
    /// between the two writes can only lose the ref move, never produce a
    /// ref pointing at missing objects.
    pub fn save(&self) -> Result<(), RepositoryError> {
        if let Some(ref path) = self.path {
            self.store.save_to_file(&path.join("objects.bin"))?;
            self.refs.save_to_file(&path.join("refs.bin"))?;
        }
        Ok(())
    }
}

fn commit_record(commit: &Commit, oid: ObjectId) -> CommitRecord {
    let secs = (commit.timestamp_us / 1_000_000) as i64;
    let nsecs = ((commit.timestamp_us % 1_000_000) * 1000) as u32;
    CommitRecord {
        commit_id: oid,
        message: commit.message.clone(),
        author_name: commit.author.name.clone(),
        author_email: commit.author.email.clone(),
        timestamp: DateTime::from_timestamp(secs, nsecs).unwrap_or_else(Utc::now),
        parents: commit.parents.clone(),
    }
}

fn default_message(action: &str, document: &DocumentSnapshot) -> String {
    format!(
        "{action} document: {}\n\nDocument: {}\nAIRAC cycle: {}\nStatus: {}",
        document.title, document.id, document.airac_cycle, document.status
    )
}
