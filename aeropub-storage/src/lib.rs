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

//! Aeropub Storage Layer
//!
//! Per-tenant document version control: an isolated, content-addressable
//! repository per organization, with commits, review branches, release
//! tags, and a structural diff engine over document snapshots.
//!
//! Writes to one organization's repository are serialized; reads are
//! concurrent. Repositories of different organizations share no state and
//! no locks.

pub mod document_git;

pub use document_git::{
    Author, Blob, Branch, Change, ChangeKind, ChangeSet, Commit, CommitOutcome, CommitRecord,
    CommitSummary, ContentType, DiffEngine, DocumentRepository, GitObject, MergeOutcome, ObjectId,
    ObjectStore, ObjectType, Ref, RefError, RefStore, RegistryError, RepositoryError,
    RepositoryRegistry, StoreError, StoreStats, Tag, Tree, TreeEntry, DEFAULT_BRANCH,
};
