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

//! Git-like version control for structured documents.
//!
//! Every edit to a document is stored as an immutable, attributable
//! snapshot inside an isolated per-organization repository, following
//! Git's object model:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐      ┌──────────┐      ┌──────────┐          │
//! │  │   Blob   │◄─────│   Tree   │◄─────│  Commit  │          │
//! │  │ (file)   │      │ (snapshot)│     │ (version)│          │
//! │  └──────────┘      └──────────┘      └──────────┘          │
//! │        ▼                 ▼                 ▼               │
//! │  ┌──────────────────────────────────────────────┐          │
//! │  │     Content-Addressable Object Store         │          │
//! │  │         (BLAKE3 hashed, immutable)           │          │
//! │  └──────────────────────────────────────────────┘          │
//! │                                                            │
//! │  ┌──────────┐      ┌──────────┐      ┌──────────┐          │
//! │  │  Branch  │      │   Tag    │      │   HEAD   │          │
//! │  │ (review) │      │(release) │      │ (current)│          │
//! │  └──────────┘      └──────────┘      └──────────┘          │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each commit's tree holds one file per document (`documents/<doc-id>`)
//! plus a metadata sidecar (`metadata/<doc-id>`), both updated together.
//! Branches isolate in-progress review edits from the published line; tags
//! mark published releases and are never reassigned.

pub mod diff;
pub mod objects;
pub mod refs;
pub mod registry;
pub mod repository;
pub mod store;

pub use diff::{Change, ChangeKind, ChangeSet, DiffEngine};
pub use objects::{
    Author, Blob, Commit, CommitSummary, ContentType, GitObject, ObjectId, ObjectType, Tree,
    TreeEntry,
};
pub use refs::{Branch, Ref, RefError, RefStore, Tag, DEFAULT_BRANCH};
pub use registry::{RegistryError, RepositoryRegistry};
pub use repository::{
    CommitOutcome, CommitRecord, DocumentRepository, MergeOutcome, RepositoryError,
};
pub use store::{ObjectStore, StoreError, StoreStats};
