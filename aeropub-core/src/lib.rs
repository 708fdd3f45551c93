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

//! Aeropub Core
//!
//! Fundamental data structures for the aeronautical publication engine:
//! the structured document model, actor identity, and AIRAC cycle helpers.
//!
//! This crate knows nothing about storage or workflow state; it defines the
//! shapes the other crates operate on.

pub mod airac;
pub mod document;
pub mod identity;

pub use airac::{cycle_for_date, is_valid_cycle, upcoming_cycles, CycleInfo, REVIEW_CYCLE_DAYS};
pub use document::{
    DocumentInfo, DocumentSnapshot, DocumentStatus, MetadataSidecar, Section, SectionCode,
    Subsection,
};
pub use identity::{ActorIdentity, ReviewRole};
