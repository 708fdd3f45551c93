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

//! Aeropub Approval Workflow
//!
//! Multi-stage approval for aeronautical publications: a state machine per
//! document review cycle, with role-gated decisions, tamper-evidence
//! digests, compliance screening, and aggregate reporting.
//!
//! A document's criticality class (CRITICAL / ESSENTIAL / ROUTINE) selects
//! which approval levels it must clear; the workflow is complete once every
//! required level holds an approval, in whatever order they arrived.

pub mod authority;
pub mod compliance;
pub mod config;
pub mod engine;
pub mod report;
pub mod signature;
pub mod state;

pub use authority::AuthorityPolicy;
pub use compliance::{
    validate_document, ComplianceCheck, ComplianceIssue, ComplianceRecord, IssueSeverity,
};
pub use config::{ConfigError, WorkflowConfig};
pub use engine::{
    Approval, ApprovalWorkflow, AuditEntry, Criticality, Priority, WorkflowEngine, WorkflowError,
};
pub use report::{generate_report, ApprovalReport};
pub use signature::{sign_decision, verify_decision, DecisionSignature};
pub use state::{Decision, WorkflowState};
