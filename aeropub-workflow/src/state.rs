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

//! Approval workflow states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one approval cycle.
///
/// Nominal path: draft → technical_review → operational_review →
/// authority_approval → final_review → approved → published. `rejected`
/// and `withdrawn` are alternate terminal states reachable from any
/// review state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Draft,
    TechnicalReview,
    OperationalReview,
    AuthorityApproval,
    FinalReview,
    Approved,
    Published,
    Rejected,
    Withdrawn,
}

impl WorkflowState {
    /// Review states, in nominal sequence. Also the approval-level
    /// vocabulary: decisions are recorded at these states.
    pub const REVIEW_SEQUENCE: [WorkflowState; 4] = [
        WorkflowState::TechnicalReview,
        WorkflowState::OperationalReview,
        WorkflowState::AuthorityApproval,
        WorkflowState::FinalReview,
    ];

    pub fn is_review(self) -> bool {
        Self::REVIEW_SEQUENCE.contains(&self)
    }

    /// Terminal states accept no further decisions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowState::Approved
                | WorkflowState::Published
                | WorkflowState::Rejected
                | WorkflowState::Withdrawn
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Draft => "draft",
            WorkflowState::TechnicalReview => "technical_review",
            WorkflowState::OperationalReview => "operational_review",
            WorkflowState::AuthorityApproval => "authority_approval",
            WorkflowState::FinalReview => "final_review",
            WorkflowState::Approved => "approved",
            WorkflowState::Published => "published",
            WorkflowState::Rejected => "rejected",
            WorkflowState::Withdrawn => "withdrawn",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One authority's decision on a document at one approval level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
    RequestChanges,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
            Decision::RequestChanges => "request_changes",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
