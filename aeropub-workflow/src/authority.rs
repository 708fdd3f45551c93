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

//! Authority policy: which roles may decide at which approval level.
//!
//! The policy is plain data injected into the engine rather than a
//! compiled-in table, so tenants can override it without code changes.

use crate::state::WorkflowState;
use aeropub_core::ReviewRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Map from approval level to the roles allowed to decide there.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorityPolicy {
    levels: HashMap<WorkflowState, Vec<ReviewRole>>,
}

impl AuthorityPolicy {
    /// Policy with no authorizations; combine with [`allow`].
    ///
    /// [`allow`]: AuthorityPolicy::allow
    pub fn empty() -> Self {
        Self {
            levels: HashMap::new(),
        }
    }

    /// Authorize `role` at `level`.
    pub fn allow(mut self, level: WorkflowState, role: ReviewRole) -> Self {
        let roles = self.levels.entry(level).or_default();
        if !roles.contains(&role) {
            roles.push(role);
        }
        self
    }

    /// True when `role` may record a decision at `level`.
    pub fn allows(&self, level: WorkflowState, role: ReviewRole) -> bool {
        self.levels
            .get(&level)
            .is_some_and(|roles| roles.contains(&role))
    }

    pub fn allowed_roles(&self, level: WorkflowState) -> &[ReviewRole] {
        self.levels.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for AuthorityPolicy {
    /// The standard review table: each level admits its own reviewers and
    /// their seniors, the authority approver may decide at any level, and
    /// the authority level itself is restricted to authority approvers.
    fn default() -> Self {
        use aeropub_core::ReviewRole::*;
        use WorkflowState::*;

        Self::empty()
            .allow(TechnicalReview, TechnicalReviewer)
            .allow(TechnicalReview, SeniorTechnicalReviewer)
            .allow(TechnicalReview, AuthorityApprover)
            .allow(OperationalReview, OperationalReviewer)
            .allow(OperationalReview, SeniorOperationalReviewer)
            .allow(OperationalReview, AuthorityApprover)
            .allow(AuthorityApproval, AuthorityApprover)
            .allow(AuthorityApproval, SeniorAuthorityApprover)
            .allow(FinalReview, FinalReviewer)
            .allow(FinalReview, AuthorityApprover)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeropub_core::ReviewRole;

    #[test]
    fn default_table_matches_review_structure() {
        let policy = AuthorityPolicy::default();

        assert!(policy.allows(WorkflowState::TechnicalReview, ReviewRole::TechnicalReviewer));
        assert!(policy.allows(WorkflowState::TechnicalReview, ReviewRole::AuthorityApprover));
        assert!(!policy.allows(WorkflowState::TechnicalReview, ReviewRole::FinalReviewer));

        assert!(policy.allows(WorkflowState::AuthorityApproval, ReviewRole::SeniorAuthorityApprover));
        assert!(!policy.allows(WorkflowState::AuthorityApproval, ReviewRole::TechnicalReviewer));
        assert!(!policy.allows(WorkflowState::AuthorityApproval, ReviewRole::OperationalReviewer));

        assert!(policy.allows(WorkflowState::FinalReview, ReviewRole::FinalReviewer));
    }

    #[test]
    fn tenant_override_is_plain_data() {
        let policy = AuthorityPolicy::empty()
            .allow(WorkflowState::TechnicalReview, ReviewRole::FinalReviewer);

        assert!(policy.allows(WorkflowState::TechnicalReview, ReviewRole::FinalReviewer));
        assert!(!policy.allows(WorkflowState::TechnicalReview, ReviewRole::TechnicalReviewer));
        // Levels never mentioned authorize nobody.
        assert!(policy.allowed_roles(WorkflowState::FinalReview).is_empty());
    }

    #[test]
    fn allow_is_idempotent() {
        let policy = AuthorityPolicy::empty()
            .allow(WorkflowState::FinalReview, ReviewRole::FinalReviewer)
            .allow(WorkflowState::FinalReview, ReviewRole::FinalReviewer);
        assert_eq!(policy.allowed_roles(WorkflowState::FinalReview).len(), 1);
    }
}
