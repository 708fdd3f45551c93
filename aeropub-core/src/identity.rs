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

//! Actor identity.
//!
//! Identity is supplied by the authentication subsystem on every call that
//! creates a commit or records an approval decision; this engine never
//! derives or fabricates it.

use serde::{Deserialize, Serialize};

/// Review authority roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewRole {
    TechnicalReviewer,
    SeniorTechnicalReviewer,
    OperationalReviewer,
    SeniorOperationalReviewer,
    AuthorityApprover,
    SeniorAuthorityApprover,
    FinalReviewer,
}

impl ReviewRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewRole::TechnicalReviewer => "technical_reviewer",
            ReviewRole::SeniorTechnicalReviewer => "senior_technical_reviewer",
            ReviewRole::OperationalReviewer => "operational_reviewer",
            ReviewRole::SeniorOperationalReviewer => "senior_operational_reviewer",
            ReviewRole::AuthorityApprover => "authority_approver",
            ReviewRole::SeniorAuthorityApprover => "senior_authority_approver",
            ReviewRole::FinalReviewer => "final_reviewer",
        }
    }
}

impl std::fmt::Display for ReviewRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A human actor: commit author or decision maker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    pub name: String,
    pub email: String,
    pub role: ReviewRole,
}

impl ActorIdentity {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: ReviewRole) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role,
        }
    }
}
