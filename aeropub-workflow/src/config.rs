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

//! Workflow engine configuration.

use crate::authority::AuthorityPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration parse error: {0}")]
    Parse(String),
}

/// Tunables for one tenant's approval process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Review window before a document's effective date, in days. One
    /// AIRAC cycle by default.
    pub review_cycle_days: i64,

    /// Days-until-effective thresholds for priority derivation.
    pub priority_critical_days: i64,
    pub priority_high_days: i64,
    pub priority_medium_days: i64,

    /// When set, `mark_published` refuses documents whose compliance
    /// record does not pass. Off by default: compliance is computed and
    /// attached for reporting either way.
    pub gate_publication_on_compliance: bool,

    /// Which roles may decide at which level.
    pub authority: AuthorityPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            review_cycle_days: aeropub_core::REVIEW_CYCLE_DAYS,
            priority_critical_days: 7,
            priority_high_days: 14,
            priority_medium_days: 28,
            gate_publication_on_compliance: false,
            authority: AuthorityPolicy::default(),
        }
    }
}

impl WorkflowConfig {
    /// Default policy with the compliance gate switched on.
    pub fn gated() -> Self {
        Self {
            gate_publication_on_compliance: true,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_publication_cadence() {
        let config = WorkflowConfig::default();
        assert_eq!(config.review_cycle_days, 28);
        assert!(!config.gate_publication_on_compliance);
    }

    #[test]
    fn toml_roundtrip_with_partial_overrides() {
        let config = WorkflowConfig::from_toml_str(
            "review_cycle_days = 14\ngate_publication_on_compliance = true\n",
        )
        .unwrap();
        assert_eq!(config.review_cycle_days, 14);
        assert!(config.gate_publication_on_compliance);
        // Unspecified fields keep their defaults.
        assert_eq!(config.priority_high_days, 14);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        assert!(WorkflowConfig::from_toml_str("review_cycle_days = \"soon\"").is_err());
    }
}
