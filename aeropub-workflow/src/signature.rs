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

//! Tamper-evidence digests over approval decisions.
//!
//! A signature here is a BLAKE3 hash over the canonical decision payload.
//! It detects after-the-fact modification of a recorded decision; it is
//! NOT a cryptographic non-repudiation signature and makes no claim about
//! who produced it beyond the recorded actor name.

use crate::state::{Decision, WorkflowState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Digest over one recorded decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSignature {
    /// Digest algorithm identifier.
    pub algorithm: String,
    /// Hex digest over the canonical payload.
    pub digest: String,
    pub signed_at: DateTime<Utc>,
}

/// Canonical payload the digest covers.
#[derive(Serialize)]
struct SignaturePayload<'a> {
    document_id: &'a str,
    level: WorkflowState,
    decision: Decision,
    actor: &'a str,
    timestamp: DateTime<Utc>,
}

/// Compute the digest for a decision.
pub fn sign_decision(
    document_id: &str,
    level: WorkflowState,
    decision: Decision,
    actor: &str,
    timestamp: DateTime<Utc>,
) -> DecisionSignature {
    DecisionSignature {
        algorithm: "BLAKE3".to_string(),
        digest: payload_digest(document_id, level, decision, actor, timestamp),
        signed_at: timestamp,
    }
}

/// Recompute the digest and compare. A mismatch means the recorded
/// decision no longer matches what was signed.
pub fn verify_decision(
    signature: &DecisionSignature,
    document_id: &str,
    level: WorkflowState,
    decision: Decision,
    actor: &str,
    timestamp: DateTime<Utc>,
) -> bool {
    signature.digest == payload_digest(document_id, level, decision, actor, timestamp)
}

fn payload_digest(
    document_id: &str,
    level: WorkflowState,
    decision: Decision,
    actor: &str,
    timestamp: DateTime<Utc>,
) -> String {
    let payload = SignaturePayload {
        document_id,
        level,
        decision,
        actor,
        timestamp,
    };
    // Field order is fixed by the struct, so the encoding is canonical.
    let bytes = serde_json::to_vec(&payload).unwrap_or_default();
    hex::encode(blake3::hash(&bytes).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn signature_verifies_for_the_signed_payload() {
        let sig = sign_decision(
            "doc-1",
            WorkflowState::TechnicalReview,
            Decision::Approve,
            "R. Viewer",
            at(),
        );
        assert!(verify_decision(
            &sig,
            "doc-1",
            WorkflowState::TechnicalReview,
            Decision::Approve,
            "R. Viewer",
            at(),
        ));
    }

    #[test]
    fn any_field_change_breaks_verification() {
        let sig = sign_decision(
            "doc-1",
            WorkflowState::TechnicalReview,
            Decision::Approve,
            "R. Viewer",
            at(),
        );

        assert!(!verify_decision(
            &sig,
            "doc-2",
            WorkflowState::TechnicalReview,
            Decision::Approve,
            "R. Viewer",
            at(),
        ));
        assert!(!verify_decision(
            &sig,
            "doc-1",
            WorkflowState::TechnicalReview,
            Decision::Reject,
            "R. Viewer",
            at(),
        ));
        assert!(!verify_decision(
            &sig,
            "doc-1",
            WorkflowState::TechnicalReview,
            Decision::Approve,
            "Someone Else",
            at(),
        ));
    }

    #[test]
    fn same_payload_signs_identically() {
        let a = sign_decision("d", WorkflowState::FinalReview, Decision::Approve, "x", at());
        let b = sign_decision("d", WorkflowState::FinalReview, Decision::Approve, "x", at());
        assert_eq!(a.digest, b.digest);
    }
}
