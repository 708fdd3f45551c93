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

//! Approval workflow engine.
//!
//! One workflow instance tracks one document through its review cycle.
//! Decisions are recorded against approval levels, gated by the authority
//! policy; the workflow completes when every required level holds an
//! approval, regardless of the order decisions arrived in.
//!
//! Concurrency: each document's workflow sits behind its own mutex, so two
//! decisions against the same workflow cannot both observe "not yet
//! complete" and double-advance. Workflows of different documents share
//! nothing.

use crate::authority::AuthorityPolicy;
use crate::compliance::{self, ComplianceRecord};
use crate::config::WorkflowConfig;
use crate::signature::{sign_decision, DecisionSignature};
use crate::state::{Decision, WorkflowState};
use aeropub_core::{ActorIdentity, DocumentSnapshot, ReviewRole};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Workflow errors.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("no active workflow for document {0}")]
    WorkflowNotFound(String),

    #[error("document {0} already has an active workflow")]
    ActiveWorkflowExists(String),

    #[error("role {role} lacks authority for level {level}")]
    InsufficientAuthority {
        level: WorkflowState,
        role: ReviewRole,
    },

    #[error("workflow for document {document_id} is in terminal state {state}")]
    InvalidTransition {
        document_id: String,
        state: WorkflowState,
    },

    #[error("level {0} is not an approval level")]
    NotAnApprovalLevel(WorkflowState),

    #[error("level {0} is not required for this workflow")]
    LevelNotRequired(WorkflowState),

    #[error("document {0} failed compliance screening and publication is gated")]
    ComplianceNotMet(String),
}

/// Document criticality class; selects the required approval levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criticality {
    Critical,
    Essential,
    Routine,
}

impl Criticality {
    /// Approval levels this class must clear, in nominal order.
    pub fn required_levels(self) -> &'static [WorkflowState] {
        use WorkflowState::*;
        match self {
            Criticality::Critical => &[
                TechnicalReview,
                OperationalReview,
                AuthorityApproval,
                FinalReview,
            ],
            Criticality::Essential => &[TechnicalReview, OperationalReview, AuthorityApproval],
            Criticality::Routine => &[TechnicalReview, OperationalReview],
        }
    }
}

/// Urgency derived from how close the effective date is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// One recorded decision. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: Uuid,
    pub level: WorkflowState,
    pub actor: String,
    pub role: ReviewRole,
    pub decision: Decision,
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub signature: DecisionSignature,
}

/// One audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    pub performed_by: String,
    pub timestamp: DateTime<Utc>,
    pub state: WorkflowState,
    pub comment: String,
}

/// One document's approval cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalWorkflow {
    pub id: Uuid,
    pub document_id: String,
    pub document_title: String,
    pub criticality: Criticality,
    pub current_state: WorkflowState,
    pub required_levels: Vec<WorkflowState>,
    pub approvals: Vec<Approval>,
    pub initiated_by: String,
    pub initiated_at: DateTime<Utc>,
    pub target_completion: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub compliance: Option<ComplianceRecord>,
    pub audit_trail: Vec<AuditEntry>,
}

impl ApprovalWorkflow {
    /// A workflow is complete iff every required level has at least one
    /// approval, in any order. Idempotent set check, not a sequence check.
    pub fn is_complete(&self) -> bool {
        let approved: HashSet<WorkflowState> = self
            .approvals
            .iter()
            .filter(|a| a.decision == Decision::Approve)
            .map(|a| a.level)
            .collect();
        self.required_levels.iter().all(|l| approved.contains(l))
    }

    fn audit(&mut self, action: &str, performed_by: &str, comment: impl Into<String>) {
        self.audit_trail.push(AuditEntry {
            action: action.to_string(),
            performed_by: performed_by.to_string(),
            timestamp: Utc::now(),
            state: self.current_state,
            comment: comment.into(),
        });
    }
}

/// Engine holding every active workflow, one per document.
pub struct WorkflowEngine {
    config: WorkflowConfig,
    workflows: DashMap<String, Arc<Mutex<ApprovalWorkflow>>>,
}

impl WorkflowEngine {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            workflows: DashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(WorkflowConfig::default())
    }

    pub fn policy(&self) -> &AuthorityPolicy {
        &self.config.authority
    }

    /// Start an approval cycle for a document.
    ///
    /// At most one workflow may be active per document. A document whose
    /// workflow was sent back to draft (`request_changes`) or has reached a
    /// terminal state may be re-initiated; an in-review workflow may not.
    pub fn initiate(
        &self,
        document: &DocumentSnapshot,
        initiator: &ActorIdentity,
        criticality: Criticality,
    ) -> Result<ApprovalWorkflow, WorkflowError> {
        if let Some(existing) = self.workflows.get(&document.id) {
            let state = existing.lock().current_state;
            if !state.is_terminal() && state != WorkflowState::Draft {
                return Err(WorkflowError::ActiveWorkflowExists(document.id.clone()));
            }
        }

        let now = Utc::now();
        let required = criticality.required_levels().to_vec();
        let first_level = required[0];

        let mut workflow = ApprovalWorkflow {
            id: Uuid::new_v4(),
            document_id: document.id.clone(),
            document_title: document.title.clone(),
            criticality,
            current_state: first_level,
            required_levels: required,
            approvals: Vec::new(),
            initiated_by: initiator.name.clone(),
            initiated_at: now,
            target_completion: document.effective_date
                - Duration::days(self.config.review_cycle_days),
            completed_at: None,
            priority: self.derive_priority(document.effective_date, now),
            compliance: None,
            audit_trail: Vec::new(),
        };
        workflow.audit(
            "workflow_initiated",
            &initiator.name,
            format!("{criticality:?} approval workflow initiated"),
        );

        info!(
            doc = %document.id,
            workflow = %workflow.id,
            criticality = ?criticality,
            priority = ?workflow.priority,
            "approval workflow initiated"
        );

        self.workflows
            .insert(document.id.clone(), Arc::new(Mutex::new(workflow.clone())));
        Ok(workflow)
    }

    /// Record a decision at an approval level.
    ///
    /// Authority and transition violations reject synchronously and leave
    /// the workflow untouched: no approval, no audit entry, no state move.
    pub fn record_decision(
        &self,
        doc_id: &str,
        level: WorkflowState,
        actor: &ActorIdentity,
        decision: Decision,
        comment: Option<&str>,
    ) -> Result<ApprovalWorkflow, WorkflowError> {
        if !level.is_review() {
            return Err(WorkflowError::NotAnApprovalLevel(level));
        }

        let handle = self
            .workflows
            .get(doc_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| WorkflowError::WorkflowNotFound(doc_id.to_string()))?;
        let mut workflow = handle.lock();

        if workflow.current_state.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                document_id: doc_id.to_string(),
                state: workflow.current_state,
            });
        }
        if !workflow.required_levels.contains(&level) {
            return Err(WorkflowError::LevelNotRequired(level));
        }
        if !self.config.authority.allows(level, actor.role) {
            warn!(
                doc = %doc_id,
                level = %level,
                role = %actor.role,
                "decision rejected: insufficient authority"
            );
            return Err(WorkflowError::InsufficientAuthority {
                level,
                role: actor.role,
            });
        }

        let timestamp = Utc::now();
        workflow.approvals.push(Approval {
            id: Uuid::new_v4(),
            level,
            actor: actor.name.clone(),
            role: actor.role,
            decision,
            comment: comment.map(str::to_string),
            timestamp,
            signature: sign_decision(doc_id, level, decision, &actor.name, timestamp),
        });
        let audit_action = match decision {
            Decision::Approve => "approved",
            Decision::Reject => "rejected",
            Decision::RequestChanges => "changes_requested",
        };
        workflow.audit(audit_action, &actor.name, comment.unwrap_or_default());

        match decision {
            Decision::Approve => {
                if workflow.is_complete() {
                    workflow.current_state = WorkflowState::Approved;
                    workflow.completed_at = Some(timestamp);
                } else if level == workflow.current_state {
                    let next = next_required(&workflow.required_levels, level);
                    workflow.current_state = next;
                }
            }
            Decision::Reject => {
                workflow.current_state = WorkflowState::Rejected;
            }
            Decision::RequestChanges => {
                // Not terminal: the document goes back to editing and the
                // caller re-initiates after the next edit.
                workflow.current_state = WorkflowState::Draft;
            }
        }

        info!(
            doc = %doc_id,
            level = %level,
            decision = %decision,
            state = %workflow.current_state,
            "decision recorded"
        );
        Ok(workflow.clone())
    }

    /// Withdraw an active workflow. Explicit terminal transition, distinct
    /// from rejection.
    pub fn withdraw(
        &self,
        doc_id: &str,
        actor: &ActorIdentity,
    ) -> Result<ApprovalWorkflow, WorkflowError> {
        let handle = self
            .workflows
            .get(doc_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| WorkflowError::WorkflowNotFound(doc_id.to_string()))?;
        let mut workflow = handle.lock();

        if workflow.current_state.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                document_id: doc_id.to_string(),
                state: workflow.current_state,
            });
        }

        workflow.current_state = WorkflowState::Withdrawn;
        workflow.audit("workflow_withdrawn", &actor.name, "");
        info!(doc = %doc_id, "workflow withdrawn");
        Ok(workflow.clone())
    }

    /// Run compliance screening and attach the record to the workflow.
    pub fn validate_compliance(
        &self,
        doc_id: &str,
        document: &DocumentSnapshot,
    ) -> Result<ComplianceRecord, WorkflowError> {
        let handle = self
            .workflows
            .get(doc_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| WorkflowError::WorkflowNotFound(doc_id.to_string()))?;

        let record = compliance::validate_document(document);
        let mut workflow = handle.lock();
        workflow.compliance = Some(record.clone());
        workflow.audit(
            "compliance_validated",
            "system",
            if record.passes() { "passed" } else { "failed" },
        );
        Ok(record)
    }

    /// Move an approved workflow to published.
    ///
    /// With the compliance gate configured on, refuses unless the attached
    /// compliance record passes (a missing record counts as failing).
    pub fn mark_published(&self, doc_id: &str) -> Result<ApprovalWorkflow, WorkflowError> {
        let handle = self
            .workflows
            .get(doc_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| WorkflowError::WorkflowNotFound(doc_id.to_string()))?;
        let mut workflow = handle.lock();

        if workflow.current_state != WorkflowState::Approved {
            return Err(WorkflowError::InvalidTransition {
                document_id: doc_id.to_string(),
                state: workflow.current_state,
            });
        }
        if self.config.gate_publication_on_compliance
            && !workflow.compliance.as_ref().is_some_and(|c| c.passes())
        {
            return Err(WorkflowError::ComplianceNotMet(doc_id.to_string()));
        }

        workflow.current_state = WorkflowState::Published;
        workflow.audit("document_published", "system", "");
        info!(doc = %doc_id, workflow = %workflow.id, "document published");
        Ok(workflow.clone())
    }

    /// Current snapshot of one document's workflow.
    pub fn workflow(&self, doc_id: &str) -> Option<ApprovalWorkflow> {
        self.workflows.get(doc_id).map(|r| r.value().lock().clone())
    }

    /// Snapshots of every workflow the engine holds (for reporting).
    pub fn workflows(&self) -> Vec<ApprovalWorkflow> {
        self.workflows
            .iter()
            .map(|r| r.value().lock().clone())
            .collect()
    }

    fn derive_priority(&self, effective: DateTime<Utc>, now: DateTime<Utc>) -> Priority {
        let days_until_effective = (effective - now).num_days();
        if days_until_effective < self.config.priority_critical_days {
            Priority::Critical
        } else if days_until_effective < self.config.priority_high_days {
            Priority::High
        } else if days_until_effective < self.config.priority_medium_days {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

/// Next level after `current` in the required sequence; `Approved` when
/// `current` is the last one.
fn next_required(required: &[WorkflowState], current: WorkflowState) -> WorkflowState {
    match required.iter().position(|l| *l == current) {
        Some(idx) if idx + 1 < required.len() => required[idx + 1],
        _ => WorkflowState::Approved,
    }
}
