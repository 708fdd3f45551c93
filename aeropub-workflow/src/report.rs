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

//! Aggregate reporting over approval workflows.

use crate::engine::ApprovalWorkflow;
use crate::state::WorkflowState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cross-workflow metrics for one reporting period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalReport {
    pub total_workflows: usize,
    pub completed_workflows: usize,
    pub pending_workflows: usize,
    pub average_completion_hours: f64,
    /// Completed share, 0-100.
    pub completion_rate: f64,
    /// States holding more than 20% of all workflows.
    pub bottlenecks: Vec<WorkflowState>,
    /// Share of workflows whose compliance screens passed, 0-100.
    pub compliance_rate: f64,
    pub generated_at: DateTime<Utc>,
}

/// Threshold above which a state counts as a bottleneck.
const BOTTLENECK_SHARE: f64 = 0.2;

/// Build a report over a set of workflows.
pub fn generate_report(workflows: &[ApprovalWorkflow]) -> ApprovalReport {
    let total = workflows.len();
    let completed = workflows.iter().filter(|w| w.completed_at.is_some()).count();

    ApprovalReport {
        total_workflows: total,
        completed_workflows: completed,
        pending_workflows: total - completed,
        average_completion_hours: average_completion_hours(workflows),
        completion_rate: percentage(completed, total),
        bottlenecks: bottlenecks(workflows),
        compliance_rate: compliance_rate(workflows),
        generated_at: Utc::now(),
    }
}

fn average_completion_hours(workflows: &[ApprovalWorkflow]) -> f64 {
    let durations: Vec<i64> = workflows
        .iter()
        .filter_map(|w| {
            w.completed_at
                .map(|done| (done - w.initiated_at).num_milliseconds())
        })
        .collect();
    if durations.is_empty() {
        return 0.0;
    }
    let total_ms: i64 = durations.iter().sum();
    total_ms as f64 / durations.len() as f64 / (60.0 * 60.0 * 1000.0)
}

fn bottlenecks(workflows: &[ApprovalWorkflow]) -> Vec<WorkflowState> {
    let mut by_state: HashMap<WorkflowState, usize> = HashMap::new();
    for workflow in workflows {
        *by_state.entry(workflow.current_state).or_default() += 1;
    }

    let threshold = workflows.len() as f64 * BOTTLENECK_SHARE;
    let mut states: Vec<WorkflowState> = by_state
        .into_iter()
        .filter(|(_, count)| *count as f64 > threshold)
        .map(|(state, _)| state)
        .collect();
    states.sort_by_key(|s| s.as_str());
    states
}

fn compliance_rate(workflows: &[ApprovalWorkflow]) -> f64 {
    if workflows.is_empty() {
        return 100.0;
    }
    let compliant = workflows
        .iter()
        .filter(|w| w.compliance.as_ref().is_some_and(|c| c.passes()))
        .count();
    percentage(compliant, workflows.len())
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
