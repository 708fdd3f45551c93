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

//! End-to-end publication cycle: edit, review, approve, merge, tag.

use aeropub_core::{
    ActorIdentity, DocumentInfo, DocumentSnapshot, ReviewRole, Section, SectionCode, Subsection,
};
use aeropub_storage::{DiffEngine, MergeOutcome, RegistryError, RepositoryError, RepositoryRegistry};
use aeropub_workflow::{
    Criticality, Decision, Priority, WorkflowEngine, WorkflowState,
};
use chrono::{Duration, Utc};

fn editor() -> ActorIdentity {
    ActorIdentity::new("E. Ditor", "editor@caa.example", ReviewRole::TechnicalReviewer)
}

fn ops_reviewer() -> ActorIdentity {
    ActorIdentity::new("O. Ps", "ops@caa.example", ReviewRole::OperationalReviewer)
}

fn sample_document(due_in_days: i64) -> DocumentSnapshot {
    let mut doc = DocumentSnapshot::new(
        "doc-aip",
        "AIP Testland",
        "2025-07",
        Utc::now() + Duration::days(due_in_days),
    )
    .with_info(DocumentInfo {
        authority: "Testland CAA".to_string(),
        contact: "ais@caa.example".to_string(),
        language: "en".to_string(),
    });

    for (i, code) in SectionCode::ALL.iter().enumerate() {
        doc = doc.with_section(
            Section::new(format!("sec-{i}"), *code, code.as_str()).with_subsection(
                Subsection::new(format!("sub-{i}"), "1.1", "Overview", "initial content"),
            ),
        );
    }
    doc
}

#[test]
fn routine_review_cycle_through_publication() {
    let dir = tempfile::tempdir().unwrap();
    let registry = RepositoryRegistry::new(dir.path());
    let workflows = WorkflowEngine::with_defaults();
    let org = "caa-testland";

    // The published line starts with the document's first version.
    let mut doc = sample_document(10);
    registry
        .commit_document(org, &doc, &editor(), None)
        .unwrap();

    // Review edits happen on an isolated branch.
    registry
        .start_review_branch(org, "review/2025-07", None)
        .unwrap();
    doc.sections[0].subsections[0].content = "amended content for 2025-07".to_string();
    registry
        .commit_document(org, &doc, &editor(), None)
        .unwrap();

    // A ROUTINE document due in 10 days reviews at high priority.
    let workflow = workflows
        .initiate(&doc, &editor(), Criticality::Routine)
        .unwrap();
    assert_eq!(workflow.priority, Priority::High);
    assert_eq!(workflow.current_state, WorkflowState::TechnicalReview);

    // Both required approvals, nominal order.
    workflows
        .record_decision(
            "doc-aip",
            WorkflowState::TechnicalReview,
            &editor(),
            Decision::Approve,
            Some("technical content verified"),
        )
        .unwrap();
    let workflow = workflows
        .record_decision(
            "doc-aip",
            WorkflowState::OperationalReview,
            &ops_reviewer(),
            Decision::Approve,
            None,
        )
        .unwrap();
    assert_eq!(workflow.current_state, WorkflowState::Approved);
    assert!(workflow.completed_at.is_some());

    // Compliance screening attaches to the workflow record.
    let compliance = workflows.validate_compliance("doc-aip", &doc).unwrap();
    assert!(compliance.passes());

    // Review branch folds back into the published line.
    let merge = registry
        .merge(org, "review/2025-07", "main", &ops_reviewer())
        .unwrap();
    assert!(matches!(merge, MergeOutcome::FastForward(_)));

    // The release tag lands exactly once.
    registry.tag_release(org, "2025-07", "AIRAC 2025-07").unwrap();
    let err = registry
        .tag_release(org, "2025-07", "tagged twice")
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Repository(RepositoryError::DuplicateTag(_))
    ));
    assert_eq!(registry.list_tags(org).unwrap(), vec!["2025-07".to_string()]);

    let workflow = workflows.mark_published("doc-aip").unwrap();
    assert_eq!(workflow.current_state, WorkflowState::Published);

    // The published snapshot carries the review edit, and the structural
    // diff against the first version shows exactly that one change.
    let history = registry.history(org, "doc-aip", 10).unwrap();
    assert_eq!(history.len(), 2);

    let published = registry.read_at(org, "doc-aip", "2025-07").unwrap();
    assert_eq!(
        published.sections[0].subsections[0].content,
        "amended content for 2025-07"
    );

    let first = registry
        .read_at(org, "doc-aip", &history[1].commit_id.to_hex())
        .unwrap();
    let changes = DiffEngine::new().diff(&first, &published);
    assert_eq!(changes.total_additions, 1);
    assert_eq!(changes.total_deletions, 1);
}

#[test]
fn tenants_never_observe_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let registry = RepositoryRegistry::new(dir.path());

    let doc = sample_document(30);
    registry
        .commit_document("caa-alpha", &doc, &editor(), None)
        .unwrap();

    assert!(registry.read_at("caa-beta", "doc-aip", "HEAD").is_err());
    assert!(registry.history("caa-beta", "doc-aip", 10).unwrap().is_empty());
    assert!(registry.list_tags("caa-beta").unwrap().is_empty());
}
