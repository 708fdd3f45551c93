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

//! Structural diff engine.
//!
//! Compares two document snapshots by matching sections and subsections on
//! their stable identifiers, not their positions, so a reordered or edited
//! entity is never misreported as a delete-plus-add. Subsection content is
//! compared as an exact string; it is never parsed.
//!
//! The engine is a pure function over two in-memory snapshots and never
//! touches the repository store, so any two commits' snapshots can be
//! compared, not just adjacent ones.

use aeropub_core::{DocumentSnapshot, Section, SectionCode, Subsection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What happened to an entity between the two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
}

/// One entry in a change set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Change {
    /// The document title changed.
    Title { old: String, new: String },
    /// A section was added, deleted, or had its own title modified.
    Section {
        kind: ChangeKind,
        section_id: String,
        section_code: SectionCode,
        old: Option<Section>,
        new: Option<Section>,
    },
    /// A subsection changed within a section present in both snapshots,
    /// or belongs to a section that was added or deleted wholesale.
    Subsection {
        kind: ChangeKind,
        section_id: String,
        section_code: SectionCode,
        subsection_code: String,
        old: Option<Subsection>,
        new: Option<Subsection>,
    },
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Title { .. } => ChangeKind::Modified,
            Change::Section { kind, .. } | Change::Subsection { kind, .. } => *kind,
        }
    }
}

/// The full structural difference between two snapshots.
///
/// A `Modified` entry counts toward both totals: it stands for one old and
/// one new version of the entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    pub changes: Vec<Change>,
    pub total_additions: usize,
    pub total_deletions: usize,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    fn push(&mut self, change: Change) {
        match change.kind() {
            ChangeKind::Added => self.total_additions += 1,
            ChangeKind::Deleted => self.total_deletions += 1,
            ChangeKind::Modified => {
                self.total_additions += 1;
                self.total_deletions += 1;
            }
        }
        self.changes.push(change);
    }
}

/// Identity-based structural diff over document snapshots.
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute the change set from `old` to `new`.
    ///
    /// Output order is deterministic: title first, then deletions and
    /// modifications in old-snapshot order, then additions in new-snapshot
    /// order; subsection entries follow their section.
    pub fn diff(&self, old: &DocumentSnapshot, new: &DocumentSnapshot) -> ChangeSet {
        let mut set = ChangeSet::default();

        if old.title != new.title {
            set.push(Change::Title {
                old: old.title.clone(),
                new: new.title.clone(),
            });
        }

        let old_by_id: HashMap<&str, &Section> =
            old.sections.iter().map(|s| (s.id.as_str(), s)).collect();
        let new_by_id: HashMap<&str, &Section> =
            new.sections.iter().map(|s| (s.id.as_str(), s)).collect();

        for old_section in &old.sections {
            match new_by_id.get(old_section.id.as_str()) {
                None => self.section_removed(&mut set, old_section),
                Some(new_section) => self.section_matched(&mut set, old_section, new_section),
            }
        }

        for new_section in &new.sections {
            if !old_by_id.contains_key(new_section.id.as_str()) {
                self.section_added(&mut set, new_section);
            }
        }

        set
    }

    fn section_removed(&self, set: &mut ChangeSet, section: &Section) {
        set.push(Change::Section {
            kind: ChangeKind::Deleted,
            section_id: section.id.clone(),
            section_code: section.code,
            old: Some(section.clone()),
            new: None,
        });
        for subsection in &section.subsections {
            set.push(Change::Subsection {
                kind: ChangeKind::Deleted,
                section_id: section.id.clone(),
                section_code: section.code,
                subsection_code: subsection.code.clone(),
                old: Some(subsection.clone()),
                new: None,
            });
        }
    }

    fn section_added(&self, set: &mut ChangeSet, section: &Section) {
        set.push(Change::Section {
            kind: ChangeKind::Added,
            section_id: section.id.clone(),
            section_code: section.code,
            old: None,
            new: Some(section.clone()),
        });
        for subsection in &section.subsections {
            set.push(Change::Subsection {
                kind: ChangeKind::Added,
                section_id: section.id.clone(),
                section_code: section.code,
                subsection_code: subsection.code.clone(),
                old: None,
                new: Some(subsection.clone()),
            });
        }
    }

    /// Section present in both snapshots: compare its own title, then match
    /// subsections by code one level down.
    fn section_matched(&self, set: &mut ChangeSet, old: &Section, new: &Section) {
        if old.title != new.title {
            set.push(Change::Section {
                kind: ChangeKind::Modified,
                section_id: old.id.clone(),
                section_code: old.code,
                old: Some(old.clone()),
                new: Some(new.clone()),
            });
        }

        let old_by_code: HashMap<&str, &Subsection> = old
            .subsections
            .iter()
            .map(|s| (s.code.as_str(), s))
            .collect();
        let new_by_code: HashMap<&str, &Subsection> = new
            .subsections
            .iter()
            .map(|s| (s.code.as_str(), s))
            .collect();

        for old_sub in &old.subsections {
            match new_by_code.get(old_sub.code.as_str()) {
                None => set.push(Change::Subsection {
                    kind: ChangeKind::Deleted,
                    section_id: old.id.clone(),
                    section_code: old.code,
                    subsection_code: old_sub.code.clone(),
                    old: Some(old_sub.clone()),
                    new: None,
                }),
                Some(new_sub) => {
                    if old_sub.title != new_sub.title || old_sub.content != new_sub.content {
                        set.push(Change::Subsection {
                            kind: ChangeKind::Modified,
                            section_id: old.id.clone(),
                            section_code: old.code,
                            subsection_code: old_sub.code.clone(),
                            old: Some(old_sub.clone()),
                            new: Some((*new_sub).clone()),
                        });
                    }
                }
            }
        }

        for new_sub in &new.subsections {
            if !old_by_code.contains_key(new_sub.code.as_str()) {
                set.push(Change::Subsection {
                    kind: ChangeKind::Added,
                    section_id: old.id.clone(),
                    section_code: old.code,
                    subsection_code: new_sub.code.clone(),
                    old: None,
                    new: Some(new_sub.clone()),
                });
            }
        }
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeropub_core::DocumentStatus;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn base_doc() -> DocumentSnapshot {
        DocumentSnapshot::new(
            "doc-1",
            "AIP Testland",
            "2025-05",
            Utc.with_ymd_and_hms(2025, 5, 15, 0, 0, 0).unwrap(),
        )
        .with_section(
            Section::new("sec-gen", SectionCode::Gen, "General")
                .with_subsection(Subsection::new("s1", "1.1", "Authorities", "gen text"))
                .with_subsection(Subsection::new("s2", "1.2", "Entry rules", "entry text")),
        )
        .with_section(
            Section::new("sec-enr", SectionCode::Enr, "En-route")
                .with_subsection(Subsection::new("s3", "1.1", "General rules", "enr text")),
        )
    }

    #[test]
    fn identical_snapshots_produce_empty_set() {
        let doc = base_doc();
        let set = DiffEngine::new().diff(&doc, &doc.clone());
        assert!(set.is_empty());
        assert_eq!(set.total_additions, 0);
        assert_eq!(set.total_deletions, 0);
    }

    #[test]
    fn single_subsection_edit_yields_one_scoped_modification() {
        let old = base_doc();
        let mut new = old.clone();
        new.sections[0].subsections[1].content = "revised entry text".to_string();

        let set = DiffEngine::new().diff(&old, &new);
        assert_eq!(set.len(), 1);
        assert_eq!(set.total_additions, 1);
        assert_eq!(set.total_deletions, 1);

        match &set.changes[0] {
            Change::Subsection {
                kind,
                section_id,
                subsection_code,
                old,
                new,
                ..
            } => {
                assert_eq!(*kind, ChangeKind::Modified);
                assert_eq!(section_id, "sec-gen");
                assert_eq!(subsection_code, "1.2");
                assert!(old.is_some() && new.is_some());
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[test]
    fn added_section_reports_itself_and_its_subsections() {
        let old = base_doc();
        let new = old.clone().with_section(
            Section::new("sec-ad", SectionCode::Ad, "Aerodromes")
                .with_subsection(Subsection::new("s4", "1.1", "Introduction", "ad intro"))
                .with_subsection(Subsection::new("s5", "1.2", "Categories", "ad categories")),
        );

        let set = DiffEngine::new().diff(&old, &new);
        assert_eq!(set.len(), 3);
        assert_eq!(set.total_additions, 3);
        assert_eq!(set.total_deletions, 0);
        assert!(set.changes.iter().all(|c| c.kind() == ChangeKind::Added));
        assert!(matches!(&set.changes[0], Change::Section { .. }));
    }

    #[test]
    fn deleted_section_retains_old_content() {
        let old = base_doc();
        let mut new = old.clone();
        new.sections.remove(1);

        let set = DiffEngine::new().diff(&old, &new);
        // Section entry plus its single subsection.
        assert_eq!(set.len(), 2);
        assert_eq!(set.total_deletions, 2);
        match &set.changes[0] {
            Change::Section { kind, old, new, .. } => {
                assert_eq!(*kind, ChangeKind::Deleted);
                assert!(old.is_some());
                assert!(new.is_none());
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[test]
    fn title_change_is_one_modified_entry() {
        let old = base_doc();
        let mut new = old.clone();
        new.title = "AIP Testland, Amendment 2".to_string();

        let set = DiffEngine::new().diff(&old, &new);
        assert_eq!(set.len(), 1);
        assert!(matches!(&set.changes[0], Change::Title { .. }));
        assert_eq!(set.total_additions, 1);
        assert_eq!(set.total_deletions, 1);
    }

    #[test]
    fn reordered_sections_are_not_changes() {
        let old = base_doc();
        let mut new = old.clone();
        new.sections.reverse();
        new.sections.iter_mut().for_each(|s| s.subsections.reverse());

        let set = DiffEngine::new().diff(&old, &new);
        assert!(set.is_empty());
    }

    #[test]
    fn empty_documents_diff_to_title_change_only() {
        let empty = |title: &str| {
            DocumentSnapshot::new(
                "doc-e",
                title,
                "2025-01",
                Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap(),
            )
        };
        let set = DiffEngine::new().diff(&empty("One"), &empty("Two"));
        assert_eq!(set.len(), 1);

        let set = DiffEngine::new().diff(&empty("Same"), &empty("Same"));
        assert!(set.is_empty());
    }

    #[test]
    fn output_order_is_stable() {
        let old = base_doc();
        let mut new = old.clone();
        new.title = "Renamed".into();
        new.sections[0].subsections[0].content = "edited".into();
        new.sections.remove(1);

        let a = DiffEngine::new().diff(&old, &new);
        let b = DiffEngine::new().diff(&old, &new);
        let a_json = serde_json::to_string(&a.changes).unwrap();
        let b_json = serde_json::to_string(&b.changes).unwrap();
        assert_eq!(a_json, b_json);

        // Title leads, then old-order entries.
        assert!(matches!(&a.changes[0], Change::Title { .. }));
    }

    fn arb_subsection() -> impl Strategy<Value = Subsection> {
        (".{0,16}", ".{0,32}")
            .prop_map(|(title, content)| Subsection::new("", "", title, content))
    }

    fn arb_section() -> impl Strategy<Value = Section> {
        (".{0,16}", prop::collection::vec(arb_subsection(), 0..4)).prop_map(
            |(title, subsections)| {
                let mut section = Section::new("", SectionCode::Gen, title);
                section.subsections = subsections;
                section
            },
        )
    }

    // Identifiers must be unique within a snapshot (the stable-identity
    // invariant), so they are assigned positionally after generation.
    fn arb_document() -> impl Strategy<Value = DocumentSnapshot> {
        (".{0,24}", prop::collection::vec(arb_section(), 0..3)).prop_map(|(title, sections)| {
            let mut doc = DocumentSnapshot::new(
                "doc-p",
                title,
                "2025-01",
                Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap(),
            );
            doc.status = DocumentStatus::Draft;
            doc.sections = sections;
            for (i, section) in doc.sections.iter_mut().enumerate() {
                section.id = format!("sec-{i}");
                for (j, subsection) in section.subsections.iter_mut().enumerate() {
                    subsection.id = format!("sub-{i}-{j}");
                    subsection.code = format!("{i}.{j}");
                }
            }
            doc
        })
    }

    proptest! {
        #[test]
        fn diff_of_snapshot_with_itself_is_empty(doc in arb_document()) {
            let set = DiffEngine::new().diff(&doc, &doc);
            prop_assert!(set.is_empty());
            prop_assert_eq!(set.total_additions, 0);
            prop_assert_eq!(set.total_deletions, 0);
        }
    }
}
