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

//! Structured document model.
//!
//! A document is a title plus an ordered list of sections, each holding an
//! ordered list of subsections. Section and subsection identifiers are stable
//! across edits so that two snapshots can be matched entity-by-entity rather
//! than positionally. Subsection `content` is an opaque rich-content payload:
//! it is stored and compared verbatim, never parsed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level AIP part codes (ICAO Annex 15 layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionCode {
    /// General (GEN)
    #[serde(rename = "GEN")]
    Gen,
    /// En-route (ENR)
    #[serde(rename = "ENR")]
    Enr,
    /// Aerodromes (AD)
    #[serde(rename = "AD")]
    Ad,
}

impl SectionCode {
    /// All part codes, in publication order.
    pub const ALL: [SectionCode; 3] = [SectionCode::Gen, SectionCode::Enr, SectionCode::Ad];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionCode::Gen => "GEN",
            SectionCode::Enr => "ENR",
            SectionCode::Ad => "AD",
        }
    }
}

impl std::fmt::Display for SectionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication lifecycle status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Review,
    Approved,
    Published,
    Archived,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Review => "review",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Published => "published",
            DocumentStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subsection: the smallest independently tracked unit of content.
///
/// `code` is the stable identifier within its section (e.g. "1.1"); the
/// `content` payload belongs to the editor subsystem and is opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    pub id: String,
    pub code: String,
    pub title: String,
    pub content: String,
}

impl Subsection {
    pub fn new(
        id: impl Into<String>,
        code: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A section: one of the GEN/ENR/AD parts of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub code: SectionCode,
    pub title: String,
    pub subsections: Vec<Subsection>,
}

impl Section {
    pub fn new(id: impl Into<String>, code: SectionCode, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code,
            title: title.into(),
            subsections: Vec::new(),
        }
    }

    pub fn with_subsection(mut self, subsection: Subsection) -> Self {
        self.subsections.push(subsection);
        self
    }

    /// Look up a subsection by its stable code.
    pub fn subsection(&self, code: &str) -> Option<&Subsection> {
        self.subsections.iter().find(|s| s.code == code)
    }
}

/// Mandatory publication metadata carried by every document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Publishing authority (e.g. a national CAA).
    pub authority: String,
    /// Contact for the publishing authority.
    pub contact: String,
    /// Publication language (ISO 639 code).
    pub language: String,
}

/// The full structured content of one document, as stored in one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub id: String,
    pub title: String,
    pub status: DocumentStatus,
    /// AIRAC cycle this snapshot targets, e.g. "2025-07".
    pub airac_cycle: String,
    /// Date the publication becomes effective.
    pub effective_date: DateTime<Utc>,
    pub sections: Vec<Section>,
    pub info: DocumentInfo,
}

impl DocumentSnapshot {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        airac_cycle: impl Into<String>,
        effective_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: DocumentStatus::Draft,
            airac_cycle: airac_cycle.into(),
            effective_date,
            sections: Vec::new(),
            info: DocumentInfo::default(),
        }
    }

    pub fn with_info(mut self, info: DocumentInfo) -> Self {
        self.info = info;
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Look up a section by its stable identifier.
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Canonical on-disk representation.
    ///
    /// Snapshot equality at the storage layer is byte equality of this
    /// encoding, so the encoding must be deterministic: field order follows
    /// struct declaration, collections keep their input order.
    pub fn canonical_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Build the metadata sidecar written alongside the document file.
    pub fn sidecar(&self, modified_by: &str, at: DateTime<Utc>) -> MetadataSidecar {
        MetadataSidecar {
            document_id: self.id.clone(),
            title: self.title.clone(),
            status: self.status,
            airac_cycle: self.airac_cycle.clone(),
            effective_date: self.effective_date,
            last_modified: at,
            modified_by: modified_by.to_string(),
        }
    }
}

/// Small JSON sidecar stored next to every document file, one per document.
///
/// Both files are updated together in every commit touching the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSidecar {
    pub document_id: String,
    pub title: String,
    pub status: DocumentStatus,
    pub airac_cycle: String,
    pub effective_date: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub modified_by: String,
}

impl MetadataSidecar {
    pub fn canonical_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> DocumentSnapshot {
        DocumentSnapshot::new(
            "doc-1",
            "AIP Example",
            "2025-07",
            Utc.with_ymd_and_hms(2025, 7, 10, 0, 0, 0).unwrap(),
        )
        .with_section(
            Section::new("sec-gen", SectionCode::Gen, "General").with_subsection(Subsection::new(
                "sub-1",
                "1.1",
                "Designated authorities",
                "authority text",
            )),
        )
    }

    #[test]
    fn canonical_bytes_are_deterministic() {
        let doc = sample();
        assert_eq!(
            doc.canonical_bytes().unwrap(),
            doc.clone().canonical_bytes().unwrap()
        );
    }

    #[test]
    fn canonical_bytes_change_with_content() {
        let doc = sample();
        let mut edited = doc.clone();
        edited.sections[0].subsections[0].content = "revised text".to_string();
        assert_ne!(
            doc.canonical_bytes().unwrap(),
            edited.canonical_bytes().unwrap()
        );
    }

    #[test]
    fn canonical_roundtrip() {
        let doc = sample();
        let bytes = doc.canonical_bytes().unwrap();
        let parsed: DocumentSnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn sidecar_carries_editor_attribution() {
        let doc = sample();
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let sidecar = doc.sidecar("A. Editor", at);
        assert_eq!(sidecar.document_id, "doc-1");
        assert_eq!(sidecar.modified_by, "A. Editor");
        assert_eq!(sidecar.last_modified, at);
    }

    #[test]
    fn section_lookup_by_stable_id() {
        let doc = sample();
        assert!(doc.section("sec-gen").is_some());
        assert!(doc.section("sec-missing").is_none());
        assert!(doc.section("sec-gen").unwrap().subsection("1.1").is_some());
    }
}
