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

//! Compliance screening.
//!
//! Four independent checks: ICAO structural layout, EUROCONTROL metadata
//! requirements, data quality, and a security screen for sensitivity
//! markers. Results are attached to the workflow record for reporting;
//! whether they gate publication is a per-tenant configuration choice.

use aeropub_core::{airac, DocumentSnapshot, SectionCode};
use chrono::{DateTime, Datelike, Utc, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Which screen produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceCheck {
    Icao,
    Eurocontrol,
    DataQuality,
    Security,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    /// Fails the check.
    Error,
    /// Recorded, does not fail the check.
    Warning,
}

/// One finding from a compliance screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceIssue {
    pub check: ComplianceCheck,
    pub severity: IssueSeverity,
    pub message: String,
}

/// Outcome of all four screens for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRecord {
    pub icao_compliant: bool,
    pub eurocontrol_compliant: bool,
    pub data_quality_verified: bool,
    pub security_cleared: bool,
    pub issues: Vec<ComplianceIssue>,
    pub validated_at: DateTime<Utc>,
}

impl ComplianceRecord {
    /// True when every screen passed.
    pub fn passes(&self) -> bool {
        self.icao_compliant
            && self.eurocontrol_compliant
            && self.data_quality_verified
            && self.security_cleared
    }
}

/// Run every screen over a document.
pub fn validate_document(document: &DocumentSnapshot) -> ComplianceRecord {
    let mut issues = Vec::new();

    let icao_compliant = check_icao(document, &mut issues);
    let eurocontrol_compliant = check_eurocontrol(document, &mut issues);
    let data_quality_verified = check_data_quality(document, &mut issues);
    let security_cleared = check_security(document, &mut issues);

    ComplianceRecord {
        icao_compliant,
        eurocontrol_compliant,
        data_quality_verified,
        security_cleared,
        issues,
        validated_at: Utc::now(),
    }
}

/// ICAO Annex 15 structural screen: the GEN/ENR/AD parts must be present
/// and the publication must carry a valid cycle and effective date.
fn check_icao(document: &DocumentSnapshot, issues: &mut Vec<ComplianceIssue>) -> bool {
    let mut ok = true;

    for code in SectionCode::ALL {
        if !document.sections.iter().any(|s| s.code == code) {
            issues.push(issue(
                ComplianceCheck::Icao,
                IssueSeverity::Error,
                format!("missing mandatory part: {code}"),
            ));
            ok = false;
        }
    }

    if !airac::is_valid_cycle(&document.airac_cycle) {
        issues.push(issue(
            ComplianceCheck::Icao,
            IssueSeverity::Error,
            format!("invalid AIRAC cycle identifier: {:?}", document.airac_cycle),
        ));
        ok = false;
    }

    // AIRAC effective dates fall on Thursdays; a miss is worth flagging
    // but is not a structural failure.
    if document.effective_date.weekday() != Weekday::Thu {
        issues.push(issue(
            ComplianceCheck::Icao,
            IssueSeverity::Warning,
            "effective date is not a Thursday".to_string(),
        ));
    }

    ok
}

/// EUROCONTROL eAIP metadata screen: authority, contact, and a plausible
/// ISO 639 language code.
fn check_eurocontrol(document: &DocumentSnapshot, issues: &mut Vec<ComplianceIssue>) -> bool {
    let mut ok = true;

    if document.info.authority.trim().is_empty() {
        issues.push(issue(
            ComplianceCheck::Eurocontrol,
            IssueSeverity::Error,
            "missing required metadata field: authority".to_string(),
        ));
        ok = false;
    }
    if document.info.contact.trim().is_empty() {
        issues.push(issue(
            ComplianceCheck::Eurocontrol,
            IssueSeverity::Error,
            "missing required metadata field: contact".to_string(),
        ));
        ok = false;
    }

    let language = document.info.language.trim();
    let language_ok =
        (2..=3).contains(&language.len()) && language.chars().all(|c| c.is_ascii_lowercase());
    if !language_ok {
        issues.push(issue(
            ComplianceCheck::Eurocontrol,
            IssueSeverity::Error,
            format!("language is not an ISO 639 code: {language:?}"),
        ));
        ok = false;
    }

    ok
}

/// Data quality: mandatory metadata populated and no hollow sections.
fn check_data_quality(document: &DocumentSnapshot, issues: &mut Vec<ComplianceIssue>) -> bool {
    let mut ok = true;

    if document.title.trim().is_empty() {
        issues.push(issue(
            ComplianceCheck::DataQuality,
            IssueSeverity::Error,
            "document title is empty".to_string(),
        ));
        ok = false;
    }

    if document.sections.is_empty() {
        issues.push(issue(
            ComplianceCheck::DataQuality,
            IssueSeverity::Error,
            "document has no sections".to_string(),
        ));
        ok = false;
    }

    for section in &document.sections {
        if section.subsections.is_empty() {
            issues.push(issue(
                ComplianceCheck::DataQuality,
                IssueSeverity::Error,
                format!("section {} ({}) has no subsections", section.code, section.id),
            ));
            ok = false;
        }
    }

    ok
}

/// Patterns that must not appear in a publication destined for the public
/// AIP. Matched case-insensitively over the serialized document.
fn sensitivity_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)classified",
            r"(?i)restricted",
            r"(?i)confidential",
            r"(?i)security.?sensitive",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
    })
}

fn check_security(document: &DocumentSnapshot, issues: &mut Vec<ComplianceIssue>) -> bool {
    let text = serde_json::to_string(document).unwrap_or_default();

    let mut ok = true;
    for pattern in sensitivity_patterns() {
        if pattern.is_match(&text) {
            issues.push(issue(
                ComplianceCheck::Security,
                IssueSeverity::Error,
                format!("document matches sensitivity marker {:?}", pattern.as_str()),
            ));
            ok = false;
        }
    }
    ok
}

fn issue(check: ComplianceCheck, severity: IssueSeverity, message: String) -> ComplianceIssue {
    ComplianceIssue {
        check,
        severity,
        message,
    }
}
