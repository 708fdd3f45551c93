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

//! Per-organization repository registry.
//!
//! Owns the open/close lifecycle of every organization's repository under
//! one storage root. Handles are pooled in a concurrent map with per-key
//! locking, so two requests for the same organization share one handle
//! while different organizations never contend on anything.
//!
//! Tenant isolation invariant: a repository lives under
//! `<root>/<org-id>/` and is reachable only through that organization's
//! handle. There is no cross-tenant read path.

use super::repository::{
    CommitOutcome, CommitRecord, DocumentRepository, MergeOutcome, RepositoryError,
};
use aeropub_core::{ActorIdentity, DocumentSnapshot};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid organization id {0:?}")]
    InvalidOrganization(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Handle pool over all organization repositories below one root.
pub struct RepositoryRegistry {
    root: PathBuf,
    handles: DashMap<String, Arc<DocumentRepository>>,
}

impl RepositoryRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            handles: DashMap::new(),
        }
    }

    /// Open an organization's repository, creating it on first use.
    ///
    /// Concurrent calls for the same organization resolve to the same
    /// handle; the dashmap entry lock makes initialization race-free.
    pub fn open_or_create(&self, org_id: &str) -> Result<Arc<DocumentRepository>, RegistryError> {
        validate_org_id(org_id)?;

        match self.handles.entry(org_id.to_string()) {
            Entry::Occupied(occupied) => Ok(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                let path = self.root.join(org_id);
                let created = !path.exists();
                let repo = Arc::new(DocumentRepository::open(org_id, &path)?);
                if created {
                    info!(org = %org_id, "provisioned organization repository");
                }
                Ok(vacant.insert(repo).clone())
            }
        }
    }

    /// Flush and drop an organization's handle. The on-disk repository
    /// stays; the next [`open_or_create`] reloads it.
    ///
    /// [`open_or_create`]: RepositoryRegistry::open_or_create
    pub fn close(&self, org_id: &str) -> Result<(), RegistryError> {
        if let Some((_, repo)) = self.handles.remove(org_id) {
            repo.save()?;
            info!(org = %org_id, "closed organization repository");
        }
        Ok(())
    }

    /// Organizations with an open handle.
    pub fn open_count(&self) -> usize {
        self.handles.len()
    }

    // === Org-scoped operation surface ===

    pub fn commit_document(
        &self,
        org_id: &str,
        document: &DocumentSnapshot,
        editor: &ActorIdentity,
        message: Option<&str>,
    ) -> Result<CommitOutcome, RegistryError> {
        Ok(self
            .open_or_create(org_id)?
            .commit_document(document, editor, message)?)
    }

    pub fn history(
        &self,
        org_id: &str,
        doc_id: &str,
        limit: usize,
    ) -> Result<Vec<CommitRecord>, RegistryError> {
        Ok(self.open_or_create(org_id)?.history(doc_id, limit)?)
    }

    pub fn read_at(
        &self,
        org_id: &str,
        doc_id: &str,
        reference: &str,
    ) -> Result<DocumentSnapshot, RegistryError> {
        Ok(self.open_or_create(org_id)?.read_at(doc_id, reference)?)
    }

    /// Create a review branch from the published line (or `from`) and
    /// check it out so subsequent commits land on it.
    pub fn start_review_branch(
        &self,
        org_id: &str,
        name: &str,
        from: Option<&str>,
    ) -> Result<(), RegistryError> {
        let repo = self.open_or_create(org_id)?;
        repo.create_branch(name, from)?;
        repo.checkout(name)?;
        Ok(())
    }

    pub fn merge(
        &self,
        org_id: &str,
        source: &str,
        target: &str,
        merger: &ActorIdentity,
    ) -> Result<MergeOutcome, RegistryError> {
        Ok(self.open_or_create(org_id)?.merge(source, target, merger)?)
    }

    pub fn tag_release(
        &self,
        org_id: &str,
        name: &str,
        message: &str,
    ) -> Result<(), RegistryError> {
        self.open_or_create(org_id)?.tag_release(name, message)?;
        Ok(())
    }

    pub fn list_tags(&self, org_id: &str) -> Result<Vec<String>, RegistryError> {
        Ok(self.open_or_create(org_id)?.list_tags())
    }
}

/// Organization ids become directory names; reject anything that could
/// escape the storage root.
fn validate_org_id(org_id: &str) -> Result<(), RegistryError> {
    let ok = !org_id.is_empty()
        && org_id.len() <= 128
        && org_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(RegistryError::InvalidOrganization(org_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeropub_core::{ReviewRole, Section, SectionCode, Subsection};
    use chrono::{TimeZone, Utc};

    fn editor() -> ActorIdentity {
        ActorIdentity::new("E. Ditor", "editor@caa.example", ReviewRole::TechnicalReviewer)
    }

    fn sample_doc(id: &str) -> DocumentSnapshot {
        DocumentSnapshot::new(
            id,
            "AIP Testland",
            "2025-06",
            Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap(),
        )
        .with_section(
            Section::new("sec-gen", SectionCode::Gen, "General").with_subsection(
                Subsection::new("sub-1", "1.1", "Authorities", "text"),
            ),
        )
    }

    #[test]
    fn handles_are_shared_per_organization() {
        let dir = tempfile::tempdir().unwrap();
        let registry = RepositoryRegistry::new(dir.path());

        let a = registry.open_or_create("org-a").unwrap();
        let b = registry.open_or_create("org-a").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.open_count(), 1);
    }

    #[test]
    fn organizations_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let registry = RepositoryRegistry::new(dir.path());

        registry
            .commit_document("org-a", &sample_doc("doc-1"), &editor(), None)
            .unwrap();

        // org-b shares nothing with org-a.
        assert!(registry.history("org-b", "doc-1", 10).unwrap().is_empty());
        assert!(registry.read_at("org-b", "doc-1", "HEAD").is_err());
        assert!(registry.read_at("org-a", "doc-1", "HEAD").is_ok());
    }

    #[test]
    fn close_flushes_and_reopen_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let registry = RepositoryRegistry::new(dir.path());

        registry
            .commit_document("org-a", &sample_doc("doc-1"), &editor(), None)
            .unwrap();
        registry.close("org-a").unwrap();
        assert_eq!(registry.open_count(), 0);

        let history = registry.history("org-a", "doc-1", 10).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn path_escaping_org_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = RepositoryRegistry::new(dir.path());

        for bad in ["", "../other", "a/b", "a\\b", "dot.dot"] {
            assert!(matches!(
                registry.open_or_create(bad),
                Err(RegistryError::InvalidOrganization(_))
            ));
        }
    }

    #[test]
    fn review_branch_commit_merge_tag_flow() {
        let dir = tempfile::tempdir().unwrap();
        let registry = RepositoryRegistry::new(dir.path());
        let org = "org-a";

        let mut doc = sample_doc("doc-1");
        registry
            .commit_document(org, &doc, &editor(), None)
            .unwrap();

        registry
            .start_review_branch(org, "review/2025-07", None)
            .unwrap();
        doc.sections[0].subsections[0].content = "review edit".into();
        registry
            .commit_document(org, &doc, &editor(), None)
            .unwrap();

        let outcome = registry
            .merge(org, "review/2025-07", "main", &editor())
            .unwrap();
        assert!(matches!(outcome, MergeOutcome::FastForward(_)));

        registry.tag_release(org, "2025-07", "AIRAC 2025-07").unwrap();
        assert_eq!(registry.list_tags(org).unwrap(), vec!["2025-07".to_string()]);
    }
}
