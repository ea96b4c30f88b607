use serde::{Deserialize, Serialize};

use crate::divergence::SnapshotRole;
use crate::document::Document;
use crate::resolution::Resolution;

/// Everything one divergence computation needs.
///
/// All three snapshots are required for a non-empty result; a missing
/// snapshot is an expected state (still loading, deleted) rather than an
/// error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FindDivergencesContext {
    pub upstream_at_fork: Option<Document>,
    pub upstream_head: Option<Document>,
    pub subject_head: Option<Document>,
    pub resolutions: Vec<Resolution>,
}

impl FindDivergencesContext {
    pub fn new(
        upstream_at_fork: Document,
        upstream_head: Document,
        subject_head: Document,
    ) -> Self {
        Self {
            upstream_at_fork: Some(upstream_at_fork),
            upstream_head: Some(upstream_head),
            subject_head: Some(subject_head),
            resolutions: Vec::new(),
        }
    }

    pub fn with_resolutions(mut self, resolutions: Vec<Resolution>) -> Self {
        self.resolutions = resolutions;
        self
    }

    pub fn snapshot(&self, role: SnapshotRole) -> Option<&Document> {
        match role {
            SnapshotRole::UpstreamAtFork => self.upstream_at_fork.as_ref(),
            SnapshotRole::UpstreamHead => self.upstream_head.as_ref(),
            SnapshotRole::SubjectHead => self.subject_head.as_ref(),
        }
    }

    /// Whether all three snapshots are present.
    pub fn is_complete(&self) -> bool {
        SnapshotRole::ALL.iter().all(|r| self.snapshot(*r).is_some())
    }

    /// The parts of this context that decide whether a recomputation is needed.
    pub fn fingerprint(&self) -> ContextFingerprint {
        let rev = |role| {
            self.snapshot(role)
                .map(|doc| doc.rev().map(str::to_owned))
        };
        ContextFingerprint {
            upstream_at_fork: rev(SnapshotRole::UpstreamAtFork),
            upstream_head: rev(SnapshotRole::UpstreamHead),
            subject_head: rev(SnapshotRole::SubjectHead),
            resolutions: self.resolutions.clone(),
        }
    }
}

/// Snapshot presence and revisions plus resolutions.
///
/// Two contexts with equal fingerprints produce the same divergences, so a
/// cache may skip recomputing the second.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextFingerprint {
    upstream_at_fork: Option<Option<String>>,
    upstream_head: Option<Option<String>>,
    subject_head: Option<Option<String>>,
    resolutions: Vec<Resolution>,
}
