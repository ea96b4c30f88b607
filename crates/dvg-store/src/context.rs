use dvg_types::{FindDivergencesContext, Resolution};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreResult;
use crate::traits::SnapshotSource;

/// Where a subject forked from its upstream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkRef {
    /// Id of the upstream document.
    pub upstream_id: String,
    /// Upstream revision the subject was created from.
    pub fork_revision: String,
    /// Id of the subject document.
    pub subject_id: String,
}

impl ForkRef {
    pub fn new(
        upstream_id: impl Into<String>,
        fork_revision: impl Into<String>,
        subject_id: impl Into<String>,
    ) -> Self {
        Self {
            upstream_id: upstream_id.into(),
            fork_revision: fork_revision.into(),
            subject_id: subject_id.into(),
        }
    }
}

/// Fetch the three snapshots of `fork` and bundle them with `resolutions`.
///
/// Snapshots the source does not have are left absent; the engine treats an
/// incomplete context as having no divergences.
pub async fn load_context(
    source: &dyn SnapshotSource,
    fork: &ForkRef,
    resolutions: Vec<Resolution>,
) -> StoreResult<FindDivergencesContext> {
    let upstream_at_fork = source
        .fetch(&fork.upstream_id, Some(&fork.fork_revision))
        .await?;
    let upstream_head = source.fetch(&fork.upstream_id, None).await?;
    let subject_head = source.fetch(&fork.subject_id, None).await?;

    debug!(
        upstream = %fork.upstream_id,
        fork_revision = %fork.fork_revision,
        subject = %fork.subject_id,
        fork_found = upstream_at_fork.is_some(),
        upstream_found = upstream_head.is_some(),
        subject_found = subject_head.is_some(),
        "context loaded"
    );

    Ok(FindDivergencesContext {
        upstream_at_fork,
        upstream_head,
        subject_head,
        resolutions,
    })
}
