//! Caller-facing ends of a cache entry.

use std::sync::Arc;

use dvg_engine::DivergenceReport;
use dvg_types::FindDivergencesContext;
use tokio::sync::watch;

use crate::error::{CacheError, CacheResult};

/// What an entry has published so far.
#[derive(Clone, Debug, Default)]
pub enum DivergenceState {
    /// No computation has completed yet.
    #[default]
    Pending,
    /// The most recently completed report.
    Ready(Arc<DivergenceReport>),
}

impl DivergenceState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn report(&self) -> Option<&Arc<DivergenceReport>> {
        match self {
            Self::Ready(report) => Some(report),
            Self::Pending => None,
        }
    }
}

/// Observes an entry's results. Every stream sees the latest published
/// state immediately, however late it subscribed.
#[derive(Clone, Debug)]
pub struct ResultStream {
    rx: watch::Receiver<DivergenceState>,
}

impl ResultStream {
    pub(crate) fn new(rx: watch::Receiver<DivergenceState>) -> Self {
        Self { rx }
    }

    /// The current state, without waiting.
    pub fn latest(&self) -> DivergenceState {
        self.rx.borrow().clone()
    }

    /// Wait for the next publication after the last one this stream saw.
    pub async fn changed(&mut self) -> CacheResult<DivergenceState> {
        self.rx.changed().await.map_err(|_| CacheError::Closed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait until a report is available and return it. Returns the current
    /// report at once when one has already been published.
    pub async fn ready(&mut self) -> CacheResult<Arc<DivergenceReport>> {
        let state = self
            .rx
            .wait_for(DivergenceState::is_ready)
            .await
            .map_err(|_| CacheError::Closed)?;
        match &*state {
            DivergenceState::Ready(report) => Ok(Arc::clone(report)),
            DivergenceState::Pending => Err(CacheError::Closed),
        }
    }
}

/// Feeds contexts to an entry's worker. Only the newest unprocessed context
/// is kept.
#[derive(Clone, Debug)]
pub struct ContextSink {
    tx: Arc<watch::Sender<Option<Arc<FindDivergencesContext>>>>,
}

impl ContextSink {
    pub(crate) fn new(tx: watch::Sender<Option<Arc<FindDivergencesContext>>>) -> Self {
        Self { tx: Arc::new(tx) }
    }

    /// Hand a new context to the worker, superseding any computation in
    /// flight for this entry.
    pub fn send(&self, ctx: FindDivergencesContext) -> CacheResult<()> {
        self.tx
            .send(Some(Arc::new(ctx)))
            .map_err(|_| CacheError::Closed)
    }

    /// Whether the entry's worker is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
