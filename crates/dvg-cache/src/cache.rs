use std::sync::{Arc, RwLock};
use std::time::Duration;

use dvg_engine::{DivergenceEngine, EngineConfig, Scheduler, Telemetry, TokioScheduler};
use dvg_types::{ContextFingerprint, FindDivergencesContext};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::lru::LruStore;
use crate::stream::{ContextSink, DivergenceState, ResultStream};

/// `(upstream document id, subject document id)`. Order matters.
pub type CacheKey = (String, String);

/// Both ends of a cache entry.
#[derive(Clone, Debug)]
pub struct DivergenceHandle {
    pub results: ResultStream,
    pub sink: ContextSink,
}

/// A live entry. Dropping it stops the worker.
struct Entry {
    results: watch::Receiver<DivergenceState>,
    sink: ContextSink,
    worker: JoinHandle<()>,
}

impl Entry {
    fn handle(&self) -> DivergenceHandle {
        DivergenceHandle {
            results: ResultStream::new(self.results.clone()),
            sink: self.sink.clone(),
        }
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

// ---------------------------------------------------------------------------
// DivergenceCache
// ---------------------------------------------------------------------------

/// Bounded store of live divergence computations.
///
/// Create one per application and share it by cloning; clones see the same
/// entries. Evicted or invalidated entries stop their workers, and streams
/// still observing them report [`CacheError::Closed`].
#[derive(Clone)]
pub struct DivergenceCache {
    config: CacheConfig,
    engine: Arc<DivergenceEngine>,
    scheduler: Arc<dyn Scheduler>,
    entries: Arc<RwLock<LruStore<CacheKey, Entry>>>,
}

impl DivergenceCache {
    pub fn new(config: CacheConfig, engine_config: EngineConfig) -> Self {
        let entries = LruStore::new(config.capacity);
        Self {
            config,
            engine: Arc::new(DivergenceEngine::new(engine_config)),
            scheduler: Arc::new(TokioScheduler),
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Replace the scheduler workers yield to. Affects entries created
    /// afterwards.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Replace the engine's phase-timing sink. Affects entries created
    /// afterwards.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        let engine = DivergenceEngine::new(self.engine.config().clone()).with_telemetry(telemetry);
        self.engine = Arc::new(engine);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The entry for `(upstream_id, subject_id)`, created and started if
    /// absent. Must be called from within a tokio runtime.
    pub fn get_or_create(
        &self,
        upstream_id: &str,
        subject_id: &str,
    ) -> CacheResult<DivergenceHandle> {
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
        let key = key(upstream_id, subject_id);

        let mut entries = self.entries.write().expect("cache lock poisoned");
        if let Some(entry) = entries.get(&key) {
            return Ok(entry.handle());
        }

        let (context_tx, context_rx) = watch::channel(None);
        let (result_tx, result_rx) = watch::channel(DivergenceState::Pending);
        let worker = Worker {
            engine: Arc::clone(&self.engine),
            scheduler: Arc::clone(&self.scheduler),
            debounce: self.config.debounce,
            contexts: context_rx,
            results: result_tx,
            label: format!("{upstream_id}/{subject_id}"),
        };
        let entry = Entry {
            results: result_rx,
            sink: ContextSink::new(context_tx),
            worker: runtime.spawn(worker.run()),
        };
        let handle = entry.handle();

        debug!(upstream = upstream_id, subject = subject_id, "divergence entry created");
        if let Some(((upstream, subject), _evicted)) = entries.insert(key, entry) {
            debug!(upstream = %upstream, subject = %subject, "divergence entry evicted");
        }
        Ok(handle)
    }

    /// Observe an existing entry without creating or starting one.
    pub fn peek(&self, upstream_id: &str, subject_id: &str) -> Option<ResultStream> {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries
            .get(&key(upstream_id, subject_id))
            .map(|entry| ResultStream::new(entry.results.clone()))
    }

    /// Drop an entry and stop its worker. Returns whether it existed.
    pub fn invalidate(&self, upstream_id: &str, subject_id: &str) -> bool {
        let removed = self
            .entries
            .write()
            .expect("cache lock poisoned")
            .remove(&key(upstream_id, subject_id));
        if removed.is_some() {
            debug!(upstream = upstream_id, subject = subject_id, "divergence entry invalidated");
        }
        removed.is_some()
    }

    pub fn clear(&self) {
        self.entries.write().expect("cache lock poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn key(upstream_id: &str, subject_id: &str) -> CacheKey {
    (upstream_id.to_string(), subject_id.to_string())
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Background task behind one entry.
struct Worker {
    engine: Arc<DivergenceEngine>,
    scheduler: Arc<dyn Scheduler>,
    debounce: Duration,
    contexts: watch::Receiver<Option<Arc<FindDivergencesContext>>>,
    results: watch::Sender<DivergenceState>,
    label: String,
}

impl Worker {
    async fn run(mut self) {
        let mut last: Option<ContextFingerprint> = None;
        // a write arrived while computing and has not been waited for
        let mut pending = false;

        loop {
            if !pending && self.contexts.changed().await.is_err() {
                return;
            }
            pending = false;

            if !self.settle().await {
                return;
            }

            let Some(ctx) = self.contexts.borrow_and_update().clone() else {
                continue;
            };
            let fingerprint = ctx.fingerprint();
            if last.as_ref() == Some(&fingerprint) {
                debug!(entry = %self.label, "context unchanged, skipping");
                continue;
            }

            let engine = Arc::clone(&self.engine);
            let scheduler = Arc::clone(&self.scheduler);
            tokio::select! {
                report = engine.find_divergences_with(&ctx, scheduler.as_ref()) => {
                    debug!(
                        entry = %self.label,
                        divergences = report.len(),
                        faults = report.faults().len(),
                        "divergence computation complete"
                    );
                    last = Some(fingerprint);
                    self.results.send_replace(DivergenceState::Ready(Arc::new(report)));
                }
                changed = self.contexts.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    debug!(entry = %self.label, "computation superseded");
                    pending = true;
                }
            }
        }
    }

    /// Wait until no context has been written for the debounce period.
    /// Returns `false` once the sink is gone.
    async fn settle(&mut self) -> bool {
        loop {
            tokio::select! {
                changed = self.contexts.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
                _ = tokio::time::sleep(self.debounce) => return true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use dvg_engine::{Phase, PhaseTiming};
    use dvg_types::{Document, Resolution, ResolutionMarker, Signature};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    /// Upstream moved `x` from 1 to `x` at revision `rev`; the subject
    /// still holds 1.
    fn context(rev: &str, x: i64) -> FindDivergencesContext {
        FindDivergencesContext::new(
            doc(json!({"_id": "a", "_rev": "r1", "x": 1, "y": 1})),
            doc(json!({"_id": "a", "_rev": rev, "x": x, "y": 1})),
            doc(json!({"_id": "drafts.a", "_rev": "s1", "x": 1, "y": 1})),
        )
    }

    #[derive(Default)]
    struct Phases(Mutex<Vec<Phase>>);

    impl Phases {
        fn count(&self, phase: Phase) -> usize {
            self.0.lock().unwrap().iter().filter(|p| **p == phase).count()
        }
    }

    impl Telemetry for Phases {
        fn record(&self, timing: &PhaseTiming) {
            self.0.lock().unwrap().push(timing.phase);
        }
    }

    fn cache_with(phases: &Arc<Phases>, config: CacheConfig) -> DivergenceCache {
        DivergenceCache::new(config, EngineConfig::default()).with_telemetry(phases.clone())
    }

    /// Yields by sleeping, so a computation stays in flight for a while.
    struct SlowScheduler(Duration);

    #[async_trait]
    impl Scheduler for SlowScheduler {
        async fn yield_now(&self) {
            tokio::time::sleep(self.0).await;
        }
    }

    #[test]
    fn get_or_create_requires_a_runtime() {
        let cache = DivergenceCache::new(CacheConfig::default(), EngineConfig::default());
        assert_eq!(cache.get_or_create("a", "b").unwrap_err(), CacheError::NoRuntime);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn first_context_is_computed_after_the_debounce() {
        let phases = Arc::new(Phases::default());
        let cache = cache_with(&phases, CacheConfig::default());
        let mut handle = cache.get_or_create("a", "drafts.a").unwrap();
        assert!(!handle.results.latest().is_ready());

        let started = tokio::time::Instant::now();
        handle.sink.send(context("r2", 2)).unwrap();
        let report = handle.results.ready().await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(report.len(), 1);
        assert!(report.get("x").is_some());
        assert_eq!(phases.count(Phase::Compare), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_writes_are_computed_once() {
        let phases = Arc::new(Phases::default());
        let cache = cache_with(&phases, CacheConfig::default());
        let mut handle = cache.get_or_create("a", "drafts.a").unwrap();

        handle.sink.send(context("r2", 2)).unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
        handle.sink.send(context("r3", 3)).unwrap();

        let report = handle.results.ready().await.unwrap();
        let x = report.get("x").unwrap();
        assert_eq!(x.snapshots.upstream_head.as_ref().unwrap().value, json!(3));
        assert_eq!(phases.count(Phase::Compare), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn equivalent_context_is_not_recomputed() {
        let phases = Arc::new(Phases::default());
        let cache = cache_with(&phases, CacheConfig::default());
        let mut handle = cache.get_or_create("a", "drafts.a").unwrap();

        handle.sink.send(context("r2", 2)).unwrap();
        let first = handle.results.ready().await.unwrap();

        handle.sink.send(context("r2", 2)).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(phases.count(Phase::Compare), 1);
        let latest = handle.results.latest();
        assert!(Arc::ptr_eq(latest.report().unwrap(), &first));
    }

    #[tokio::test(start_paused = true)]
    async fn new_resolutions_trigger_recomputation() {
        let phases = Arc::new(Phases::default());
        let cache = cache_with(&phases, CacheConfig::default());
        let mut handle = cache.get_or_create("a", "drafts.a").unwrap();

        handle.sink.send(context("r2", 2)).unwrap();
        handle.results.ready().await.unwrap();

        let marker = ResolutionMarker::new("r2", Signature::Hash("00".repeat(20)));
        handle
            .sink
            .send(context("r2", 2).with_resolutions(vec![Resolution::new("x", marker)]))
            .unwrap();
        let state = handle.results.changed().await.unwrap();

        let report = state.report().unwrap();
        assert!(report.get("x").unwrap().is_resolved());
        assert_eq!(phases.count(Phase::Compare), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_context_supersedes_a_running_computation() {
        let phases = Arc::new(Phases::default());
        let cache = cache_with(&phases, CacheConfig::default())
            .with_scheduler(Arc::new(SlowScheduler(Duration::from_secs(10))));
        let mut handle = cache.get_or_create("a", "drafts.a").unwrap();

        handle.sink.send(context("r2", 2)).unwrap();
        // past the debounce, inside the first computation's yields
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!handle.results.latest().is_ready());
        handle.sink.send(context("r3", 3)).unwrap();

        let report = handle.results.ready().await.unwrap();
        let x = report.get("x").unwrap();
        assert_eq!(x.snapshots.upstream_head.as_ref().unwrap().value, json!(3));
        assert_eq!(phases.count(Phase::Flatten), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_subscribers_see_the_latest_report() {
        let cache = DivergenceCache::new(CacheConfig::default(), EngineConfig::default());
        let mut handle = cache.get_or_create("a", "drafts.a").unwrap();
        handle.sink.send(context("r2", 2)).unwrap();
        let report = handle.results.ready().await.unwrap();

        let again = cache.get_or_create("a", "drafts.a").unwrap();
        let latest = again.results.latest();
        assert!(Arc::ptr_eq(latest.report().unwrap(), &report));

        let peeked = cache.peek("a", "drafts.a").unwrap();
        assert!(peeked.latest().is_ready());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_order_sensitive() {
        let cache = DivergenceCache::new(CacheConfig::default(), EngineConfig::default());
        cache.get_or_create("a", "b").unwrap();
        assert!(cache.peek("b", "a").is_none());
        cache.get_or_create("b", "a").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn peek_never_creates() {
        let cache = DivergenceCache::new(CacheConfig::default(), EngineConfig::default());
        assert!(cache.peek("a", "drafts.a").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn least_recently_used_entry_is_evicted() {
        let config = CacheConfig {
            capacity: 2,
            ..Default::default()
        };
        let cache = DivergenceCache::new(config, EngineConfig::default());
        cache.get_or_create("a", "1").unwrap();
        cache.get_or_create("b", "1").unwrap();
        assert!(cache.peek("a", "1").is_some());
        cache.get_or_create("c", "1").unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.peek("b", "1").is_none());
        assert!(cache.peek("a", "1").is_some());
        assert!(cache.peek("c", "1").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidated_entry_closes_its_streams() {
        let cache = DivergenceCache::new(CacheConfig::default(), EngineConfig::default());
        let mut handle = cache.get_or_create("a", "drafts.a").unwrap();

        assert!(cache.invalidate("a", "drafts.a"));
        assert!(!cache.invalidate("a", "drafts.a"));
        assert_eq!(handle.results.changed().await.unwrap_err(), CacheError::Closed);
        assert!(handle.sink.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_entries() {
        let cache = DivergenceCache::new(CacheConfig::default(), EngineConfig::default());
        let other = cache.clone();
        cache.get_or_create("a", "drafts.a").unwrap();
        assert_eq!(other.len(), 1);
        other.clear();
        assert!(cache.is_empty());
    }
}
