use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use dvg_diff::{ArrayIds, MoveDetector, MoveStats};
use dvg_types::{
    Divergence, Document, FindDivergencesContext, FlatPath, ResolutionMarker, SnapshotRole,
    Snapshots,
};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::coalesce::coalesce_object_types;
use crate::compare::Comparison;
use crate::config::EngineConfig;
use crate::report::{DivergenceReport, PathFault};
use crate::scheduler::Scheduler;
use crate::state::{index_resolutions, record_snapshot, PathTable, FLATTEN_ORDER};
use crate::telemetry::{Phase, PhaseTiming, Telemetry, TracingTelemetry};

// ---------------------------------------------------------------------------
// DivergenceEngine
// ---------------------------------------------------------------------------

/// Finds the upstream changes a subject document has not absorbed.
///
/// The engine owns the array-id allocator and the move memo, so a single
/// engine should be shared by every computation in a session. All methods
/// take `&self`.
pub struct DivergenceEngine {
    config: EngineConfig,
    ids: ArrayIds,
    moves: MoveDetector,
    telemetry: Arc<dyn Telemetry>,
}

impl DivergenceEngine {
    pub fn new(config: EngineConfig) -> Self {
        let moves = MoveDetector::new(config.move_memo_capacity);
        Self {
            config,
            ids: ArrayIds::new(),
            moves,
            telemetry: Arc::new(TracingTelemetry),
        }
    }

    /// Replace the phase-timing sink.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn move_stats(&self) -> MoveStats {
        self.moves.stats()
    }

    /// Compute divergences synchronously, without yielding.
    ///
    /// A context missing any of its three snapshots yields an empty report.
    pub fn find_divergences(&self, ctx: &FindDivergencesContext) -> DivergenceReport {
        let Some(run) = Run::start(self, ctx) else {
            return DivergenceReport::empty();
        };

        let started = Instant::now();
        let mut table = PathTable::new();
        for role in FLATTEN_ORDER {
            record_snapshot(&mut table, role, run.document(role), &self.ids);
        }
        run.phase_done(Phase::Flatten, started);

        let started = Instant::now();
        let mut batch = Batch::default();
        for (path, snapshots) in &table {
            run.compare(path, snapshots, &mut batch);
        }
        run.phase_done(Phase::Compare, started);

        run.finish(table.len(), batch)
    }

    /// Compute divergences, yielding to `scheduler` between snapshots and
    /// every [`EngineConfig::paths_per_yield`] paths.
    pub async fn find_divergences_with(
        &self,
        ctx: &FindDivergencesContext,
        scheduler: &dyn Scheduler,
    ) -> DivergenceReport {
        let Some(run) = Run::start(self, ctx) else {
            return DivergenceReport::empty();
        };
        let chunk = self.config.paths_per_yield.max(1);

        let started = Instant::now();
        let mut table = PathTable::new();
        for role in FLATTEN_ORDER {
            record_snapshot(&mut table, role, run.document(role), &self.ids);
            scheduler.yield_now().await;
        }
        run.phase_done(Phase::Flatten, started);

        let started = Instant::now();
        let mut batch = Batch::default();
        for (i, (path, snapshots)) in table.iter().enumerate() {
            if i > 0 && i % chunk == 0 {
                scheduler.yield_now().await;
            }
            run.compare(path, snapshots, &mut batch);
        }
        run.phase_done(Phase::Compare, started);
        scheduler.yield_now().await;

        run.finish(table.len(), batch)
    }
}

impl Default for DivergenceEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Batch {
    found: Vec<(FlatPath, Divergence)>,
    faults: Vec<PathFault>,
}

/// One computation over a complete context.
struct Run<'a> {
    engine: &'a DivergenceEngine,
    comparison: Comparison<'a>,
    markers: HashMap<&'a str, &'a ResolutionMarker>,
    label: String,
}

impl<'a> Run<'a> {
    fn start(engine: &'a DivergenceEngine, ctx: &'a FindDivergencesContext) -> Option<Self> {
        let (Some(upstream_at_fork), Some(upstream_head), Some(subject_head)) = (
            ctx.upstream_at_fork.as_ref(),
            ctx.upstream_head.as_ref(),
            ctx.subject_head.as_ref(),
        ) else {
            debug!("snapshot missing, no divergences");
            return None;
        };
        let label = [subject_head.id(), upstream_head.id(), upstream_at_fork.id()].join(".");
        Some(Self {
            engine,
            comparison: Comparison {
                upstream_at_fork,
                upstream_head,
                subject_head,
                moves: &engine.moves,
            },
            markers: index_resolutions(&ctx.resolutions),
            label,
        })
    }

    fn document(&self, role: SnapshotRole) -> &'a Document {
        match role {
            SnapshotRole::UpstreamAtFork => self.comparison.upstream_at_fork,
            SnapshotRole::UpstreamHead => self.comparison.upstream_head,
            SnapshotRole::SubjectHead => self.comparison.subject_head,
        }
    }

    fn compare(&self, path: &FlatPath, snapshots: &Snapshots, batch: &mut Batch) {
        let marker = self.markers.get(path.to_string().as_str()).copied();
        match self.comparison.evaluate(path, snapshots, marker) {
            Ok(Some(divergence)) => batch.found.push((path.clone(), divergence)),
            Ok(None) => {}
            Err(error) => {
                warn!(path = %path, error = %error, "path evaluation faulted");
                batch.faults.push(PathFault {
                    path: path.to_string(),
                    error,
                });
            }
        }
    }

    fn finish(&self, paths: usize, batch: Batch) -> DivergenceReport {
        let started = Instant::now();
        let found = batch.found.len();
        let coalesced = coalesce_object_types(batch.found);
        self.phase_done(Phase::Coalesce, started);

        let mut divergences = IndexMap::with_capacity(coalesced.len());
        for (path, divergence) in coalesced {
            divergences.insert(path.to_string(), divergence);
        }
        debug!(
            label = %self.label,
            paths,
            found,
            emitted = divergences.len(),
            faults = batch.faults.len(),
            "divergences computed"
        );
        DivergenceReport::new(divergences, batch.faults)
    }

    fn phase_done(&self, phase: Phase, started: Instant) {
        self.engine.telemetry.record(&PhaseTiming {
            phase,
            label: self.label.clone(),
            elapsed: started.elapsed(),
        });
    }
}
