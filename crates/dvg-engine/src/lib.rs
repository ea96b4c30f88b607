//! Divergence engine.
//!
//! Compares three snapshots of a document (the upstream at the fork point,
//! the upstream head and the subject head) and reports every upstream change
//! the subject has not absorbed, honouring resolutions the user recorded
//! earlier.
//!
//! # Quick Start
//!
//! ```rust
//! use dvg_engine::DivergenceEngine;
//! use dvg_types::{Document, FindDivergencesContext};
//! use serde_json::json;
//!
//! let fork = Document::from_value(json!({"_id": "a", "_rev": "r1", "x": 1})).unwrap();
//! let head = Document::from_value(json!({"_id": "a", "_rev": "r2", "x": 2})).unwrap();
//! let subject = Document::from_value(json!({"_id": "drafts.a", "_rev": "r3", "x": 1})).unwrap();
//!
//! let engine = DivergenceEngine::default();
//! let report = engine.find_divergences(&FindDivergencesContext::new(fork, head, subject));
//! assert_eq!(report.len(), 1);
//! assert!(report.get("x").is_some());
//! ```

pub mod coalesce;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod scheduler;
pub mod state;
pub mod telemetry;

pub use compare::Strategy;
pub use config::EngineConfig;
pub use engine::DivergenceEngine;
pub use error::{DivergenceError, EngineResult};
pub use report::{DivergenceReport, PathFault};
pub use scheduler::{ImmediateScheduler, Scheduler, TokioScheduler};
pub use telemetry::{NoopTelemetry, Phase, PhaseTiming, Telemetry, TracingTelemetry};
