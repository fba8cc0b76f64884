//! Nextmove - on-device adaptive activity prediction
//!
//! Nextmove predicts a user's likely next activity from daily behavioral
//! and environmental signals through an adaptive multi-model ensemble:
//! three independently trained pattern models, two heuristic collaborator
//! scorers, a weighted merge, and a fingerprint-keyed prediction cache. An
//! accuracy tracker consumes validated predictions and feeds reinforcement
//! or adjustment signals back into the models, closing the loop.
//!
//! ## Modules
//!
//! - **Pattern models**: frequency tables plus weighted context channels,
//!   trained from daily records
//! - **Ensemble engine**: merged scoring, winner selection, caching
//! - **Accuracy tracker**: grouped accuracy aggregates, trends, and the
//!   feedback edge back into the models

pub mod cache;
pub mod channels;
pub mod context;
pub mod correlation;
pub mod ensemble;
pub mod error;
pub mod model;
pub mod quantize;
pub mod rules;
pub mod tracker;
pub mod types;

pub use cache::{Fingerprint, PredictionCache};
pub use context::{TimeOfDay, UserContext, WeatherContext};
pub use correlation::CorrelationScorer;
pub use ensemble::EnsembleEngine;
pub use error::PredictError;
pub use model::{ModelKind, PatternModel};
pub use rules::{ContextScorer, RuleScorer};
pub use tracker::{AccuracyStatistics, AccuracyTracker, AccuracyTrends};
pub use types::{ActivityType, DailyRecord, PredictionResult, Validation};

/// Nextmove version stamped into engine provenance
pub const NEXTMOVE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for provenance
pub const PRODUCER_NAME: &str = "nextmove";
