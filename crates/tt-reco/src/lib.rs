//! # tt-reco
//!
//! Kinematic reconstruction of semileptonic top-quark pairs.
//!
//! Given one selected charged lepton, a pt-sorted jet collection with
//! b-tagging decisions, and the measured missing transverse momentum,
//! this crate recovers the unobserved neutrino momentum under top and W
//! mass constraints and picks the jet-to-quark assignment most consistent
//! with the expected decay `tt -> (b l nu)(b q q)`.
//!
//! ## Architecture
//!
//! Event processing is an ordered chain of [`pipeline::Stage`]s sharing a
//! per-event [`pipeline::EventContext`]; a rejecting stage short-circuits
//! the rest of the chain for that event. The numerically heavy pieces are
//! the [`NeutrinoSolver`] and the [`HypothesisRanker`] built on top of it;
//! the calibration and performance stages reuse the solver but not the
//! ranker.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Calibration pass producing the likelihood density tables.
pub mod calibration;
/// Run configuration with serde defaults.
pub mod config;
/// Likelihood density tables and log-density lookups.
pub mod likelihood;
/// Neutrino momentum reconstruction under mass constraints.
pub mod nu;
/// Performance probe: mass bias and jet-assignment efficiency.
pub mod perf;
/// Stage trait, per-event context, and the pipeline runner.
pub mod pipeline;
/// Combinatorial jet-assignment ranking.
pub mod ranker;
/// Single-lepton plus jets event selection.
pub mod selection;
/// Generator-record classification and jet-to-quark matching.
pub mod truth;

pub use calibration::{CalibrationCounts, CalibrationFiller};
pub use config::{RecoConfig, DEFAULT_MASS_TOP, DEFAULT_MASS_W};
pub use likelihood::{LikelihoodTables, NuLookup, MASSES_HAD_TABLE, NU_DIST_TABLE};
pub use nu::{NeutrinoSolution, NeutrinoSolver};
pub use perf::PerformanceProbe;
pub use pipeline::{EventContext, Pipeline, RunSummary, Stage, StageVerdict};
pub use ranker::{DecayJet, Hypothesis, HypothesisRanker, RecoRecord, RecoResult, RecoStatus};
pub use selection::LeptonJetsSelection;
pub use truth::{classify_semileptonic, match_decay_jets, match_jet, MatchedJets, SemileptonicDecay};
