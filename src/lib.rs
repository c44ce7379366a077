//! Tyre degradation fitting and pit-stop strategy search.
//!
//! Lap records flow upward through the engine:
//! [`data::LapFilter`] cleans one driver's laps on one compound,
//! [`model::DegradationModel`] fits and averages a degradation rate per
//! compound, and [`strategy::StrategySimulator`] predicts stint and race
//! times and searches one-stop and two-stop pit-lap placements.

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod report;
pub mod strategy;
pub mod telemetry;

use config::AnalysisConfig;
use data::{average_stint_lengths, observed_stints, Compound, LapTable};
use model::{DegradationModel, DegradationTable};
use std::collections::BTreeMap;
use strategy::{SearchOutcome, StrategySimulator};

/// Result of one analysis run. Built fresh per run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub model: DegradationModel,
    pub average_stint_lengths: BTreeMap<Compound, f64>,
    pub outcome: SearchOutcome,
}

/// Fits degradation from `laps` and searches strategies over it.
/// Thin data never fails the run; an empty `outcome` signals that no
/// strategy was viable.
pub fn analyze(laps: &LapTable, config: &AnalysisConfig) -> Analysis {
    let model = DegradationModel::new(laps, &config.fit_settings());
    let outcome = search(&model.table, config);
    Analysis {
        model,
        average_stint_lengths: average_stint_lengths(&observed_stints(laps)),
        outcome,
    }
}

/// Searches strategies over an already known degradation table.
pub fn search(table: &DegradationTable, config: &AnalysisConfig) -> SearchOutcome {
    StrategySimulator::new(table, config.race).search(config.total_laps, &config.search)
}
