//! Analysis configuration.
//!
//! Every input of the engine lives here and is passed explicitly: race
//! parameters, lap filtering, search bounds and, optionally, a fixed
//! degradation table that replaces fitting from lap data. Values come from
//! `Default` (Bahrain 2023), an optional TOML file, then CLI overrides, and
//! are checked with [`AnalysisConfig::validate`] before use.

use crate::data::{Compound, LapFilter};
use crate::error::ConfigError;
use crate::model::{DegradationTable, FitSettings};
use crate::strategy::{PitWindow, RaceParams, SearchSpace};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub total_laps: u32,
    pub race: RaceParams,
    pub filter: LapFilter,
    pub search: SearchSpace,
    /// Fixed seconds-per-lap rates keyed by compound name.
    pub degradation: Option<BTreeMap<String, f64>>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            total_laps: 57,
            race: RaceParams::default(),
            filter: LapFilter::default(),
            search: SearchSpace::default(),
            degradation: None,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Fit settings sharing the race's fuel effect.
    pub fn fit_settings(&self) -> FitSettings {
        FitSettings {
            min_laps: self.filter.min_laps,
            outlier_ratio: self.filter.outlier_ratio,
            fuel_effect_per_lap: self.race.fuel_effect_per_lap,
        }
    }

    /// The configured fixed degradation table, if any.
    pub fn fixed_degradation(&self) -> Result<Option<DegradationTable>, ConfigError> {
        let Some(rates) = &self.degradation else {
            return Ok(None);
        };
        let mut parsed = Vec::with_capacity(rates.len());
        for (name, rate) in rates {
            let compound = name.parse::<Compound>().map_err(ConfigError::Parse)?;
            if !rate.is_finite() {
                return Err(ConfigError::InvalidValue { field: "degradation", value: *rate });
            }
            parsed.push((compound, *rate));
        }
        Ok(Some(DegradationTable::from_rates(parsed)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let total_laps = self.total_laps;
        check_window("one_stop", self.search.one_stop, total_laps)?;
        check_window("two_stop_first", self.search.two_stop_first, total_laps)?;

        let min_stint_length = self.search.min_stint_length;
        if min_stint_length == 0 {
            return Err(ConfigError::ZeroMinStint);
        }
        let start = self.search.two_stop_first.start;
        if u64::from(start) + 2 * u64::from(min_stint_length) > u64::from(total_laps) {
            return Err(ConfigError::InfeasibleTwoStop { start, min_stint_length, total_laps });
        }

        let distinct = self.search.distinct_compounds();
        if distinct.len() < 2 {
            return Err(ConfigError::TooFewCompounds(distinct.len()));
        }

        let RaceParams { base_lap_time, fuel_effect_per_lap, pit_stop_time_loss } = self.race;
        if !base_lap_time.is_finite() || base_lap_time <= 0.0 {
            return Err(ConfigError::InvalidValue { field: "base_lap_time", value: base_lap_time });
        }
        if !fuel_effect_per_lap.is_finite() || fuel_effect_per_lap < 0.0 {
            return Err(ConfigError::InvalidValue { field: "fuel_effect_per_lap", value: fuel_effect_per_lap });
        }
        if !pit_stop_time_loss.is_finite() || pit_stop_time_loss < 0.0 {
            return Err(ConfigError::InvalidValue { field: "pit_stop_time_loss", value: pit_stop_time_loss });
        }

        if self.filter.min_laps == 0 {
            return Err(ConfigError::ZeroMinLaps);
        }
        let ratio = self.filter.outlier_ratio;
        if !ratio.is_finite() || ratio <= 1.0 {
            return Err(ConfigError::InvalidValue { field: "outlier_ratio", value: ratio });
        }

        self.fixed_degradation()?;
        Ok(())
    }
}

fn check_window(name: &'static str, window: PitWindow, total_laps: u32) -> Result<(), ConfigError> {
    if window.start == 0 || window.start >= window.end || window.end >= total_laps {
        return Err(ConfigError::InvalidWindow { name, start: window.start, end: window.end, total_laps });
    }
    Ok(())
}
