use crate::data::{CleanLap, Compound, LapFilter, LapRecord, LapTable};
use crate::error::DegradationError;
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const DEFAULT_FUEL_EFFECT_PER_LAP: f64 = 0.04;

/// Knobs for turning raw laps into degradation rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    pub min_laps: usize,
    pub outlier_ratio: f64,
    /// Seconds of lap time gained per lap from fuel burn-off.
    pub fuel_effect_per_lap: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        let filter = LapFilter::default();
        Self {
            min_laps: filter.min_laps,
            outlier_ratio: filter.outlier_ratio,
            fuel_effect_per_lap: DEFAULT_FUEL_EFFECT_PER_LAP,
        }
    }
}

impl FitSettings {
    pub fn lap_filter(&self) -> LapFilter {
        LapFilter { min_laps: self.min_laps, outlier_ratio: self.outlier_ratio }
    }
}

/// First-degree fit of fuel-corrected lap time against tyre age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    /// Degradation rate in seconds per lap of tyre age.
    pub slope: f64,
    pub intercept: f64,
    pub laps_used: usize,
    /// Mean absolute residual of the fitted line, seconds.
    pub mean_abs_error: f64,
}

impl LinearFit {
    pub fn predict(&self, tyre_life: u32) -> f64 {
        self.intercept + self.slope * tyre_life as f64
    }
}

/// Fits the degradation line to an already filtered lap subset.
pub fn fit_degradation(laps: &[CleanLap], fuel_effect_per_lap: f64) -> Result<LinearFit, DegradationError> {
    let Some(first) = laps.first() else {
        return Err(DegradationError::InsufficientData { found: 0, required: 2 });
    };
    if laps.iter().all(|l| l.tyre_life == first.tyre_life) {
        return Err(DegradationError::DegenerateFit { tyre_life: first.tyre_life });
    }

    let ages: Vec<f64> = laps.iter().map(|l| l.tyre_life as f64).collect();
    // add back the time the car gained from burning fuel
    let corrected: Vec<f64> = laps
        .iter()
        .map(|l| l.lap_time_seconds + l.lap_number as f64 * fuel_effect_per_lap)
        .collect();

    let x = Array2::from_shape_vec((laps.len(), 1), ages.clone())
        .map_err(|e| DegradationError::Regression(e.to_string()))?;
    let y = Array1::from_vec(corrected.clone());
    let ds = Dataset::new(x, y);

    let model = LinearRegression::new()
        .fit(&ds)
        .map_err(|e| DegradationError::Regression(e.to_string()))?;

    let slope = model.params()[0];
    let intercept = model.intercept();
    let mean_abs_error = ages
        .iter()
        .zip(&corrected)
        .map(|(age, t)| (t - (intercept + slope * age)).abs())
        .sum::<f64>()
        / laps.len() as f64;

    Ok(LinearFit { slope, intercept, laps_used: laps.len(), mean_abs_error })
}

/// Filters one driver's laps on one compound and fits the degradation line.
pub fn fit_driver_compound(
    laps: &[LapRecord],
    driver: &str,
    compound: Compound,
    settings: &FitSettings,
) -> Result<LinearFit, DegradationError> {
    let clean = settings.lap_filter().apply(laps, driver, compound)?;
    fit_degradation(&clean, settings.fuel_effect_per_lap)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegradationEntry {
    pub rate: f64,
    /// Number of (driver, compound) fits averaged into `rate`.
    pub fits: usize,
}

/// Canonical degradation rate per compound. At most one entry per compound;
/// a compound with no entry cannot be used in a strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DegradationTable {
    entries: BTreeMap<Compound, DegradationEntry>,
}

impl DegradationTable {
    /// Builds a fixed table from known rates. Later duplicates replace earlier ones.
    pub fn from_rates<I>(rates: I) -> Self
    where
        I: IntoIterator<Item = (Compound, f64)>,
    {
        let entries = rates
            .into_iter()
            .map(|(compound, rate)| (compound, DegradationEntry { rate, fits: 0 }))
            .collect();
        Self { entries }
    }

    /// Arithmetic mean of the rates per compound, in the order given.
    pub fn from_fits(fits: &[DriverFit]) -> Self {
        let mut grouped: BTreeMap<Compound, Vec<f64>> = BTreeMap::new();
        for f in fits {
            grouped.entry(f.compound).or_default().push(f.fit.slope);
        }
        let entries = grouped
            .into_iter()
            .map(|(compound, rates)| {
                let rate = rates.iter().sum::<f64>() / rates.len() as f64;
                (compound, DegradationEntry { rate, fits: rates.len() })
            })
            .collect();
        Self { entries }
    }

    pub fn rate(&self, compound: Compound) -> Option<f64> {
        self.entries.get(&compound).map(|e| e.rate)
    }

    pub fn get(&self, compound: Compound) -> Option<&DegradationEntry> {
        self.entries.get(&compound)
    }

    pub fn contains(&self, compound: Compound) -> bool {
        self.entries.contains_key(&compound)
    }

    pub fn compounds(&self) -> Vec<Compound> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Compound, &DegradationEntry)> {
        self.entries.iter().map(|(c, e)| (*c, e))
    }

    /// Entries ordered from least to most degradation.
    pub fn sorted_by_rate(&self) -> Vec<(Compound, DegradationEntry)> {
        let mut rows: Vec<(Compound, DegradationEntry)> = self.iter().map(|(c, e)| (c, *e)).collect();
        rows.sort_by(|a, b| a.1.rate.total_cmp(&b.1.rate));
        rows
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverFit {
    pub driver: String,
    pub compound: Compound,
    pub fit: LinearFit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFit {
    pub driver: String,
    pub compound: Compound,
    pub reason: String,
}

/// Per-driver fits for a session and the table aggregated from them.
#[derive(Debug, Clone, Default)]
pub struct DegradationModel {
    pub fits: Vec<DriverFit>,
    pub skipped: Vec<SkippedFit>,
    pub table: DegradationTable,
}

impl DegradationModel {
    pub fn new(laps: &LapTable, settings: &FitSettings) -> Self {
        let mut fits = Vec::new();
        let mut skipped = Vec::new();

        for driver in laps.drivers() {
            for compound in laps.compounds() {
                match fit_driver_compound(laps.laps(), &driver, compound, settings) {
                    Ok(fit) => {
                        debug!(%driver, %compound, rate = fit.slope, laps = fit.laps_used, "fitted degradation");
                        fits.push(DriverFit { driver: driver.clone(), compound, fit });
                    }
                    Err(e) => {
                        debug!(%driver, %compound, reason = %e, "no degradation rate");
                        skipped.push(SkippedFit { driver: driver.clone(), compound, reason: e.to_string() });
                    }
                }
            }
        }

        let table = DegradationTable::from_fits(&fits);
        for compound in laps.compounds() {
            if !table.contains(compound) {
                warn!(%compound, "no driver had enough clean laps; compound excluded");
            }
        }
        info!(fits = fits.len(), compounds = table.len(), "built degradation table");

        Self { fits, skipped, table }
    }
}

/// Fits each selected driver on one compound, keeping failures alongside
/// successes. Intended for exploratory comparison with a loosened `min_laps`.
pub fn compare_drivers(
    laps: &LapTable,
    drivers: &[String],
    compound: Compound,
    settings: &FitSettings,
) -> Vec<(String, Result<LinearFit, DegradationError>)> {
    drivers
        .iter()
        .map(|d| (d.clone(), fit_driver_compound(laps.laps(), d, compound, settings)))
        .collect()
}
