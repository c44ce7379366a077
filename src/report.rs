use crate::data::Compound;
use crate::model::{DegradationEntry, DegradationTable, DriverFit};
use crate::strategy::{SearchOutcome, StrategyResult};
use crate::Analysis;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// Whole-second race time split into hours, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hms {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Hms {
    /// Rounds to the nearest second first; negative times clamp to zero.
    pub fn from_seconds(total: f64) -> Self {
        let total = total.round().max(0.0) as u64;
        Self { hours: total / 3600, minutes: (total % 3600) / 60, seconds: total % 60 }
    }

    pub fn total_seconds(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for Hms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradationRow {
    pub compound: Compound,
    #[serde(flatten)]
    pub entry: DegradationEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestStrategy {
    #[serde(flatten)]
    pub result: StrategyResult,
    pub total_minutes: f64,
    pub total_hms: String,
}

impl From<&StrategyResult> for BestStrategy {
    fn from(result: &StrategyResult) -> Self {
        Self {
            result: result.clone(),
            total_minutes: result.total_time / 60.0,
            total_hms: Hms::from_seconds(result.total_time).to_string(),
        }
    }
}

/// Everything an analysis run exposes to a display layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub total_laps: u32,
    pub degradation: Vec<DegradationRow>,
    pub driver_fits: Vec<DriverFit>,
    pub average_stint_lengths: BTreeMap<Compound, f64>,
    pub ranked: Vec<StrategyResult>,
    pub best: Option<BestStrategy>,
}

impl AnalysisReport {
    pub fn new(analysis: &Analysis, total_laps: u32) -> Self {
        Self {
            total_laps,
            degradation: degradation_rows(&analysis.model.table),
            driver_fits: analysis.model.fits.clone(),
            average_stint_lengths: analysis.average_stint_lengths.clone(),
            ranked: analysis.outcome.ranked.clone(),
            best: analysis.outcome.best.as_ref().map(BestStrategy::from),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&render_degradation(&self.degradation));
        if !self.average_stint_lengths.is_empty() {
            out.push_str("\nObserved average stint length:\n");
            for (compound, laps) in &self.average_stint_lengths {
                let _ = writeln!(out, "- {:12} : {:5.1} laps", compound, laps);
            }
        }
        out.push('\n');
        out.push_str(&render_outcome(&self.ranked, self.best.as_ref(), self.total_laps));
        out
    }
}

pub fn degradation_rows(table: &DegradationTable) -> Vec<DegradationRow> {
    table
        .sorted_by_rate()
        .into_iter()
        .map(|(compound, entry)| DegradationRow { compound, entry })
        .collect()
}

pub fn render_degradation(rows: &[DegradationRow]) -> String {
    let mut out = String::from("--- Tyre Degradation (s/lap of tyre age) ---\n");
    if rows.is_empty() {
        out.push_str("no compound had enough clean laps\n");
    }
    for row in rows {
        let _ = writeln!(out, "- {:12} : {:+.6} ({} fits)", row.compound, row.entry.rate, row.entry.fits);
    }
    out
}

pub fn render_driver_fits(fits: &[DriverFit]) -> String {
    let mut out = String::new();
    for f in fits {
        let _ = writeln!(
            out,
            "- {:5} {:12} : {:+.4} s/lap over {:2} laps (MAE {:.3}s)",
            f.driver, f.compound, f.fit.slope, f.fit.laps_used, f.fit.mean_abs_error
        );
    }
    out
}

fn render_outcome(ranked: &[StrategyResult], best: Option<&BestStrategy>, total_laps: u32) -> String {
    let mut out = format!("--- Strategies ({} laps) ---\n", total_laps);
    for r in ranked {
        let pit_2 = r.pit_lap_2.map_or_else(|| "-".to_string(), |l| l.to_string());
        let _ = writeln!(
            out,
            "- {:22} : {:9.3}s  pit {:>2} / {:>2}  ({})",
            r.label,
            r.total_time,
            r.pit_lap_1,
            pit_2,
            Hms::from_seconds(r.total_time)
        );
    }

    match best {
        Some(b) => {
            let laps: Vec<String> = b.result.pit_laps().iter().map(|l| l.to_string()).collect();
            let _ = writeln!(
                out,
                "\nOptimal strategy: {} pitting on lap(s) {}\nPredicted race time: {:.3}s = {:.2} min = {}",
                b.result.label,
                laps.join(", "),
                b.result.total_time,
                b.total_minutes,
                b.total_hms
            );
        }
        None => out.push_str("\nNo viable strategy found for this data.\n"),
    }
    out
}

/// Text summary of a bare search, used when no lap data was analysed.
pub fn render_search(outcome: &SearchOutcome, total_laps: u32) -> String {
    let best = outcome.best.as_ref().map(BestStrategy::from);
    render_outcome(&outcome.ranked, best.as_ref(), total_laps)
}
