use crate::data::Compound;
use crate::error::StrategyError;
use crate::model::DegradationTable;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Track-specific inputs of the lap-time model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceParams {
    pub base_lap_time: f64,
    pub fuel_effect_per_lap: f64,
    pub pit_stop_time_loss: f64,
}

impl Default for RaceParams {
    fn default() -> Self {
        Self { base_lap_time: 99.5, fuel_effect_per_lap: 0.04, pit_stop_time_loss: 22.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stint {
    pub compound: Compound,
    pub laps: u32,
}

impl Stint {
    pub fn new(compound: Compound, laps: u32) -> Self {
        Self { compound, laps }
    }
}

impl FromStr for Stint {
    type Err = StrategyError;

    /// Parses `COMPOUND:LAPS`, e.g. `SOFT:14`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = |reason: String| StrategyError::Parse { input: s.to_string(), reason };
        let (compound, laps) = s.split_once(':').ok_or_else(|| parse_err("expected COMPOUND:LAPS".into()))?;
        let compound = compound.parse::<Compound>().map_err(parse_err)?;
        let laps = laps.trim().parse::<u32>().map_err(|e| parse_err(e.to_string()))?;
        Ok(Stint { compound, laps })
    }
}

/// Ordered, non-empty sequence of stints covering the whole race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Strategy {
    stints: Vec<Stint>,
}

impl Strategy {
    pub fn new(stints: Vec<Stint>, total_laps: u32) -> Result<Self, StrategyError> {
        if stints.is_empty() {
            return Err(StrategyError::Empty);
        }
        let mut start_lap = 1;
        for s in &stints {
            if s.laps == 0 {
                return Err(StrategyError::InvalidStint { start_lap, stint_length: 0 });
            }
            start_lap = start_lap
                .checked_add(s.laps)
                .ok_or(StrategyError::InvalidStint { start_lap, stint_length: s.laps })?;
        }
        let covered = start_lap - 1;
        if covered != total_laps {
            return Err(StrategyError::LapCountMismatch { covered, total_laps });
        }
        Ok(Self { stints })
    }

    /// Parses a comma-separated stint list such as `SOFT:14,HARD:43`.
    pub fn parse(input: &str, total_laps: u32) -> Result<Self, StrategyError> {
        let stints = input
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<Stint>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(stints, total_laps)
    }

    pub fn stints(&self) -> &[Stint] {
        &self.stints
    }

    pub fn pit_stops(&self) -> usize {
        self.stints.len() - 1
    }

    /// Lap numbers on which the car pits.
    pub fn pit_laps(&self) -> Vec<u32> {
        self.stints
            .iter()
            .take(self.stints.len() - 1)
            .scan(0, |lap, s| {
                *lap += s.laps;
                Some(*lap)
            })
            .collect()
    }

    pub fn label(&self) -> String {
        compound_label(self.stints.iter().map(|s| s.compound))
    }
}

fn compound_label<I: IntoIterator<Item = Compound>>(compounds: I) -> String {
    compounds.into_iter().map(|c| c.as_str()).collect::<Vec<_>>().join("-")
}

/// Best candidate of one compound combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyResult {
    pub label: String,
    pub compounds: Vec<Compound>,
    pub total_time: f64,
    pub pit_lap_1: u32,
    pub pit_lap_2: Option<u32>,
}

impl StrategyResult {
    pub fn pit_laps(&self) -> Vec<u32> {
        std::iter::once(self.pit_lap_1).chain(self.pit_lap_2).collect()
    }
}

impl fmt::Display for StrategyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let laps: Vec<String> = self.pit_laps().iter().map(|l| l.to_string()).collect();
        write!(f, "{} pitting on lap(s) {} ({:.3}s)", self.label, laps.join(", "), self.total_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitWindow {
    pub start: u32,
    pub end: u32,
}

impl PitWindow {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn laps(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// Bounds of the exhaustive pit-lap search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpace {
    pub one_stop: PitWindow,
    pub two_stop_first: PitWindow,
    pub min_stint_length: u32,
    pub compounds: Vec<Compound>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            one_stop: PitWindow::new(12, 35),
            two_stop_first: PitWindow::new(10, 25),
            min_stint_length: 8,
            compounds: Compound::DRY.to_vec(),
        }
    }
}

impl SearchSpace {
    /// Configured compounds with repeats dropped, in first-appearance order.
    pub fn distinct_compounds(&self) -> Vec<Compound> {
        let mut seen = Vec::new();
        for &c in &self.compounds {
            if !seen.contains(&c) {
                seen.push(c);
            }
        }
        seen
    }

    /// Ordered pairs of distinct compounds.
    pub fn one_stop_combinations(&self) -> Vec<[Compound; 2]> {
        let compounds = self.distinct_compounds();
        let mut combos = Vec::new();
        for &a in &compounds {
            for &b in &compounds {
                if a != b {
                    combos.push([a, b]);
                }
            }
        }
        combos
    }

    /// Ordered triples using at least two distinct compounds.
    pub fn two_stop_combinations(&self) -> Vec<[Compound; 3]> {
        let compounds = self.distinct_compounds();
        let mut combos = Vec::new();
        for &a in &compounds {
            for &b in &compounds {
                for &c in &compounds {
                    if !(a == b && b == c) {
                        combos.push([a, b, c]);
                    }
                }
            }
        }
        combos
    }
}

/// Every best-per-combination result, fastest first, and the overall winner.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub ranked: Vec<StrategyResult>,
    pub best: Option<StrategyResult>,
}

impl SearchOutcome {
    fn from_results(results: Vec<StrategyResult>) -> Self {
        // first minimum in enumeration order wins
        let best = results
            .iter()
            .fold(None::<&StrategyResult>, |best, r| match best {
                Some(b) if b.total_time.total_cmp(&r.total_time).is_le() => Some(b),
                _ => Some(r),
            })
            .cloned();
        let mut ranked = results;
        // stable: equal times keep enumeration order
        ranked.sort_by(|a, b| a.total_time.total_cmp(&b.total_time));
        Self { ranked, best }
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_none()
    }
}

// Keeps the first candidate with the strictly smallest time.
fn keep_min(best: &mut Option<StrategyResult>, candidate: StrategyResult) {
    if best.as_ref().map_or(true, |b| candidate.total_time < b.total_time) {
        *best = Some(candidate);
    }
}

/// Linear tyre-wear and fuel-burn race model over a degradation table.
pub struct StrategySimulator<'a> {
    table: &'a DegradationTable,
    params: RaceParams,
}

impl<'a> StrategySimulator<'a> {
    pub fn new(table: &'a DegradationTable, params: RaceParams) -> Self {
        Self { table, params }
    }

    /// Summed predicted lap time of one stint starting on `start_lap` on fresh tyres.
    pub fn simulate_stint(&self, start_lap: u32, stint_length: u32, compound: Compound) -> Result<f64, StrategyError> {
        if start_lap == 0 || stint_length == 0 || start_lap.checked_add(stint_length).is_none() {
            return Err(StrategyError::InvalidStint { start_lap, stint_length });
        }
        let rate = self.table.rate(compound).ok_or(StrategyError::UnknownCompound(compound))?;
        let RaceParams { base_lap_time, fuel_effect_per_lap, .. } = self.params;

        let mut total = 0.0;
        for i in 0..stint_length {
            let current_lap_in_race = (start_lap + i) as f64;
            let tyre_age = (i + 1) as f64;
            total += base_lap_time + tyre_age * rate - current_lap_in_race * fuel_effect_per_lap;
        }
        Ok(total)
    }

    /// Total race time: stint times in order, then one pit loss per stop.
    pub fn simulate_strategy(&self, stints: &[Stint]) -> Result<f64, StrategyError> {
        if stints.is_empty() {
            return Err(StrategyError::Empty);
        }
        let mut total = 0.0;
        let mut start_lap = 1;
        for s in stints {
            total += self.simulate_stint(start_lap, s.laps, s.compound)?;
            start_lap = start_lap
                .checked_add(s.laps)
                .ok_or(StrategyError::InvalidStint { start_lap, stint_length: s.laps })?;
        }
        total += (stints.len() - 1) as f64 * self.params.pit_stop_time_loss;
        Ok(total)
    }

    pub fn evaluate(&self, strategy: &Strategy) -> Result<f64, StrategyError> {
        self.simulate_strategy(strategy.stints())
    }

    /// Best single stop on `window` for the given compound pair, or `None`
    /// when no candidate is feasible.
    pub fn find_best_one_stop(&self, compounds: [Compound; 2], total_laps: u32, window: PitWindow) -> Option<StrategyResult> {
        let label = compound_label(compounds);
        let mut best = None;
        let mut evaluated = 0usize;

        for pit_lap in window.laps() {
            if pit_lap == 0 || pit_lap >= total_laps {
                continue;
            }
            let stints = [Stint::new(compounds[0], pit_lap), Stint::new(compounds[1], total_laps - pit_lap)];
            match self.simulate_strategy(&stints) {
                Ok(total_time) => {
                    evaluated += 1;
                    keep_min(
                        &mut best,
                        StrategyResult {
                            label: label.clone(),
                            compounds: compounds.to_vec(),
                            total_time,
                            pit_lap_1: pit_lap,
                            pit_lap_2: None,
                        },
                    );
                }
                Err(StrategyError::UnknownCompound(c)) => {
                    debug!(%label, compound = %c, "combination uses a compound with no degradation entry");
                    return None;
                }
                Err(e) => debug!(%label, pit_lap, reason = %e, "candidate rejected"),
            }
        }

        debug!(%label, evaluated, "one-stop sweep done");
        best
    }

    /// Best pair of stops: first on `first_window`, second anywhere leaving
    /// at least `min_stint_length` laps in the middle and final stints.
    pub fn find_best_two_stop(
        &self,
        compounds: [Compound; 3],
        total_laps: u32,
        first_window: PitWindow,
        min_stint_length: u32,
    ) -> Option<StrategyResult> {
        let label = compound_label(compounds);
        let mut best = None;
        let mut evaluated = 0usize;

        for pit_lap_1 in first_window.laps() {
            if pit_lap_1 == 0 {
                continue;
            }
            let second_start = pit_lap_1.saturating_add(min_stint_length);
            let Some(second_end) = total_laps.checked_sub(min_stint_length) else { break };

            for pit_lap_2 in second_start..=second_end {
                if pit_lap_2 <= pit_lap_1 || pit_lap_2 >= total_laps {
                    continue;
                }
                let stints = [
                    Stint::new(compounds[0], pit_lap_1),
                    Stint::new(compounds[1], pit_lap_2 - pit_lap_1),
                    Stint::new(compounds[2], total_laps - pit_lap_2),
                ];
                match self.simulate_strategy(&stints) {
                    Ok(total_time) => {
                        evaluated += 1;
                        keep_min(
                            &mut best,
                            StrategyResult {
                                label: label.clone(),
                                compounds: compounds.to_vec(),
                                total_time,
                                pit_lap_1,
                                pit_lap_2: Some(pit_lap_2),
                            },
                        );
                    }
                    Err(StrategyError::UnknownCompound(c)) => {
                        debug!(%label, compound = %c, "combination uses a compound with no degradation entry");
                        return None;
                    }
                    Err(e) => debug!(%label, pit_lap_1, pit_lap_2, reason = %e, "candidate rejected"),
                }
            }
        }

        debug!(%label, evaluated, "two-stop sweep done");
        best
    }

    /// Runs every one-stop and two-stop combination of the search space.
    /// Combinations are searched in parallel and collected in enumeration
    /// order, so ties resolve the same way as a sequential run.
    pub fn search(&self, total_laps: u32, space: &SearchSpace) -> SearchOutcome {
        let one_stops: Vec<StrategyResult> = space
            .one_stop_combinations()
            .par_iter()
            .filter_map(|pair| self.find_best_one_stop(*pair, total_laps, space.one_stop))
            .collect();
        let two_stops: Vec<StrategyResult> = space
            .two_stop_combinations()
            .par_iter()
            .filter_map(|triple| self.find_best_two_stop(*triple, total_laps, space.two_stop_first, space.min_stint_length))
            .collect();

        let results: Vec<StrategyResult> = one_stops.into_iter().chain(two_stops).collect();
        let outcome = SearchOutcome::from_results(results);

        match &outcome.best {
            Some(best) => info!(candidates = outcome.ranked.len(), best = %best, "strategy search done"),
            None => warn!(total_laps, "no viable strategy found"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bahrain_table() -> DegradationTable {
        DegradationTable::from_rates([
            (Compound::Soft, 0.014756),
            (Compound::Hard, 0.071352),
            (Compound::Medium, 0.275393),
        ])
    }

    fn reference_stint(start_lap: u32, length: u32, rate: f64, params: &RaceParams) -> f64 {
        let mut total = 0.0;
        for i in 0..length {
            total += params.base_lap_time + (i + 1) as f64 * rate - (start_lap + i) as f64 * params.fuel_effect_per_lap;
        }
        total
    }

    #[test]
    fn test_soft_opening_stint() {
        let table = bahrain_table();
        let sim = StrategySimulator::new(&table, RaceParams::default());
        let time = sim.simulate_stint(1, 14, Compound::Soft).unwrap();
        assert_eq!(time, reference_stint(1, 14, 0.014756, &RaceParams::default()));
        // closed form: 14 * 99.5 + 105 * (0.014756 - 0.04)
        assert!((time - (1393.0 + 105.0 * (0.014756 - 0.04))).abs() < 1e-9);
    }

    #[test]
    fn test_stint_contract() {
        let table = bahrain_table();
        let sim = StrategySimulator::new(&table, RaceParams::default());
        assert_eq!(
            sim.simulate_stint(0, 5, Compound::Soft),
            Err(StrategyError::InvalidStint { start_lap: 0, stint_length: 5 })
        );
        assert_eq!(
            sim.simulate_stint(1, 0, Compound::Soft),
            Err(StrategyError::InvalidStint { start_lap: 1, stint_length: 0 })
        );
        assert_eq!(sim.simulate_stint(1, 5, Compound::Wet), Err(StrategyError::UnknownCompound(Compound::Wet)));
    }

    #[test]
    fn test_stint_monotonic_in_rate_and_fuel() {
        let params = RaceParams::default();
        let mut previous = f64::MIN;
        for rate in [-0.05, 0.0, 0.01, 0.1, 0.5] {
            let table = DegradationTable::from_rates([(Compound::Hard, rate)]);
            let t = StrategySimulator::new(&table, params).simulate_stint(10, 20, Compound::Hard).unwrap();
            assert!(t > previous);
            previous = t;
        }

        let table = bahrain_table();
        let mut previous = f64::MAX;
        for fuel in [0.0, 0.02, 0.04, 0.08] {
            let params = RaceParams { fuel_effect_per_lap: fuel, ..RaceParams::default() };
            let t = StrategySimulator::new(&table, params).simulate_stint(10, 20, Compound::Hard).unwrap();
            assert!(t < previous);
            previous = t;
        }
    }

    #[test]
    fn test_strategy_adds_pit_loss_once_per_stop() {
        let table = bahrain_table();
        let params = RaceParams::default();
        let sim = StrategySimulator::new(&table, params);

        let single = sim.simulate_strategy(&[Stint::new(Compound::Hard, 57)]).unwrap();
        assert_eq!(single, sim.simulate_stint(1, 57, Compound::Hard).unwrap());

        let stints = [Stint::new(Compound::Soft, 14), Stint::new(Compound::Hard, 25), Stint::new(Compound::Hard, 18)];
        let expected = sim.simulate_stint(1, 14, Compound::Soft).unwrap()
            + sim.simulate_stint(15, 25, Compound::Hard).unwrap()
            + sim.simulate_stint(40, 18, Compound::Hard).unwrap()
            + 2.0 * params.pit_stop_time_loss;
        assert!((sim.simulate_strategy(&stints).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_strategy_parse_and_validation() {
        let s = Strategy::parse("SOFT:14, HARD:43", 57).unwrap();
        assert_eq!(s.label(), "SOFT-HARD");
        assert_eq!(s.pit_laps(), vec![14]);
        assert_eq!(s.pit_stops(), 1);

        let s = Strategy::parse("soft:14,hard:25,hard:18", 57).unwrap();
        assert_eq!(s.pit_laps(), vec![14, 39]);

        assert_eq!(
            Strategy::parse("SOFT:14,HARD:40", 57),
            Err(StrategyError::LapCountMismatch { covered: 54, total_laps: 57 })
        );
        assert_eq!(Strategy::parse("", 57), Err(StrategyError::Empty));
        assert!(matches!(Strategy::parse("SOFT14", 57), Err(StrategyError::Parse { .. })));
        assert!(matches!(Strategy::parse("SOFT:0,HARD:57", 57), Err(StrategyError::InvalidStint { .. })));
        assert_eq!(
            Strategy::parse("SOFT:4294967295,HARD:2", 57),
            Err(StrategyError::InvalidStint { start_lap: 1, stint_length: u32::MAX })
        );
    }

    #[test]
    fn test_stint_lap_overflow_is_rejected() {
        let table = bahrain_table();
        let sim = StrategySimulator::new(&table, RaceParams::default());
        let stints = [Stint::new(Compound::Soft, 3), Stint::new(Compound::Hard, u32::MAX)];
        assert_eq!(
            sim.simulate_strategy(&stints),
            Err(StrategyError::InvalidStint { start_lap: 4, stint_length: u32::MAX })
        );
    }

    #[test]
    fn test_one_stop_sweep_is_global_minimum() {
        let table = bahrain_table();
        let sim = StrategySimulator::new(&table, RaceParams::default());
        let window = PitWindow::new(12, 35);
        let best = sim.find_best_one_stop([Compound::Soft, Compound::Hard], 57, window).unwrap();

        assert!(window.laps().contains(&best.pit_lap_1));
        assert_eq!(best.pit_lap_2, None);
        assert_eq!(best.label, "SOFT-HARD");
        for p in window.laps() {
            let t = sim
                .simulate_strategy(&[Stint::new(Compound::Soft, p), Stint::new(Compound::Hard, 57 - p)])
                .unwrap();
            assert!(best.total_time <= t);
        }
        // soft wears slowest, so the longest allowed soft stint wins
        assert_eq!(best.pit_lap_1, 35);
    }

    #[test]
    fn test_one_stop_tie_keeps_first_lap() {
        // zero wear and zero fuel effect make every pit lap equal
        let table = DegradationTable::from_rates([(Compound::Soft, 0.0), (Compound::Hard, 0.0)]);
        let params = RaceParams { base_lap_time: 90.0, fuel_effect_per_lap: 0.0, pit_stop_time_loss: 20.0 };
        let sim = StrategySimulator::new(&table, params);
        let best = sim.find_best_one_stop([Compound::Soft, Compound::Hard], 40, PitWindow::new(10, 20)).unwrap();
        assert_eq!(best.pit_lap_1, 10);
    }

    #[test]
    fn test_empty_windows_yield_nothing() {
        let table = bahrain_table();
        let sim = StrategySimulator::new(&table, RaceParams::default());
        assert!(sim.find_best_one_stop([Compound::Soft, Compound::Hard], 10, PitWindow::new(12, 35)).is_none());
        assert!(sim
            .find_best_two_stop([Compound::Soft, Compound::Hard, Compound::Soft], 20, PitWindow::new(10, 25), 8)
            .is_none());
        assert!(sim
            .find_best_two_stop([Compound::Soft, Compound::Hard, Compound::Soft], 5, PitWindow::new(1, 3), 8)
            .is_none());
    }

    #[test]
    fn test_two_stop_respects_min_stint() {
        let table = bahrain_table();
        let sim = StrategySimulator::new(&table, RaceParams::default());
        let best = sim
            .find_best_two_stop([Compound::Medium, Compound::Soft, Compound::Hard], 57, PitWindow::new(10, 25), 8)
            .unwrap();
        let p2 = best.pit_lap_2.unwrap();
        assert!((10..=25).contains(&best.pit_lap_1));
        assert!(p2 - best.pit_lap_1 >= 8);
        assert!(57 - p2 >= 8);
        assert_eq!(best.label, "MEDIUM-SOFT-HARD");
    }

    #[test]
    fn test_unknown_compound_never_wins() {
        // WET would look unbeatable if its missing rate were read as zero
        let table = DegradationTable::from_rates([(Compound::Soft, 0.3), (Compound::Hard, 0.2)]);
        let sim = StrategySimulator::new(&table, RaceParams::default());
        let space = SearchSpace {
            compounds: vec![Compound::Soft, Compound::Wet, Compound::Hard],
            ..SearchSpace::default()
        };
        assert!(sim
            .find_best_two_stop([Compound::Soft, Compound::Wet, Compound::Hard], 57, space.two_stop_first, 8)
            .is_none());

        let outcome = sim.search(57, &space);
        let best = outcome.best.unwrap();
        assert!(!best.compounds.contains(&Compound::Wet));
        assert!(outcome.ranked.iter().all(|r| !r.compounds.contains(&Compound::Wet)));
    }

    #[test]
    fn test_combination_enumeration() {
        let space = SearchSpace::default();
        let pairs = space.one_stop_combinations();
        assert_eq!(pairs.len(), 6);
        assert_eq!(pairs[0], [Compound::Soft, Compound::Medium]);
        let triples = space.two_stop_combinations();
        assert_eq!(triples.len(), 24);
        assert!(!triples.contains(&[Compound::Hard; 3]));
    }

    #[test]
    fn test_repeated_compounds_enumerate_once() {
        let space = SearchSpace {
            compounds: vec![Compound::Soft, Compound::Soft, Compound::Hard],
            ..SearchSpace::default()
        };
        assert_eq!(space.distinct_compounds(), vec![Compound::Soft, Compound::Hard]);
        assert_eq!(space.one_stop_combinations(), vec![[Compound::Soft, Compound::Hard], [Compound::Hard, Compound::Soft]]);
        assert_eq!(space.two_stop_combinations().len(), 6);

        let table = bahrain_table();
        let outcome = StrategySimulator::new(&table, RaceParams::default()).search(57, &space);
        assert_eq!(outcome.ranked.len(), 8);
    }

    #[test]
    fn test_nan_time_never_displaces_best() {
        let result = |label: &str, total_time: f64| StrategyResult {
            label: label.to_string(),
            compounds: vec![Compound::Soft, Compound::Hard],
            total_time,
            pit_lap_1: 20,
            pit_lap_2: None,
        };
        let outcome = SearchOutcome::from_results(vec![result("A", 5600.0), result("B", f64::NAN), result("C", 5700.0)]);
        assert_eq!(outcome.best.as_ref().map(|b| b.label.as_str()), Some("A"));
        assert_eq!(outcome.best.as_ref(), outcome.ranked.first());
    }

    #[test]
    fn test_search_is_deterministic_and_ranked() {
        let table = bahrain_table();
        let sim = StrategySimulator::new(&table, RaceParams::default());
        let space = SearchSpace::default();
        let a = sim.search(57, &space);
        let b = sim.search(57, &space);
        assert_eq!(a, b);
        assert_eq!(a.ranked.len(), 30);
        assert!(a.ranked.windows(2).all(|w| w[0].total_time <= w[1].total_time));
        assert_eq!(a.best.as_ref(), a.ranked.first());
    }

    #[test]
    fn test_search_ties_resolve_in_enumeration_order() {
        let table = DegradationTable::from_rates([(Compound::Soft, 0.0), (Compound::Medium, 0.0), (Compound::Hard, 0.0)]);
        let params = RaceParams { base_lap_time: 90.0, fuel_effect_per_lap: 0.0, pit_stop_time_loss: 20.0 };
        let sim = StrategySimulator::new(&table, params);
        let outcome = sim.search(57, &SearchSpace::default());
        let best = outcome.best.unwrap();
        assert_eq!(best.label, "SOFT-MEDIUM");
        assert_eq!(best.pit_lap_1, 12);
        assert_eq!(outcome.ranked[0], best);
    }

    #[test]
    fn test_no_viable_strategy() {
        let table = DegradationTable::default();
        let sim = StrategySimulator::new(&table, RaceParams::default());
        let outcome = sim.search(57, &SearchSpace::default());
        assert!(outcome.is_empty());
        assert!(outcome.ranked.is_empty());
    }
}
