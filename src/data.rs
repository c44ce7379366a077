use crate::error::{DataError, DegradationError};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Tyre compound. Declaration order is the canonical ordering used by the
/// degradation table and the default search enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
}

impl Compound {
    pub const DRY: [Compound; 3] = [Compound::Soft, Compound::Medium, Compound::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
            Compound::Intermediate => "INTERMEDIATE",
            Compound::Wet => "WET",
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Compound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SOFT" => Ok(Compound::Soft),
            "MEDIUM" => Ok(Compound::Medium),
            "HARD" => Ok(Compound::Hard),
            "INTERMEDIATE" | "INTER" => Ok(Compound::Intermediate),
            "WET" => Ok(Compound::Wet),
            other => Err(format!("unknown compound '{}'", other)),
        }
    }
}

// column names as exported from a FastF1 session lap table
#[derive(Debug, Deserialize)]
struct RawLapRow {
    #[serde(rename = "Driver")] driver: String,
    #[serde(rename = "Compound")] compound: Option<String>,
    #[serde(rename = "LapNumber")] lap_number: f64,
    #[serde(rename = "TyreLife")] tyre_life: Option<f64>,
    #[serde(rename = "LapTime")] lap_time: Option<String>,
    #[serde(rename = "PitInTime")] pit_in_time: Option<String>,
    #[serde(rename = "PitOutTime")] pit_out_time: Option<String>,
}

/// One timed lap of one driver. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapRecord {
    pub driver: String,
    pub compound: Compound,
    pub lap_number: u32,
    pub tyre_life: u32,
    pub lap_time: Duration,
    pub pit_in: bool,
    pub pit_out: bool,
}

impl LapRecord {
    pub fn lap_time_seconds(&self) -> f64 {
        self.lap_time.as_secs_f64()
    }

    pub fn is_pit_lap(&self) -> bool {
        self.pit_in || self.pit_out
    }
}

/// Parses a lap duration. Accepts plain seconds (`95.1`), `M:SS.fff`,
/// `H:MM:SS.fff` and the pandas timedelta form `0 days 00:01:35.123000`.
pub fn parse_lap_time(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    let (days, clock) = match text.split_once("days") {
        Some((d, rest)) => {
            let days: u64 = d.trim().parse().map_err(|_| format!("bad day count in '{}'", text))?;
            (days, rest.trim())
        }
        None => (0, text),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() > 3 || parts.iter().any(|p| p.trim().is_empty()) {
        return Err(format!("unrecognised lap time '{}'", text));
    }

    let mut seconds = 0.0;
    for part in &parts {
        let value: f64 = part.trim().parse().map_err(|_| format!("unrecognised lap time '{}'", text))?;
        if !value.is_finite() || value < 0.0 {
            return Err(format!("lap time out of range '{}'", text));
        }
        seconds = seconds * 60.0 + value;
    }
    seconds += days as f64 * 86_400.0;

    Duration::try_from_secs_f64(seconds).map_err(|e| format!("lap time out of range '{}': {}", text, e))
}

fn marker_present(cell: &Option<String>) -> bool {
    cell.as_deref().map_or(false, |s| !s.trim().is_empty())
}

/// The full lap table of one session, in file order.
#[derive(Debug, Clone, Default)]
pub struct LapTable {
    laps: Vec<LapRecord>,
}

impl LapTable {
    pub fn new(laps: Vec<LapRecord>) -> Self {
        Self { laps }
    }

    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let table = Self::from_reader(std::fs::File::open(path)?)?;
        info!(path = %path.display(), laps = table.len(), "loaded lap table");
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut reader = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();
        let mut record = StringRecord::new();
        let mut laps = Vec::new();
        let mut skipped = 0usize;

        while reader.read_record(&mut record)? {
            let line = record.position().map_or(0, |p| p.line());
            let raw: RawLapRow = record.deserialize(Some(&headers))?;
            match Self::convert(raw, line)? {
                Some(lap) => laps.push(lap),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, "skipped untimed or unlabelled laps");
        }
        Ok(Self { laps })
    }

    // Ok(None) means the row is well-formed but carries no usable lap
    fn convert(raw: RawLapRow, line: u64) -> Result<Option<LapRecord>, DataError> {
        let malformed = |reason: String| DataError::MalformedRow { line, reason };

        let compound = match raw.compound.as_deref().map(str::trim) {
            None | Some("") => return Ok(None),
            Some(c) if c.eq_ignore_ascii_case("UNKNOWN") => return Ok(None),
            Some(c) => c.parse::<Compound>().map_err(malformed)?,
        };
        let lap_time = match raw.lap_time.as_deref().map(str::trim) {
            None | Some("") => return Ok(None),
            Some(t) => parse_lap_time(t).map_err(malformed)?,
        };
        let tyre_life = match raw.tyre_life {
            None => return Ok(None),
            Some(t) if !t.is_finite() || t < 0.0 => {
                return Err(malformed(format!("tyre life {} out of range", t)))
            }
            Some(t) => t.round() as u32,
        };
        if raw.driver.trim().is_empty() {
            return Ok(None);
        }
        if !raw.lap_number.is_finite() || raw.lap_number < 1.0 {
            return Err(malformed(format!("lap number {} out of range", raw.lap_number)));
        }

        Ok(Some(LapRecord {
            driver: raw.driver.trim().to_string(),
            compound,
            lap_number: raw.lap_number.round() as u32,
            tyre_life,
            lap_time,
            pit_in: marker_present(&raw.pit_in_time),
            pit_out: marker_present(&raw.pit_out_time),
        }))
    }

    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    /// Distinct drivers in first-appearance order.
    pub fn drivers(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for lap in &self.laps {
            if !seen.iter().any(|d| *d == lap.driver) {
                seen.push(lap.driver.clone());
            }
        }
        seen
    }

    /// Distinct compounds in first-appearance order.
    pub fn compounds(&self) -> Vec<Compound> {
        let mut seen: Vec<Compound> = Vec::new();
        for lap in &self.laps {
            if !seen.contains(&lap.compound) {
                seen.push(lap.compound);
            }
        }
        seen
    }

    pub fn driver_laps(&self, driver: &str) -> Vec<&LapRecord> {
        let mut laps: Vec<&LapRecord> = self.laps.iter().filter(|l| l.driver == driver).collect();
        laps.sort_by_key(|l| l.lap_number);
        laps
    }
}

/// A lap that survived filtering, reduced to the fields the fit needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanLap {
    pub lap_number: u32,
    pub tyre_life: u32,
    pub lap_time_seconds: f64,
}

/// Selects the representative laps of one driver on one compound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LapFilter {
    pub min_laps: usize,
    pub outlier_ratio: f64,
}

impl Default for LapFilter {
    fn default() -> Self {
        Self { min_laps: 10, outlier_ratio: 1.07 }
    }
}

impl LapFilter {
    pub fn apply(
        &self,
        laps: &[LapRecord],
        driver: &str,
        compound: Compound,
    ) -> Result<Vec<CleanLap>, DegradationError> {
        let racing: Vec<CleanLap> = laps
            .iter()
            .filter(|l| l.driver == driver && l.compound == compound && !l.is_pit_lap())
            .map(|l| CleanLap {
                lap_number: l.lap_number,
                tyre_life: l.tyre_life,
                lap_time_seconds: l.lap_time_seconds(),
            })
            .collect();
        self.check_count(racing.len())?;

        let times: Vec<f64> = racing.iter().map(|l| l.lap_time_seconds).collect();
        let cutoff = median(&times) * self.outlier_ratio;
        let kept: Vec<CleanLap> = racing.into_iter().filter(|l| l.lap_time_seconds < cutoff).collect();
        self.check_count(kept.len())?;

        Ok(kept)
    }

    fn check_count(&self, found: usize) -> Result<(), DegradationError> {
        if found < self.min_laps {
            return Err(DegradationError::InsufficientData { found, required: self.min_laps });
        }
        Ok(())
    }
}

/// Median of a non-empty slice; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// A stint actually driven in the session, derived from pit markers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedStint {
    pub driver: String,
    pub compound: Compound,
    pub start_lap: u32,
    pub length: u32,
}

// A stint ends at a pit-in lap, before a pit-out lap, or when the compound
// changes. Tyre column alone misses stops onto the same compound.
pub fn observed_stints(table: &LapTable) -> Vec<ObservedStint> {
    let mut stints = Vec::new();

    for driver in table.drivers() {
        let laps = table.driver_laps(&driver);
        let Some(first) = laps.first() else { continue };
        let mut start_lap = first.lap_number;
        let mut compound = first.compound;

        for (i, curr) in laps.iter().enumerate() {
            let next = laps.get(i + 1);
            let is_stint_end = match next {
                None => true,
                Some(n) => curr.pit_in || n.pit_out || n.compound != curr.compound,
            };

            if is_stint_end {
                let length = curr.lap_number.saturating_sub(start_lap) + 1;
                stints.push(ObservedStint { driver: driver.clone(), compound, start_lap, length });
                if let Some(n) = next {
                    start_lap = n.lap_number;
                    compound = n.compound;
                }
            }
        }
    }
    stints
}

/// Mean observed stint length per compound.
pub fn average_stint_lengths(stints: &[ObservedStint]) -> BTreeMap<Compound, f64> {
    let mut grouped: BTreeMap<Compound, Vec<u32>> = BTreeMap::new();
    for stint in stints {
        grouped.entry(stint.compound).or_default().push(stint.length);
    }
    grouped
        .into_iter()
        .map(|(c, lens)| (c, lens.iter().sum::<u32>() as f64 / lens.len() as f64))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn lap(driver: &str, compound: Compound, lap_number: u32, tyre_life: u32, secs: f64) -> LapRecord {
        LapRecord {
            driver: driver.to_string(),
            compound,
            lap_number,
            tyre_life,
            lap_time: Duration::from_secs_f64(secs),
            pit_in: false,
            pit_out: false,
        }
    }

    fn steady_stint(driver: &str, compound: Compound, count: u32) -> Vec<LapRecord> {
        (1..=count).map(|i| lap(driver, compound, i, i, 95.0 + i as f64 * 0.1)).collect()
    }

    #[test]
    fn test_parse_lap_time_formats() {
        assert_eq!(parse_lap_time("95.5").unwrap(), Duration::from_secs_f64(95.5));
        assert_eq!(parse_lap_time("1:35.5").unwrap(), Duration::from_secs_f64(95.5));
        assert_eq!(parse_lap_time("0:01:35.5").unwrap(), Duration::from_secs_f64(95.5));
        assert_eq!(parse_lap_time("0 days 00:01:35.500000").unwrap(), Duration::from_secs_f64(95.5));
        assert!(parse_lap_time("fast").is_err());
        assert!(parse_lap_time("-1:00").is_err());
        assert!(parse_lap_time("1::2").is_err());
    }

    #[test]
    fn test_compound_parse_is_case_insensitive() {
        assert_eq!("soft".parse::<Compound>().unwrap(), Compound::Soft);
        assert_eq!(" Hard ".parse::<Compound>().unwrap(), Compound::Hard);
        assert_eq!("INTERMEDIATE".parse::<Compound>().unwrap(), Compound::Intermediate);
        assert!("SUPERSOFT".parse::<Compound>().is_err());
        assert_eq!(Compound::Medium.to_string(), "MEDIUM");
    }

    #[test]
    fn test_csv_loading_skips_untimed_and_marks_pits() {
        let csv = "\
Driver,LapNumber,Compound,TyreLife,LapTime,PitInTime,PitOutTime
VER,1.0,SOFT,1.0,0 days 00:01:39.019000,,0 days 01:00:00
VER,2.0,SOFT,2.0,0 days 00:01:37.974000,,
VER,3.0,SOFT,3.0,,,
VER,4.0,UNKNOWN,4.0,97.1,,
PER,1.0,soft,1.0,98.2,0 days 01:02:00,
";
        let table = LapTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.laps()[0].pit_out);
        assert!(!table.laps()[1].is_pit_lap());
        assert!(table.laps()[2].pit_in);
        assert_eq!(table.drivers(), vec!["VER".to_string(), "PER".to_string()]);
        assert_eq!(table.compounds(), vec![Compound::Soft]);
    }

    #[test]
    fn test_csv_malformed_row_is_hard_failure() {
        let csv = "Driver,LapNumber,Compound,TyreLife,LapTime,PitInTime,PitOutTime\nVER,1,SOFT,1,ninety,,\n";
        match LapTable::from_reader(csv.as_bytes()) {
            Err(DataError::MalformedRow { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed row, got {:?}", other),
        }

        let csv = "Driver,LapNumber,Compound,TyreLife,LapTime,PitInTime,PitOutTime\nVER,0,SOFT,1,95.0,,\n";
        assert!(matches!(LapTable::from_reader(csv.as_bytes()), Err(DataError::MalformedRow { .. })));

        // finite but beyond what a Duration holds
        let csv = "Driver,LapNumber,Compound,TyreLife,LapTime,PitInTime,PitOutTime\nVER,1,SOFT,1,1e20,,\n";
        assert!(matches!(LapTable::from_reader(csv.as_bytes()), Err(DataError::MalformedRow { line: 2, .. })));
        assert!(parse_lap_time("1e300:1e300:1e300").is_err());
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_filter_threshold_boundary() {
        let filter = LapFilter::default();
        let laps = steady_stint("VER", Compound::Hard, 10);
        assert_eq!(filter.apply(&laps, "VER", Compound::Hard).unwrap().len(), 10);

        let laps = steady_stint("VER", Compound::Hard, 9);
        assert_eq!(
            filter.apply(&laps, "VER", Compound::Hard),
            Err(DegradationError::InsufficientData { found: 9, required: 10 })
        );
    }

    #[test]
    fn test_filter_removes_pit_laps_and_other_drivers() {
        let mut laps = steady_stint("VER", Compound::Medium, 12);
        laps[0].pit_out = true;
        laps[11].pit_in = true;
        laps.extend(steady_stint("PER", Compound::Medium, 12));
        laps.extend(steady_stint("VER", Compound::Hard, 12));

        let kept = LapFilter::default().apply(&laps, "VER", Compound::Medium).unwrap();
        assert_eq!(kept.len(), 10);
        assert!(kept.iter().all(|l| l.lap_number >= 2 && l.lap_number <= 11));
    }

    #[test]
    fn test_filter_outliers_rechecks_count() {
        let mut laps = steady_stint("VER", Compound::Soft, 11);
        // safety-car lap well beyond 107% of the median
        laps[4].lap_time = Duration::from_secs_f64(130.0);
        let kept = LapFilter::default().apply(&laps, "VER", Compound::Soft).unwrap();
        assert_eq!(kept.len(), 10);
        assert!(kept.iter().all(|l| l.lap_time_seconds < 100.0));

        laps[5].lap_time = Duration::from_secs_f64(131.0);
        assert_eq!(
            LapFilter::default().apply(&laps, "VER", Compound::Soft),
            Err(DegradationError::InsufficientData { found: 9, required: 10 })
        );
    }

    #[test]
    fn test_exploratory_threshold() {
        let laps = steady_stint("GAS", Compound::Hard, 6);
        let filter = LapFilter { min_laps: 5, ..LapFilter::default() };
        assert_eq!(filter.apply(&laps, "GAS", Compound::Hard).unwrap().len(), 6);
    }

    #[test]
    fn test_average_stint_length_calculation() {
        // DRIVER1: 5-lap MEDIUM, 4-lap HARD
        // DRIVER2: 3-lap MEDIUM, 2-lap HARD
        let mut laps = Vec::new();
        for i in 1..=9 {
            let compound = if i <= 5 { Compound::Medium } else { Compound::Hard };
            let mut l = lap("DRIVER1", compound, i, i, 100.0);
            l.pit_in = i == 5;
            l.pit_out = i == 6;
            laps.push(l);
        }
        for i in 1..=5 {
            let compound = if i <= 3 { Compound::Medium } else { Compound::Hard };
            let mut l = lap("DRIVER2", compound, i, i, 95.0);
            l.pit_in = i == 3;
            l.pit_out = i == 4;
            laps.push(l);
        }

        let stints = observed_stints(&LapTable::new(laps));
        assert_eq!(stints.len(), 4);
        let avg = average_stint_lengths(&stints);
        assert_eq!(avg[&Compound::Medium], (5.0 + 3.0) / 2.0);
        assert_eq!(avg[&Compound::Hard], (4.0 + 2.0) / 2.0);
    }

    #[test]
    fn test_same_compound_stop_splits_stint() {
        let mut laps: Vec<LapRecord> = (1..=6).map(|i| lap("HAM", Compound::Hard, i, i, 96.0)).collect();
        laps[2].pit_in = true;
        laps[3].pit_out = true;
        let stints = observed_stints(&LapTable::new(laps));
        assert_eq!(stints.iter().map(|s| s.length).collect::<Vec<_>>(), vec![3, 3]);
    }
}
