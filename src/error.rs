use crate::data::Compound;
use thiserror::Error;

/// Errors raised while reading lap data. These are hard failures: the input
/// does not have the shape the analysis expects.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read lap data: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse lap data: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed lap row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
}

/// Reasons a single (driver, compound) pair yields no degradation rate.
/// Callers recover by leaving that pair out of the aggregate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DegradationError {
    #[error("insufficient data: {found} laps, need at least {required}")]
    InsufficientData { found: usize, required: usize },

    #[error("degenerate fit: every lap has tyre age {tyre_life}")]
    DegenerateFit { tyre_life: u32 },

    #[error("regression failed: {0}")]
    Regression(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StrategyError {
    #[error("no degradation entry for compound {0}")]
    UnknownCompound(Compound),

    #[error("invalid stint: start lap {start_lap}, length {stint_length}")]
    InvalidStint { start_lap: u32, stint_length: u32 },

    #[error("strategy covers {covered} laps, race has {total_laps}")]
    LapCountMismatch { covered: u32, total_laps: u32 },

    #[error("empty strategy")]
    Empty,

    #[error("cannot parse stint '{input}': {reason}")]
    Parse { input: String, reason: String },
}

/// Configuration validation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid pit window {name}: {start}..={end} with {total_laps} race laps (need start < end < total laps)")]
    InvalidWindow {
        name: &'static str,
        start: u32,
        end: u32,
        total_laps: u32,
    },

    #[error("minimum stint length must be positive")]
    ZeroMinStint,

    #[error("two-stop search infeasible: first window starts at lap {start}, minimum stint {min_stint_length}, race has {total_laps} laps")]
    InfeasibleTwoStop {
        start: u32,
        min_stint_length: u32,
        total_laps: u32,
    },

    #[error("compound set needs at least two distinct compounds, got {0}")]
    TooFewCompounds(usize),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("minimum lap count must be positive")]
    ZeroMinLaps,

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
