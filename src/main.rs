use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tyre_strategy::config::AnalysisConfig;
use tyre_strategy::data::{Compound, LapTable};
use tyre_strategy::model::{compare_drivers, DegradationModel, DegradationTable};
use tyre_strategy::report::{self, AnalysisReport, Hms};
use tyre_strategy::strategy::{PitWindow, Strategy, StrategySimulator};
use tyre_strategy::telemetry::init_tracing;

#[derive(Parser)]
#[command(author, version, about = "Tyre degradation and pit-stop strategy predictor", long_about = None)]
struct Cli {
    /// TOML file with race, filter and search settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Emit results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Per-field overrides applied on top of the config file.
#[derive(Args)]
struct Overrides {
    #[arg(long, global = true)]
    total_laps: Option<u32>,

    /// Base lap time in seconds
    #[arg(long, global = true)]
    base_lap_time: Option<f64>,

    /// Lap time gained per lap from fuel burn, seconds
    #[arg(long, global = true)]
    fuel_effect: Option<f64>,

    /// Time lost per pit stop, seconds
    #[arg(long, global = true)]
    pit_loss: Option<f64>,

    /// One-stop pit window, e.g. 12-35
    #[arg(long, global = true, value_parser = parse_window)]
    one_stop_window: Option<PitWindow>,

    /// Two-stop first pit window, e.g. 10-25
    #[arg(long, global = true, value_parser = parse_window)]
    two_stop_window: Option<PitWindow>,

    #[arg(long, global = true)]
    min_stint: Option<u32>,

    /// Compounds to search, e.g. SOFT,MEDIUM,HARD
    #[arg(long, global = true, value_delimiter = ',')]
    compounds: Option<Vec<Compound>>,

    /// Minimum clean laps for a degradation fit
    #[arg(long, global = true)]
    min_laps: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit degradation from lap data and search for the best strategy
    Analyze {
        /// Session lap export (CSV)
        #[arg(long)]
        laps: PathBuf,
    },
    /// Fit and print the per-compound degradation table
    Degradation {
        #[arg(long)]
        laps: PathBuf,
    },
    /// Compare drivers' degradation on one compound
    Compare {
        #[arg(long)]
        laps: PathBuf,

        #[arg(long)]
        compound: Compound,

        /// Driver abbreviation; repeat for more drivers
        #[arg(long = "driver", required = true)]
        drivers: Vec<String>,

        /// Minimum clean laps per driver; looser than the table fit
        #[arg(long, default_value = "5")]
        threshold: usize,
    },
    /// Predict the race time of one strategy, e.g. SOFT:14,HARD:43
    Simulate {
        stints: String,

        /// Fit degradation from this lap export instead of the configured table
        #[arg(long)]
        laps: Option<PathBuf>,
    },
    /// Search strategies over the configured fixed degradation table
    Search,
}

fn parse_window(s: &str) -> Result<PitWindow, String> {
    let (start, end) = s.split_once('-').ok_or_else(|| format!("expected START-END, got '{}'", s))?;
    let start = start.trim().parse().map_err(|e| format!("bad window start: {}", e))?;
    let end = end.trim().parse().map_err(|e| format!("bad window end: {}", e))?;
    Ok(PitWindow::new(start, end))
}

fn build_config(path: Option<&Path>, o: &Overrides) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(p) => AnalysisConfig::load(p)?,
        None => AnalysisConfig::default(),
    };

    if let Some(v) = o.total_laps { config.total_laps = v; }
    if let Some(v) = o.base_lap_time { config.race.base_lap_time = v; }
    if let Some(v) = o.fuel_effect { config.race.fuel_effect_per_lap = v; }
    if let Some(v) = o.pit_loss { config.race.pit_stop_time_loss = v; }
    if let Some(v) = o.one_stop_window { config.search.one_stop = v; }
    if let Some(v) = o.two_stop_window { config.search.two_stop_first = v; }
    if let Some(v) = o.min_stint { config.search.min_stint_length = v; }
    if let Some(v) = &o.compounds { config.search.compounds = v.clone(); }
    if let Some(v) = o.min_laps { config.filter.min_laps = v; }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn load_laps(path: &Path) -> Result<LapTable> {
    let laps = LapTable::from_csv(path).with_context(|| format!("failed to load laps from {}", path.display()))?;
    if laps.is_empty() {
        bail!("no usable laps in {}", path.display());
    }
    Ok(laps)
}

fn fixed_table(config: &AnalysisConfig) -> Result<DegradationTable> {
    match config.fixed_degradation()? {
        Some(table) => Ok(table),
        None => bail!("no lap data given and no [degradation] table in the config"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json, if cli.verbose { Level::DEBUG } else { Level::INFO });

    let config = build_config(cli.config.as_deref(), &cli.overrides)?;
    info!(total_laps = config.total_laps, compounds = ?config.search.compounds, "configuration ready");

    match &cli.command {
        Commands::Analyze { laps } => {
            let laps = load_laps(laps)?;
            let analysis = tyre_strategy::analyze(&laps, &config);
            let report = AnalysisReport::new(&analysis, config.total_laps);
            if cli.json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.render());
            }
        }
        Commands::Degradation { laps } => {
            let laps = load_laps(laps)?;
            let model = DegradationModel::new(&laps, &config.fit_settings());
            let rows = report::degradation_rows(&model.table);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&json!({ "degradation": rows, "driver_fits": model.fits }))?);
            } else {
                print!("{}", report::render_degradation(&rows));
                println!("\nReliable stints:");
                print!("{}", report::render_driver_fits(&model.fits));
            }
        }
        Commands::Compare { laps, compound, drivers, threshold } => {
            let laps = load_laps(laps)?;
            let settings = tyre_strategy::model::FitSettings { min_laps: *threshold, ..config.fit_settings() };
            let rows = compare_drivers(&laps, drivers, *compound, &settings);
            if cli.json {
                let rows: Vec<_> = rows
                    .iter()
                    .map(|(driver, fit)| match fit {
                        Ok(f) => json!({ "driver": driver, "fit": f }),
                        Err(e) => json!({ "driver": driver, "error": e.to_string() }),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("--- Degradation on {} ---", compound);
                for (driver, fit) in rows {
                    match fit {
                        Ok(f) => println!(
                            "- {:5} : {:+.4} s/lap, intercept {:.3}s, {} laps, MAE {:.3}s",
                            driver, f.slope, f.intercept, f.laps_used, f.mean_abs_error
                        ),
                        Err(e) => println!("- {:5} : skipped ({})", driver, e),
                    }
                }
            }
        }
        Commands::Simulate { stints, laps } => {
            let table = match laps {
                Some(path) => DegradationModel::new(&load_laps(path)?, &config.fit_settings()).table,
                None => fixed_table(&config)?,
            };
            let strategy = Strategy::parse(stints, config.total_laps)?;
            let total = StrategySimulator::new(&table, config.race)
                .evaluate(&strategy)
                .with_context(|| format!("cannot evaluate {}", strategy.label()))?;
            let hms = Hms::from_seconds(total);
            if cli.json {
                let out = json!({
                    "label": strategy.label(),
                    "stints": strategy.stints(),
                    "pit_laps": strategy.pit_laps(),
                    "total_time": total,
                    "total_hms": hms.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!(
                    "{} ({} stops, pit lap(s) {:?}): {:.3}s = {:.2} min = {}",
                    strategy.label(),
                    strategy.pit_stops(),
                    strategy.pit_laps(),
                    total,
                    total / 60.0,
                    hms
                );
            }
        }
        Commands::Search => {
            let table = fixed_table(&config)?;
            let outcome = tyre_strategy::search(&table, &config);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print!("{}", report::render_degradation(&report::degradation_rows(&table)));
                println!();
                print!("{}", report::render_search(&outcome, config.total_laps));
            }
        }
    }

    Ok(())
}
