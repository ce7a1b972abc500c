use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tabled::{settings::Style, Table, Tabled};

use repcoach::adjustment::{adjust_reps, next_set_by_zone, next_weight_by_rpe};
use repcoach::config::AppConfig;
use repcoach::history::SetLog;
use repcoach::logging::{init_logging, LogLevel};
use repcoach::models::{Baseline, WellnessSample};
use repcoach::predictor::ExertionPredictor;
use repcoach::session::SessionOrchestrator;
use repcoach::training::{TrainingPipeline, TrainingReport};

/// RepCoach - Readiness-driven strength training CLI
///
/// Predicts perceived exertion from a daily wellness check-in and adjusts
/// weights and reps for the session and for each following set.
#[derive(Parser)]
#[command(name = "repcoach")]
#[command(author = "RepCoach Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Adaptive load engine for strength workouts", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Daily wellness check-in, all on a 0-10 scale
#[derive(Args)]
struct WellnessArgs {
    /// Sleep quality (0-10)
    #[arg(long, required_unless_present = "json")]
    sleep_quality: Option<f64>,

    /// Readiness (0-10)
    #[arg(long, required_unless_present = "json")]
    readiness: Option<f64>,

    /// Stress (0-10, higher is worse)
    #[arg(long, required_unless_present = "json")]
    stress: Option<f64>,

    /// Soreness (0-10, higher is worse)
    #[arg(long, required_unless_present = "json")]
    soreness: Option<f64>,

    /// Check-in as a JSON object instead of individual flags
    #[arg(long, conflicts_with_all = ["sleep_quality", "readiness", "stress", "soreness"])]
    json: Option<String>,
}

impl WellnessArgs {
    fn to_sample(&self) -> Result<WellnessSample> {
        if let Some(raw) = &self.json {
            let payload: serde_json::Value =
                serde_json::from_str(raw).with_context(|| "Wellness payload is not valid JSON")?;
            return Ok(WellnessSample::from_json_value(&payload)?);
        }
        match (self.sleep_quality, self.readiness, self.stress, self.soreness) {
            (Some(sleep), Some(readiness), Some(stress), Some(soreness)) => {
                Ok(WellnessSample::new(sleep, readiness, stress, soreness)?)
            }
            _ => bail!("All four wellness values are required"),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum NextSetPolicy {
    /// Step the weight by the logged RPE
    Rpe,
    /// Compare reps and RPE against the target zone
    Zone,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the exertion model from participant logs
    Train {
        /// Dataset root containing <participant>/<subdir>/wellness.csv and srpe.csv
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Where to write the model artifact
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seed for the split and subsampling
        #[arg(long)]
        seed: Option<u64>,

        /// Show a progress bar while reading logs
        #[arg(long)]
        progress: bool,
    },

    /// Predict perceived exertion from a wellness check-in
    Predict {
        #[command(flatten)]
        wellness: WellnessArgs,

        /// Model artifact (defaults to the configured path)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Plan a session by scaling every baseline with predicted readiness
    Plan {
        /// Baselines CSV: exercise_name,base_weight,base_reps
        #[arg(short, long)]
        baselines: PathBuf,

        #[command(flatten)]
        wellness: WellnessArgs,

        /// Model artifact (defaults to the configured path)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Print the plan as JSON
        #[arg(long)]
        as_json: bool,
    },

    /// Recommend the next set from the one just performed
    NextSet {
        /// Weight used for the set
        #[arg(short, long)]
        weight: String,

        /// Logged RPE
        #[arg(short, long)]
        rpe: i32,

        /// Reps performed (required for the zone policy)
        #[arg(long)]
        reps: Option<u32>,

        /// Which rule to apply
        #[arg(short, long, value_enum, default_value = "rpe")]
        policy: NextSetPolicy,
    },

    /// Adjust first-set reps from a predicted exertion
    AdjustReps {
        /// Predicted exertion
        #[arg(short, long, allow_negative_numbers = true)]
        exertion: f64,

        /// Baseline reps
        #[arg(short, long)]
        base_reps: u32,
    },

    /// Per-exercise statistics from a CSV of performed sets
    Stats {
        /// Sets CSV: session_id,session_date,exercise_name,set_number,performed_reps,performed_weight,performed_rpe
        #[arg(short, long)]
        sets: PathBuf,
    },

    /// Configure application settings
    Config {
        /// List all configuration options
        #[arg(short, long)]
        list: bool,

        /// Set a configuration value (key=value)
        #[arg(short, long)]
        set: Option<String>,

        /// Get a configuration value
        #[arg(short, long)]
        get: Option<String>,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Exercise")]
    exercise: String,
    #[tabled(rename = "Weight")]
    weight: Decimal,
    #[tabled(rename = "Reps")]
    reps: u32,
}

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "Exercise")]
    exercise: String,
    #[tabled(rename = "Sets")]
    sets: usize,
    #[tabled(rename = "Avg RPE")]
    average_rpe: String,
    #[tabled(rename = "Heaviest")]
    heaviest: Decimal,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Date")]
    date: chrono::NaiveDate,
    #[tabled(rename = "Session")]
    session: uuid::Uuid,
    #[tabled(rename = "Sets")]
    sets: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let mut config = match &cli.config {
        Some(path) if path.exists() => AppConfig::load_from_file(path)?,
        Some(_) => AppConfig::default(),
        None => AppConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    log_config.level = LogLevel::from_verbosity(log_config.level, cli.verbose);
    init_logging(&log_config)?;

    if cli.verbose > 0 {
        eprintln!("{}", format!("Log level: {}", log_config.level).dimmed());
    }

    match cli.command {
        Commands::Train {
            data,
            output,
            seed,
            progress,
        } => {
            let Some(root) = data.or_else(|| config.training.dataset_root.clone()) else {
                bail!("No dataset root given; pass --data or set training.dataset_root");
            };
            let output = output.unwrap_or_else(|| config.model.artifact_path.clone());

            let mut settings = config.training.clone();
            if let Some(seed) = seed {
                settings.seed = seed;
            }
            settings.show_progress |= progress;

            println!("{}", "Training exertion model...".green().bold());
            println!("  Data: {}", root.display());
            let outcome = TrainingPipeline::new(settings).run(&root, &output)?;
            let report = &outcome.report;

            println!("  Joined rows: {}", report.dataset.joined_rows);
            println!("  Usable rows: {}", report.dataset.usable_rows);
            println!("  Train/test: {}/{}", report.train_rows, report.test_rows);
            if let Some(mae) = report.test_mae {
                println!("  Test MAE: {:.3}", mae);
            }
            println!("  Model: {}", output.display());
            if config.training.write_report {
                println!("  Report: {}", TrainingReport::path_for(&output).display());
            }
            println!("{}", "✓ Training completed successfully".green());
        }

        Commands::Predict { wellness, model } => {
            let sample = wellness.to_sample()?;
            let predictor = load_predictor(model.as_deref(), &config)?;
            let prediction = predictor.predict(&sample);
            println!("{}", serde_json::json!({ "predicted_exertion": prediction.value() }));
        }

        Commands::Plan {
            baselines,
            wellness,
            model,
            as_json,
        } => {
            let sample = wellness.to_sample()?;
            let baselines = Baseline::load_csv(&baselines)?;
            let predictor = load_predictor(model.as_deref(), &config)?;
            let orchestrator = SessionOrchestrator::new(predictor.into_shared());
            let plan = orchestrator.start_session(&sample, &baselines)?;

            if as_json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("{}", format!("Readiness score: {:.1}/10", plan.readiness_score).cyan().bold());
                let rows: Vec<PlanRow> = plan
                    .exercises
                    .iter()
                    .map(|e| PlanRow {
                        exercise: e.exercise_name.clone(),
                        weight: e.recommended_weight,
                        reps: e.recommended_reps,
                    })
                    .collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }

        Commands::NextSet {
            weight,
            rpe,
            reps,
            policy,
        } => match policy {
            NextSetPolicy::Rpe => {
                let weight = Decimal::from_str(&weight)
                    .with_context(|| format!("Invalid weight: {}", weight))?;
                let step = next_weight_by_rpe(weight, rpe);
                println!("{} {}", "Next weight:".bold(), step.weight);
                println!("{}", step.message.yellow());
            }
            NextSetPolicy::Zone => {
                let Some(reps) = reps else {
                    bail!("--reps is required for the zone policy");
                };
                let directive = next_set_by_zone(reps, rpe);
                println!("{} {}", "Action:".bold(), directive.action);
                println!("{}", directive.message.yellow());
            }
        },

        Commands::AdjustReps { exertion, base_reps } => {
            println!("{}", adjust_reps(exertion, base_reps));
        }

        Commands::Stats { sets } => {
            let log = SetLog::load_csv(&sets)?;
            if log.is_empty() {
                println!("{}", "No sets logged".yellow());
                return Ok(());
            }
            let rows: Vec<StatsRow> = log
                .exercise_stats()
                .into_iter()
                .map(|s| StatsRow {
                    exercise: s.exercise_name,
                    sets: s.total_sets,
                    average_rpe: format!("{:.1}", s.average_rpe),
                    heaviest: s.heaviest_weight,
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));

            let history: Vec<HistoryRow> = log
                .session_history()
                .into_iter()
                .map(|s| HistoryRow {
                    date: s.session_date,
                    session: s.session_id,
                    sets: s.sets_performed,
                })
                .collect();
            println!("{}", "Session history".cyan().bold());
            println!("{}", Table::new(history).with(Style::rounded()));
        }

        Commands::Config {
            list,
            set,
            get,
            init,
        } => {
            println!("{}", "Managing configuration...".white().bold());
            if init {
                config.save_to_file(&config_path)?;
                println!("  Wrote {}", config_path.display());
            } else if list {
                for key in AppConfig::keys() {
                    println!("  {} = {}", key, config.get_value(key)?);
                }
            } else if let Some(key_value) = set {
                let Some((key, value)) = key_value.split_once('=') else {
                    bail!("Expected key=value, got {}", key_value);
                };
                config.set_value(key.trim(), value.trim())?;
                config.save_to_file(&config_path)?;
                println!("  {} = {}", key.trim(), value.trim());
            } else if let Some(key) = get {
                println!("  {} = {}", key, config.get_value(&key)?);
            }
            println!("{}", "✓ Configuration updated".white());
        }
    }

    Ok(())
}

fn load_predictor(model: Option<&Path>, config: &AppConfig) -> Result<ExertionPredictor> {
    let path = model.unwrap_or(config.model.artifact_path.as_path());
    ExertionPredictor::load(path).with_context(|| format!("Failed to load model from {}", path.display()))
}
