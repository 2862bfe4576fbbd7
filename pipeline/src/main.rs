//! Trafic CLI - reshape raw traffic records and load them into SQLite
//!
//! # Main Commands
//!
//! ```bash
//! trafic run                        # transform_data then load_data, once
//! trafic schedule                   # run the DAG every day
//! ```
//!
//! # Single Tasks
//!
//! ```bash
//! trafic transform                  # raw_data/trafic.csv -> processed_data/processed_data.csv
//! trafic load                       # processed_data.csv -> trafic_record
//! trafic dag                        # show the task graph
//! trafic config                     # show the resolved configuration
//! ```

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use trafic::{
    load_file, run_schedule, transform_file, ConfigOverrides, Dag, LoadMode, PipelineConfig,
    ScheduleOptions, ShortGroupPolicy, TaskState,
};

#[derive(Parser)]
#[command(name = "trafic")]
#[command(about = "Reshape raw traffic records and load them into SQLite", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Working directory holding raw_data/ and processed_data/
    #[arg(short, long, global = true)]
    workdir: Option<PathBuf>,

    /// Raw input file (relative to workdir)
    #[arg(long, global = true)]
    raw_input: Option<PathBuf>,

    /// Processed output file (relative to workdir)
    #[arg(long, global = true)]
    processed_output: Option<PathBuf>,

    /// SQLite database file (relative to workdir)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Destination table
    #[arg(long, global = true)]
    table: Option<String>,

    /// What to do with incomplete trailing groups
    #[arg(long, value_enum, global = true)]
    short_groups: Option<ShortGroupPolicy>,

    /// How existing table rows are treated
    #[arg(long, value_enum, global = true)]
    load_mode: Option<LoadMode>,

    /// Print reports as JSON on stdout
    #[arg(long, global = true)]
    json: bool,
}

impl GlobalArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            workdir: self.workdir.clone(),
            raw_input: self.raw_input.clone(),
            processed_output: self.processed_output.clone(),
            database: self.database.clone(),
            table: self.table.clone(),
            short_groups: self.short_groups,
            load_mode: self.load_mode,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Reshape the raw file into the processed CSV (transform_data)
    Transform,

    /// Load the processed CSV into the database (load_data)
    Load,

    /// Run the whole DAG once
    Run,

    /// Run the DAG on its schedule
    Schedule {
        /// Stop after this many runs
        #[arg(long)]
        max_runs: Option<usize>,

        /// Seconds between runs (default: the DAG interval, one day)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Show the task graph
    Dag,

    /// Show the resolved configuration
    Config,
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let result = match PipelineConfig::resolve(cli.global.config.as_deref(), cli.global.overrides())
    {
        Ok(config) => {
            let json = cli.global.json;
            match cli.command {
                Commands::Transform => cmd_transform(&config, json),
                Commands::Load => cmd_load(&config, json),
                Commands::Run => cmd_run(&config, json),
                Commands::Schedule {
                    max_runs,
                    interval_secs,
                } => cmd_schedule(config, max_runs, interval_secs, json).await,
                Commands::Dag => cmd_dag(json),
                Commands::Config => cmd_config(&config),
            }
        }
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_transform(config: &PipelineConfig, json: bool) -> CmdResult {
    eprintln!("📄 Transforming: {}", config.raw_input.display());

    let report = transform_file(config)?;
    if json {
        return print_json(&report);
    }

    eprintln!("   Encoding: {}", report.encoding);
    eprintln!("   Lines: {}", report.lines_read);
    if report.empty_lines > 0 {
        eprintln!("   Lines without groups: {}", report.empty_lines);
    }
    if report.short_rows > 0 {
        eprintln!(
            "   ⚠️  Short rows: {} (policy: {:?})",
            report.short_rows, report.short_groups
        );
    }
    eprintln!("✅ Shape {} written to: {}", report.shape, report.output.display());
    Ok(())
}

fn cmd_load(config: &PipelineConfig, json: bool) -> CmdResult {
    eprintln!("🗄️  Loading: {}", config.processed_output.display());

    let report = load_file(config)?;
    if json {
        return print_json(&report);
    }

    eprintln!("   Database: {}", report.database.display());
    eprintln!("   Mode: {:?}", report.mode);
    eprintln!(
        "✅ {} rows written, {} rows in {}",
        report.rows_written, report.table_rows, report.table
    );
    Ok(())
}

fn cmd_run(config: &PipelineConfig, json: bool) -> CmdResult {
    let dag = Dag::trafic_ingestion();
    let run = dag.run(config)?;

    if json {
        print_json(&run)?;
    } else {
        eprintln!("🔄 {} ({})", run.dag_id, run.run_id);
        for task in &run.tasks {
            let mark = match task.state {
                TaskState::Success => "✅",
                TaskState::Failed => "❌",
                TaskState::UpstreamFailed => "⏭️ ",
            };
            eprintln!("   {} {}", mark, task.task);
        }
    }

    match run.first_error() {
        Some((task, error)) => Err(format!("{} failed: {}", task, error).into()),
        None => Ok(()),
    }
}

async fn cmd_schedule(
    config: PipelineConfig,
    max_runs: Option<usize>,
    interval_secs: Option<u64>,
    json: bool,
) -> CmdResult {
    let options = ScheduleOptions {
        max_runs,
        interval: interval_secs.map(Duration::from_secs),
    };

    let summary = run_schedule(Dag::trafic_ingestion(), config, options).await?;
    if json {
        return print_json(&summary);
    }

    eprintln!("✨ {} runs, {} failed", summary.runs, summary.failed);
    Ok(())
}

fn cmd_dag(json: bool) -> CmdResult {
    let dag = Dag::trafic_ingestion();
    if json {
        return print_json(&dag);
    }

    println!("{}: {}", dag.dag_id, dag.description);
    println!("  interval: {:?}, catchup: {}", dag.interval, dag.catchup);
    for (up, down) in &dag.edges {
        println!("  {} >> {}", up, down);
    }
    Ok(())
}

fn cmd_config(config: &PipelineConfig) -> CmdResult {
    print_json(config)
}
