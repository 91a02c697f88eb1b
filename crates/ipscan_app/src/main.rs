//! `ipscan` - batch IP reputation analysis from the terminal.

mod config;
mod effects;
mod persistence;
mod render;
mod session;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use ipscan_core::{update, AppState, Msg, QuickSort, SAMPLE_ADDRESSES};
use ipscan_engine::{export_csv, export_filename, export_json, job_stem, today_stem, EngineHandle};
use ipscan_logging::{scan_error, scan_info, LogDestination};
use log::LevelFilter;

use crate::config::AppConfig;
use crate::effects::{EffectRunner, OversizePolicy};
use crate::session::{RunRequest, Session};

const EXPORT_PREFIX: &str = "ip_analysis";

#[derive(Parser)]
#[command(name = "ipscan")]
#[command(about = "Validate IP batches and run them through the analysis service", long_about = None)]
struct Cli {
    /// Config file (defaults to ./ipscan.ron when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    log: LogTarget,

    /// More log detail; repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a batch and print the canonical address list
    Parse {
        /// Address file; reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Submit a batch, follow its progress and export the results
    Analyze {
        /// Address file; reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// API key; falls back to the stored one
        #[arg(short, long)]
        key: Option<String>,

        /// Sort the results by this field
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending instead of ascending
        #[arg(long, requires = "sort")]
        desc: bool,

        /// Apply a preset ordering
        #[arg(long, value_enum, conflicts_with = "sort")]
        quick: Option<QuickArg>,

        /// Print every field of every result after the table
        #[arg(long)]
        details: bool,

        /// Print every field of the result for one address
        #[arg(long, value_name = "IP", conflicts_with = "details")]
        show: Option<String>,

        /// Write the results as CSV
        #[arg(long)]
        csv: bool,

        /// Write the results as JSON
        #[arg(long)]
        json: bool,

        /// Send oversized batches without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Print a sample batch
    Sample,
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store a key for later runs
    Set { key: String },
    /// Forget the stored key
    Clear,
    /// Show the stored key, masked unless --reveal is given
    Show {
        #[arg(long)]
        reveal: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogTarget {
    File,
    Terminal,
    Both,
}

#[derive(Clone, Copy, ValueEnum)]
enum QuickArg {
    Risk,
    Reports,
    Country,
}

impl From<QuickArg> for QuickSort {
    fn from(arg: QuickArg) -> Self {
        match arg {
            QuickArg::Risk => QuickSort::Risk,
            QuickArg::Reports => QuickSort::Reports,
            QuickArg::Country => QuickSort::Country,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let destination = match cli.log {
        LogTarget::File => LogDestination::File,
        LogTarget::Terminal => LogDestination::Terminal,
        LogTarget::Both => LogDestination::Both,
    };
    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    ipscan_logging::initialize(destination, level);

    let config = AppConfig::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Parse { input } => parse_batch(&config, input.as_ref()),
        Commands::Analyze {
            input,
            key,
            sort,
            desc,
            quick,
            details,
            show,
            csv,
            json,
            yes,
        } => analyze(
            &config,
            AnalyzeArgs {
                input,
                key,
                sort,
                desc,
                quick: quick.map(QuickSort::from),
                details,
                show,
                csv,
                json,
                yes,
            },
        ),
        Commands::Key { action } => manage_key(&config.state_dir, action),
        Commands::Sample => {
            println!("{SAMPLE_ADDRESSES}");
            Ok(())
        }
    };
    if let Err(err) = &result {
        scan_error!("{:#}", err);
    }
    result
}

fn parse_batch(config: &AppConfig, input: Option<&PathBuf>) -> anyhow::Result<()> {
    let text = session::read_input(input).context("cannot read addresses")?;
    let (state, _) = update(
        AppState::with_config(config.lifecycle()),
        Msg::InputChanged(text),
    );
    let canonical = state.batch().to_text();
    if !canonical.is_empty() {
        println!("{canonical}");
    }
    eprintln!("{}", render::batch_line(&state.view()));
    Ok(())
}

struct AnalyzeArgs {
    input: Option<PathBuf>,
    key: Option<String>,
    sort: Option<String>,
    desc: bool,
    quick: Option<QuickSort>,
    details: bool,
    show: Option<String>,
    csv: bool,
    json: bool,
    yes: bool,
}

fn analyze(config: &AppConfig, args: AnalyzeArgs) -> anyhow::Result<()> {
    let from_file = args.input.is_some();
    let text = session::read_input(args.input.as_ref()).context("cannot read addresses")?;
    let credential = args
        .key
        .or_else(|| persistence::load_credential(&config.state_dir))
        .unwrap_or_default();

    // stdin is only free for prompts when the batch came from a file.
    let interactive = from_file && io::stdin().is_terminal();
    let oversize = if args.yes {
        OversizePolicy::Accept
    } else if interactive {
        OversizePolicy::Ask
    } else {
        OversizePolicy::Decline
    };

    let engine = EngineHandle::with_settings(config.backend())?;
    let runner = EffectRunner::new(engine, config.state_dir.clone(), oversize);
    let mut session = Session::new(config.lifecycle(), runner);
    let state = session.run(RunRequest {
        input: text,
        credential,
        sort: args.sort,
        descending: args.desc,
        quick: args.quick,
        stop_on_enter: interactive,
        check_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
    });

    session::check_outcome(state)?;

    let view = state.view();
    print!("{}", render::results_table(&view));
    if args.details || args.show.is_some() {
        match render::details(&view, state.results(), args.show.as_deref()) {
            Some(text) => print!("\n{text}"),
            None => eprintln!("No result for {}", args.show.as_deref().unwrap_or_default()),
        }
    }
    if args.csv || args.json {
        export(&config.output_dir, state, args.csv, args.json)?;
    }
    Ok(())
}

fn export(dir: &Path, state: &AppState, csv: bool, json: bool) -> anyhow::Result<()> {
    let rows = state.results();
    if csv {
        let stem = state
            .results_job()
            .map(job_stem)
            .unwrap_or_else(today_stem);
        let summary = export_csv(dir, &export_filename(EXPORT_PREFIX, &stem, "csv"), rows)?;
        eprintln!(
            "Wrote {} rows to {}",
            summary.row_count,
            summary.path.display()
        );
    }
    if json {
        let filename = export_filename(EXPORT_PREFIX, &today_stem(), "json");
        let summary = export_json(dir, &filename, rows)?;
        eprintln!(
            "Wrote {} rows to {}",
            summary.row_count,
            summary.path.display()
        );
    }
    Ok(())
}

fn manage_key(state_dir: &Path, action: KeyAction) -> anyhow::Result<()> {
    match action {
        KeyAction::Set { key } => {
            if key.trim().is_empty() {
                bail!("key must not be empty");
            }
            let path = persistence::save_credential(state_dir, &key)?;
            scan_info!("API key stored");
            eprintln!("Stored key in {}", path.display());
        }
        KeyAction::Clear => {
            persistence::save_credential(state_dir, "")?;
            eprintln!("Stored key cleared");
        }
        KeyAction::Show { reveal } => match persistence::load_credential(state_dir) {
            Some(key) if reveal => println!("{key}"),
            Some(key) => println!("{}", persistence::mask(&key)),
            None => eprintln!("No key stored"),
        },
    }
    Ok(())
}
