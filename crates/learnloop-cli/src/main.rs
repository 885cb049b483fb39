mod cmd;
mod output;
mod root;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use learnloop_core::config::Config;
use learnloop_core::paths;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "learnloop",
    about = "Capture iteration learnings, detect recurring patterns, and plan improvements",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .learnloop/ or .git/)
    #[arg(long, global = true, env = "LEARNLOOP_ROOT")]
    root: Option<PathBuf>,

    /// Global learnings store, relative to the root
    /// (default: config `store`, else .learnloop/global-learnings.yaml)
    #[arg(long, global = true, env = "LEARNLOOP_STORE")]
    store: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge an iteration's learnings into the global store
    Merge {
        /// Path to the iteration's learnings.yaml
        #[arg(long)]
        iteration_learnings: PathBuf,

        /// Iteration identifier (e.g. plan-3-iter-2)
        #[arg(long)]
        discovered_in: String,

        /// Iteration duration in seconds
        #[arg(long)]
        duration: u64,

        /// Number of healing rounds
        #[arg(long)]
        healing_rounds: u32,

        /// Number of files modified
        #[arg(long)]
        files_modified: u32,
    },

    /// Set the lifecycle status of a pattern (IDENTIFIED, IMPLEMENTED, VERIFIED)
    Status {
        /// Pattern ID (e.g. PATTERN-001)
        pattern_id: String,

        /// New status
        status: String,

        /// Extra field to record on the pattern (repeatable)
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,

        /// Extra fields as a JSON object
        #[arg(long, value_name = "JSON")]
        metadata_json: Option<String>,
    },

    /// Rank recurring IDENTIFIED patterns by impact
    Detect {
        /// Minimum occurrences (default: config, else 2)
        #[arg(long)]
        min_occurrences: Option<u32>,

        /// Minimum severity: critical | medium | low (default: config, else medium)
        #[arg(long)]
        min_severity: Option<String>,

        /// Write the report here instead of stdout ("-" for stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate an improvement vision document from a pattern
    Vision {
        /// Pattern JSON file (e.g. one entry of a detect report)
        #[arg(long, conflicts_with = "pattern", required_unless_present = "pattern")]
        pattern_json: Option<PathBuf>,

        /// Pattern ID to load from the store
        #[arg(long)]
        pattern: Option<String>,

        /// Plan ID for the improvement (e.g. plan-6)
        #[arg(long)]
        plan_id: String,

        /// Vision template (default: config, else built-in)
        #[arg(long)]
        template: Option<PathBuf>,

        /// Output path for the generated vision
        #[arg(long)]
        output: PathBuf,
    },

    /// List stored patterns
    List {
        /// Only patterns with this status
        #[arg(long)]
        status: Option<String>,
    },

    /// Show a single pattern
    Show {
        /// Pattern ID (e.g. PATTERN-001)
        pattern_id: String,
    },

    /// Inspect the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let root = root::resolve_root(cli.root.as_deref());
    let config = Config::load(&root).context("failed to load config")?;
    let store = match &cli.store {
        Some(p) => paths::resolve(&root, p),
        None => config.store_path(&root),
    };
    tracing::debug!(root = %root.display(), store = %store.display(), "resolved paths");

    let ctx = cmd::Context {
        root,
        config,
        store,
        json: cli.json,
    };

    match cli.command {
        Commands::Merge {
            iteration_learnings,
            discovered_in,
            duration,
            healing_rounds,
            files_modified,
        } => cmd::merge::run(
            &ctx,
            &iteration_learnings,
            learnloop_core::store::Provenance {
                discovered_in,
                duration_seconds: duration,
                healing_rounds,
                files_modified,
            },
        ),
        Commands::Status {
            pattern_id,
            status,
            meta,
            metadata_json,
        } => cmd::status::run(&ctx, &pattern_id, &status, &meta, metadata_json.as_deref()),
        Commands::Detect {
            min_occurrences,
            min_severity,
            output,
        } => cmd::detect::run(&ctx, min_occurrences, min_severity.as_deref(), output.as_deref()),
        Commands::Vision {
            pattern_json,
            pattern,
            plan_id,
            template,
            output,
        } => cmd::vision::run(
            &ctx,
            cmd::vision::PatternSource::from_args(pattern_json, pattern)?,
            &plan_id,
            template.as_deref(),
            &output,
        ),
        Commands::List { status } => cmd::pattern::list(&ctx, status.as_deref()),
        Commands::Show { pattern_id } => cmd::pattern::show(&ctx, &pattern_id),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    }
}
