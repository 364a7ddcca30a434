//! Cache-coherence simulator CLI.
//!
//! This binary replays access traces through a bus of coherent caches. It performs:
//! 1. **Trace run:** Load a configuration, apply flag overrides, replay a trace, print statistics.
//! 2. **Defaults:** Print the built-in configuration as JSON, ready to edit and pass back with `--config`.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cohsim_core::Simulator;
use cohsim_core::common::SimError;
use cohsim_core::config::{Config, Protocol, ReplacementPolicy};
use cohsim_core::sim::trace;

#[derive(Parser, Debug)]
#[command(
    name = "cohsim",
    author,
    version,
    about = "Snooping cache-coherence simulator",
    long_about = "Replay a memory access trace through private caches kept coherent over a snooping bus.\n\nTrace lines are `<cache> <r|w> <address>`; `#` starts a comment.\nSet RUST_LOG=debug to log every access and bus message.\n\nExamples:\n  cohsim run --trace traces/pingpong.trace\n  cohsim run --trace app.trace --caches 8 --protocol mesi --check\n  cohsim defaults > cohsim.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace and print per-cache and bus statistics as CSV.
    Run {
        /// Access trace to replay.
        #[arg(short, long)]
        trace: PathBuf,

        /// JSON configuration file (see `cohsim defaults`).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of caches on the bus.
        #[arg(long)]
        caches: Option<usize>,

        /// Ways per set.
        #[arg(long)]
        assoc: Option<usize>,

        /// Sets per cache.
        #[arg(long)]
        sets: Option<usize>,

        /// Line size in bytes.
        #[arg(long)]
        line_bytes: Option<usize>,

        /// Coherence protocol.
        #[arg(long, value_enum)]
        protocol: Option<ProtocolArg>,

        /// Replacement policy.
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Check coherence invariants after every access.
        #[arg(long)]
        check: bool,
    },

    /// Print the default configuration as JSON.
    Defaults,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProtocolArg {
    Msi,
    MsiUpgr,
    Mesi,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Msi => Self::Msi,
            ProtocolArg::MsiUpgr => Self::MsiUpgr,
            ProtocolArg::Mesi => Self::Mesi,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Lru,
    Fifo,
    Plru,
    Random,
}

impl From<PolicyArg> for ReplacementPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Lru => Self::Lru,
            PolicyArg::Fifo => Self::Fifo,
            PolicyArg::Plru => Self::Plru,
            PolicyArg::Random => Self::Random,
        }
    }
}

/// Flag values that replace fields of the loaded configuration.
#[derive(Debug, Default)]
struct Overrides {
    caches: Option<usize>,
    assoc: Option<usize>,
    sets: Option<usize>,
    line_bytes: Option<usize>,
    protocol: Option<ProtocolArg>,
    policy: Option<PolicyArg>,
    check: bool,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        let cache = &mut config.cache;
        if let Some(n) = self.caches {
            cache.num_caches = n;
        }
        if let Some(n) = self.assoc {
            cache.assoc = n;
        }
        if let Some(n) = self.sets {
            cache.num_sets = n;
        }
        if let Some(n) = self.line_bytes {
            cache.line_bytes = n;
        }
        if let Some(p) = self.protocol {
            cache.protocol = p.into();
        }
        if let Some(p) = self.policy {
            cache.policy = p.into();
        }
        if self.check {
            config.general.check_invariants = true;
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Commands::Run {
            trace,
            config,
            caches,
            assoc,
            sets,
            line_bytes,
            protocol,
            policy,
            check,
        } => {
            let overrides = Overrides {
                caches,
                assoc,
                sets,
                line_bytes,
                protocol,
                policy,
                check,
            };
            if let Err(e) = cmd_run(&trace, config.as_deref(), overrides) {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
        Commands::Defaults => cmd_defaults(),
    }
}

/// Logs go to stderr so the CSV report on stdout stays machine-readable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the configuration, replays the trace and prints the report.
fn cmd_run(
    trace_path: &std::path::Path,
    config_path: Option<&std::path::Path>,
    overrides: Overrides,
) -> Result<(), SimError> {
    let mut config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    overrides.apply(&mut config);

    let mut sim = Simulator::new(config)?;
    let summary = sim.run(trace::open(trace_path)?)?;
    tracing::info!(
        accesses = summary.accesses,
        flushes = summary.flushes,
        trace = %trace_path.display(),
        "done"
    );
    sim.print_stats();
    Ok(())
}

/// Prints the built-in configuration.
fn cmd_defaults() {
    match serde_json::to_string_pretty(&Config::default()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
