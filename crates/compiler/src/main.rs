//! Cringe CLI
//!
//! Command-line interface for running `.i` programs and checking them
//! without running.

use clap::{ArgAction, CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use cringe::{LoadError, RunConfig, Severity, Sources, lint};
use cringe_core::Fault;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "cringe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run and check INTERCAL programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one or more .i files as a single program
    Run {
        /// Source files, joined in order
        files: Vec<PathBuf>,

        /// Run configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Disable random compiler bugs
        #[arg(short = 'b', long)]
        no_bugs: bool,

        /// Skip the politeness check
        #[arg(long)]
        no_politeness: bool,

        /// Seed percent chances and bug injection
        #[arg(long)]
        seed: Option<u64>,

        /// Log engine activity to stderr (-v debug, -vv trace)
        #[arg(short, long, action = ArgAction::Count)]
        verbose: u8,
    },

    /// Check .i files without running them
    Check {
        /// Source files, joined in order
        files: Vec<PathBuf>,

        /// Run configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Treat warnings as errors (exit with failure if any warnings)
        #[arg(long)]
        deny_warnings: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            files,
            config,
            no_bugs,
            no_politeness,
            seed,
            verbose,
        } => {
            init_tracing(verbose);
            let mut config = load_config(config.as_deref());
            if no_bugs {
                config.random_bugs = false;
            }
            if no_politeness {
                config.politeness = false;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            run_program(&files, &config);
        }
        Commands::Check {
            files,
            config,
            deny_warnings,
        } => {
            init_tracing(0);
            let config = load_config(config.as_deref());
            run_check(&files, &config, deny_warnings);
        }
        Commands::Completions { shell } => {
            run_completions(shell);
        }
    }
}

/// Logs go to stderr so program output on stdout stays clean.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("CRINGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "cringe", &mut io::stdout());
}

fn load_config(path: Option<&Path>) -> RunConfig {
    match path {
        Some(path) => match RunConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => RunConfig::default(),
    }
}

/// Print a fault and exit with its status.
fn fail(fault: &Fault) -> ! {
    eprintln!("{}", fault);
    if fault.is_structural() {
        eprintln!("        CORRECT SOURCE AND RESUBMIT");
    }
    process::exit(fault.exit_code());
}

fn load_sources(files: &[PathBuf]) -> Sources {
    match Sources::load(files) {
        Ok(sources) => sources,
        Err(LoadError::Fault(fault)) => fail(&fault),
        Err(LoadError::Io(msg)) => {
            eprintln!("Error: {}", msg);
            process::exit(1);
        }
    }
}

fn run_program(files: &[PathBuf], config: &RunConfig) {
    let sources = load_sources(files);
    if let Err(failure) = cringe::run_source(&sources.text(), config) {
        eprintln!("{}", failure);
        if failure.fault.is_structural() {
            eprintln!("        CORRECT SOURCE AND RESUBMIT");
        }
        process::exit(failure.exit_code());
    }
}

fn run_check(files: &[PathBuf], config: &RunConfig, deny_warnings: bool) {
    let sources = load_sources(files);
    let combined = files.first().cloned().unwrap_or_default();
    let mut diagnostics = lint::check_source(&sources.text(), &combined, config);

    // Point each diagnostic at the file its line came from
    for d in &mut diagnostics {
        if let Some((path, line)) = sources.locate(d.line + 1) {
            d.file = path.to_path_buf();
            d.line = line - 1;
        }
    }

    if diagnostics.is_empty() {
        println!("No issues found in {} file(s)", sources.files().len());
        return;
    }

    print!("{}", lint::format_diagnostics(&diagnostics));
    println!(
        "\n{} issue(s) in {} file(s)",
        diagnostics.len(),
        sources.files().len()
    );
    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);
    if has_errors || (deny_warnings && has_warnings) {
        process::exit(1);
    }
}
