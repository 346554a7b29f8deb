//! Scheriff CLI - offline Kubernetes manifest validator

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "scheriff")]
#[command(author = "Scheriff Contributors")]
#[command(version)]
#[command(about = "Validate Kubernetes manifests against OpenAPI schemas and CRDs, offline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    validate: ValidateArgs,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version information
    Version,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// File or directory with manifests to validate, `-` reads standard input
    #[arg(short = 'f', long = "filename", default_value = ".")]
    filenames: Vec<PathBuf>,

    /// Kubernetes OpenAPI v2 schema (JSON), required unless a subcommand is given
    #[arg(short, long, env = "SCHERIFF_SCHEMA")]
    schema: Option<PathBuf>,

    /// File or directory with CustomResourceDefinitions
    #[arg(short, long = "crd")]
    crds: Vec<PathBuf>,

    /// Process directories given in --filename recursively
    #[arg(short = 'R', long)]
    recursive: bool,

    /// Fail on warnings too
    #[arg(long)]
    strict: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Some(Commands::Version) => {
            commands::version::run();
            Ok(exit_codes::SUCCESS)
        }
        None => commands::validate::run(cli.validate),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::from(code)
        }
    }
}
