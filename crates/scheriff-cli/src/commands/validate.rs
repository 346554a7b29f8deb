//! Validate command - validate manifests against the schema index

use scheriff_core::{Orchestrator, RunConfig};

use crate::display;
use crate::error::{CliError, Result};
use crate::exit_codes;
use crate::ValidateArgs;

fn run_config(args: ValidateArgs) -> Result<RunConfig> {
    let schema = args
        .schema
        .ok_or_else(|| CliError::usage("the --schema flag is required"))?;

    Ok(RunConfig {
        filenames: args.filenames,
        schema,
        crds: args.crds,
        recursive: args.recursive,
        strict: args.strict,
    })
}

pub fn run(args: ValidateArgs) -> Result<u8> {
    let json = args.json;
    let config = run_config(args)?;
    tracing::debug!(?config, "starting validation");

    let outcome = Orchestrator::new(config).run();
    let code = if outcome.is_success() {
        exit_codes::SUCCESS
    } else {
        exit_codes::ERROR
    };

    if json {
        display::print_json(&outcome, code)?;
    } else {
        display::print_text(&outcome);
    }

    match outcome.fatal {
        Some(fatal) => Err(fatal.into()),
        None => Ok(code),
    }
}
