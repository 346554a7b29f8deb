//! Validation orchestration
//!
//! A run goes through three stages in a fixed order:
//!
//! 1. load the base OpenAPI v2 schema
//! 2. ingest every CRD source
//! 3. validate every manifest input
//!
//! Failures in stages 1 and 2 are fatal and leave the run without results.
//! Stage 3 turns every finding into a [`ValidationResult`]; only a manifest
//! path that cannot be walked escalates the exit status on its own.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::document::decode_documents;
use crate::error::{Result, ValidatorError};
use crate::validate::{ResourceValidator, Severity, ValidationResult};
use crate::walk::{is_manifest_file, walk};

/// Manifest input that reads from standard input
pub const STDIN_INPUT: &str = "-";

/// Name under which standard input is reported
pub const STDIN_NAME: &str = "<stdin>";

/// Everything a run needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Manifest files or directories, `-` for standard input
    pub filenames: Vec<PathBuf>,
    /// OpenAPI v2 document
    pub schema: PathBuf,
    /// Files or directories holding CRDs
    pub crds: Vec<PathBuf>,
    /// Descend into sub-directories of manifest inputs
    pub recursive: bool,
    /// Treat warnings as failures
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Results of one manifest file, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub file: String,
    pub results: Vec<ValidationResult>,
}

/// Number of results per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub ok: usize,
    pub warning: usize,
    pub error: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.ok + self.warning + self.error
    }
}

/// Final state of a run
#[derive(Debug)]
pub struct RunOutcome {
    pub status: ExitStatus,
    /// Per-file results in input order
    pub files: Vec<FileReport>,
    /// Manifest inputs that could not be walked
    pub input_errors: Vec<ValidatorError>,
    /// Set when the run stopped before validating anything
    pub fatal: Option<ValidatorError>,
}

impl RunOutcome {
    fn fatal(error: ValidatorError) -> Self {
        Self {
            status: ExitStatus::Failure,
            files: Vec::new(),
            input_errors: Vec::new(),
            fatal: Some(error),
        }
    }

    /// All results, files in input order, documents in file order
    pub fn results(&self) -> impl Iterator<Item = &ValidationResult> {
        self.files.iter().flat_map(|f| f.results.iter())
    }

    pub fn counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for result in self.results() {
            match result.severity {
                Severity::Ok => counts.ok += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Error => counts.error += 1,
            }
        }
        counts
    }

    /// Highest severity seen, `None` when there are no results
    pub fn worst(&self) -> Option<Severity> {
        self.results().map(|r| r.severity).max()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Drives a run from a [`RunConfig`]
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: RunConfig,
}

impl Orchestrator {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run all stages, reading `-` inputs from the process's stdin
    pub fn run(&self) -> RunOutcome {
        self.run_with_stdin(io::stdin().lock())
    }

    /// Run all stages with an explicit reader behind `-` inputs
    pub fn run_with_stdin<R: Read>(&self, stdin: R) -> RunOutcome {
        let validator = match self.prepare() {
            Ok(validator) => validator,
            Err(e) => {
                tracing::error!(error = %e, "aborting before validation");
                return RunOutcome::fatal(e);
            }
        };

        self.validate_inputs(&validator, stdin)
    }

    /// Stages 1 and 2: build the validator and register every CRD
    pub fn prepare(&self) -> Result<ResourceValidator> {
        let schema = &self.config.schema;
        let bytes = fs::read(schema).map_err(|source| ValidatorError::Io {
            path: schema.clone(),
            source,
        })?;
        let mut validator = ResourceValidator::from_openapi_v2(&bytes)?;

        tracing::info!(
            schema = %schema.display(),
            kinds = validator.index().len(),
            "loaded base schema"
        );

        for source in &self.config.crds {
            walk(source, false, is_manifest_file, |file| {
                ingest_crd_file(&mut validator, file)
            })?;
        }

        tracing::debug!(kinds = validator.index().len(), "schema index ready");
        Ok(validator)
    }

    fn validate_inputs<R: Read>(&self, validator: &ResourceValidator, mut stdin: R) -> RunOutcome {
        let mut files = Vec::new();
        let mut input_errors = Vec::new();

        for input in &self.config.filenames {
            if input.as_os_str() == STDIN_INPUT {
                let mut bytes = Vec::new();
                match stdin.read_to_end(&mut bytes) {
                    Ok(_) => files.push(FileReport {
                        file: STDIN_NAME.to_string(),
                        results: validator.validate_stream(&bytes),
                    }),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable standard input"),
                }
                continue;
            }

            let walked = walk(input, self.config.recursive, is_manifest_file, |file| {
                match fs::read(file) {
                    Ok(bytes) => files.push(FileReport {
                        file: file.display().to_string(),
                        results: validator.validate_stream(&bytes),
                    }),
                    Err(e) => {
                        tracing::warn!(file = %file.display(), error = %e, "skipping unreadable file")
                    }
                }
                Ok(())
            });

            if let Err(e) = walked {
                tracing::warn!(input = %input.display(), error = %e, "cannot walk manifest input");
                input_errors.push(e);
            }
        }

        let mut outcome = RunOutcome {
            status: ExitStatus::Success,
            files,
            input_errors,
            fatal: None,
        };
        outcome.status = self.exit_status(&outcome);
        outcome
    }

    fn exit_status(&self, outcome: &RunOutcome) -> ExitStatus {
        let threshold = if self.config.strict {
            Severity::Warning
        } else {
            Severity::Error
        };

        let failing = !outcome.input_errors.is_empty()
            || outcome.worst().is_some_and(|worst| worst >= threshold);

        if failing {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        }
    }
}

fn ingest_crd_file(validator: &mut ResourceValidator, file: &Path) -> Result<()> {
    let bytes = fs::read(file).map_err(|source| ValidatorError::Io {
        path: file.to_path_buf(),
        source,
    })?;

    for document in decode_documents(&bytes) {
        let crd = match document.decoded {
            Ok(Some(crd)) => crd,
            Ok(None) => continue,
            Err(e) => {
                return Err(ValidatorError::CrdParse {
                    path: file.to_path_buf(),
                    index: document.index,
                    message: e.to_string(),
                });
            }
        };
        validator.add_crd_schemas(&crd)?;
    }

    tracing::debug!(file = %file.display(), "ingested CRD source");
    Ok(())
}
