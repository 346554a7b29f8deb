//! Scheriff Core - offline validation of Kubernetes manifests
//!
//! This crate validates manifests against a Kubernetes OpenAPI v2 document
//! extended with the schemas of CustomResourceDefinitions, without talking
//! to a cluster:
//! - `SchemaIndex`: schemas keyed by Group/Version/Kind
//! - `openapi`: base schema loading and conversion
//! - `crd`: CRD schema extraction (v1 and v1beta1)
//! - `ResourceValidator`: per-resource and per-stream validation
//! - `Orchestrator`: the whole run, from flags to exit status

pub mod crd;
pub mod document;
pub mod error;
pub mod gvk;
pub mod openapi;
pub mod pipeline;
pub mod resource;
pub mod schema;
pub mod validate;
pub mod walk;

pub use crd::{CrdShape, ingest_crd};
pub use document::{Document, decode_documents, split_documents};
pub use error::{Result, ValidatorError};
pub use gvk::GroupVersionKind;
pub use openapi::load_base_schema;
pub use pipeline::{
    ExitStatus, FileReport, Orchestrator, RunConfig, RunOutcome, STDIN_INPUT, STDIN_NAME,
    SeverityCounts,
};
pub use resource::{DecodeError, Resource};
pub use schema::{JsonSchemaMatcher, Mismatch, Schema, SchemaIndex, SchemaMatcher};
pub use validate::{ResourceValidator, Severity, ValidationResult};
pub use walk::{is_manifest_file, walk};
