//! Fatal error types
//!
//! Only schema loading and CRD ingestion fail hard. Everything found while
//! scanning manifests becomes a [`ValidationResult`](crate::ValidationResult)
//! instead of an error.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ValidatorError {
    /// The base schema bytes are not a well-formed OpenAPI v2 document
    #[error("Failed to load OpenAPI v2 schema: {message}")]
    #[diagnostic(code(scheriff::core::schema_load))]
    SchemaLoad { message: String },

    /// The v2 document could not be converted to the v3 layout
    #[error("Failed to convert OpenAPI v2 schema: {message}")]
    #[diagnostic(code(scheriff::core::schema_conversion))]
    SchemaConversion { message: String },

    /// A named schema carries a malformed `x-kubernetes-group-version-kind`
    #[error("Cannot load GroupVersionKind from schema '{schema}': {message}")]
    #[diagnostic(code(scheriff::core::schema_extension))]
    SchemaExtension { schema: String, message: String },

    #[error("Invalid CRD Kind: {kind}")]
    #[diagnostic(
        code(scheriff::core::unsupported_crd_kind),
        help("CRD sources may only contain apiextensions.k8s.io/v1 or apiextensions.k8s.io/v1beta1 CustomResourceDefinitions")
    )]
    UnsupportedCrdKind { kind: String },

    #[error("Failed to decode CustomResourceDefinition '{name}': {source}")]
    #[diagnostic(code(scheriff::core::crd_decode))]
    CrdDecode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid schema for version '{version}' of CRD '{name}': {message}")]
    #[diagnostic(code(scheriff::core::crd_schema))]
    CrdSchema {
        name: String,
        version: String,
        message: String,
    },

    /// A CRD source file contains a document that is not valid YAML
    #[error("Error parsing CRD from document {index} of {}: {message}", path.display())]
    #[diagnostic(code(scheriff::core::crd_parse))]
    CrdParse {
        path: PathBuf,
        index: usize,
        message: String,
    },

    #[error("Failed to read {}: {source}", path.display())]
    #[diagnostic(code(scheriff::core::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {}: {message}", path.display())]
    #[diagnostic(code(scheriff::core::walk))]
    Walk { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
