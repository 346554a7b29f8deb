//! Per-resource validation
//!
//! Findings are plain [`ValidationResult`] values, never errors: an unknown
//! kind is a warning, a schema mismatch or an unparseable document is an
//! error result, and processing always continues.

use serde::Serialize;
use std::fmt;

use crate::crd::ingest_crd;
use crate::document::decode_documents;
use crate::error::Result;
use crate::gvk::GroupVersionKind;
use crate::openapi::load_base_schema;
use crate::resource::{DecodeError, Resource};
use crate::schema::{JsonSchemaMatcher, SchemaIndex, SchemaMatcher};

/// Severity of a validation result, ordered `Ok < Warning < Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Diagnostic, or `"valid"`
    pub message: String,
    pub severity: Severity,
    pub name: String,
    pub namespace: String,
    /// `apiVersion/kind` of the resource
    pub kind: String,
}

impl ValidationResult {
    fn for_resource(resource: &Resource, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            name: resource.name().to_string(),
            namespace: resource.namespace().to_string(),
            kind: resource.api_version_kind(),
        }
    }

    /// A document that could not be decoded at all
    pub fn parse_error(index: usize, error: &DecodeError) -> Self {
        Self {
            message: format!("Error parsing k8s resource from document {}: {}", index, error),
            severity: Severity::Error,
            name: String::new(),
            namespace: String::new(),
            kind: String::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }
}

/// Validates resources against a [`SchemaIndex`].
///
/// The index is only writable through `&mut self` (CRD ingestion), so it
/// is frozen for as long as validation borrows it.
#[derive(Debug, Clone)]
pub struct ResourceValidator<M = JsonSchemaMatcher> {
    index: SchemaIndex,
    matcher: M,
}

impl ResourceValidator<JsonSchemaMatcher> {
    /// Build a validator from the raw bytes of an OpenAPI v2 document
    pub fn from_openapi_v2(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(load_base_schema(bytes)?))
    }

    pub fn new(index: SchemaIndex) -> Self {
        Self::with_matcher(index, JsonSchemaMatcher)
    }
}

impl<M: SchemaMatcher> ResourceValidator<M> {
    pub fn with_matcher(index: SchemaIndex, matcher: M) -> Self {
        Self { index, matcher }
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    /// Register the schemas of a CRD document, replacing existing entries
    pub fn add_crd_schemas(&mut self, crd: &Resource) -> Result<Vec<GroupVersionKind>> {
        ingest_crd(crd, &mut self.index)
    }

    /// Classify one resource
    pub fn validate(&self, resource: &Resource) -> ValidationResult {
        let gvk = resource.group_version_kind();

        let Some(schema) = self.index.get(&gvk) else {
            return ValidationResult::for_resource(
                resource,
                Severity::Warning,
                format!("Kind '{}' not found in schema", resource.api_version_kind()),
            );
        };

        match self.matcher.check(schema, resource.as_value()) {
            Ok(()) => ValidationResult::for_resource(resource, Severity::Ok, "valid"),
            Err(mismatch) => ValidationResult::for_resource(resource, Severity::Error, mismatch.0),
        }
    }

    /// Validate every document of a multi-document YAML stream, in order
    pub fn validate_stream(&self, bytes: &[u8]) -> Vec<ValidationResult> {
        decode_documents(bytes)
            .filter_map(|doc| match doc.decoded {
                Ok(Some(resource)) => Some(self.validate(&resource)),
                Ok(None) => None,
                Err(e) => Some(ValidationResult::parse_error(doc.index, &e)),
            })
            .collect()
    }
}
