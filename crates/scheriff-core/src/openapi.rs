//! Base schema loading from a Kubernetes OpenAPI v2 (Swagger) document
//!
//! Loading runs in four steps:
//!
//! ```text
//! bytes ──► SwaggerV2 ──► OpenApiV3 ──► IntOrString fix-up ──► SchemaIndex
//!          (decode)      (convert)     (+ reference check)    (GVK extension)
//! ```
//!
//! Every named definition that carries `x-kubernetes-group-version-kind`
//! becomes one index entry per listed kind. Definitions without it are
//! shared building blocks reachable through `$ref` only.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Result, ValidatorError};
use crate::gvk::GroupVersionKind;
use crate::schema::{COMPONENTS_REF_PREFIX, Definitions, Schema, SchemaIndex, component_ref_name};

/// Name of the definition Kubernetes declares as string-only
pub const INT_OR_STRING: &str = "io.k8s.apimachinery.pkg.util.intstr.IntOrString";

/// Extension listing the kinds a definition describes
pub const GVK_EXTENSION: &str = "x-kubernetes-group-version-kind";

/// v2 reference prefixes and their v3 replacements
const REF_PREFIXES: [(&str, &str); 3] = [
    ("#/definitions/", COMPONENTS_REF_PREFIX),
    ("#/parameters/", "#/components/parameters/"),
    ("#/responses/", "#/components/responses/"),
];

/// An OpenAPI v2 document, as published by the Kubernetes API server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwaggerV2 {
    pub swagger: String,
    pub info: Map<String, Value>,
    #[serde(default)]
    pub paths: BTreeMap<String, Value>,
    #[serde(default)]
    pub definitions: BTreeMap<String, Value>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub responses: BTreeMap<String, Value>,
}

impl SwaggerV2 {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let doc: Self = serde_json::from_slice(bytes).map_err(|e| ValidatorError::SchemaLoad {
            message: e.to_string(),
        })?;

        if !doc.swagger.starts_with("2.") {
            return Err(ValidatorError::SchemaLoad {
                message: format!("unsupported swagger version '{}', expected 2.0", doc.swagger),
            });
        }

        Ok(doc)
    }

    /// Move definitions, parameters and responses under `components`,
    /// rewriting every local reference to the new location
    pub fn into_v3(self) -> Result<OpenApiV3> {
        let convert = |entries: BTreeMap<String, Value>| -> Result<BTreeMap<String, Value>> {
            entries
                .into_iter()
                .map(|(name, mut value)| {
                    convert_value(&mut value)?;
                    Ok((name, value))
                })
                .collect()
        };

        let paths = convert(self.paths)?;
        let components = Components {
            schemas: convert(self.definitions)?,
            parameters: convert(self.parameters)?,
            responses: convert(self.responses)?,
        };

        Ok(OpenApiV3 {
            openapi: "3.0.0".to_string(),
            info: self.info,
            paths,
            components,
        })
    }
}

/// The v3 layout the index is built from
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiV3 {
    pub openapi: String,
    pub info: Map<String, Value>,
    pub paths: BTreeMap<String, Value>,
    pub components: Components,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Components {
    pub schemas: Definitions,
    pub parameters: BTreeMap<String, Value>,
    pub responses: BTreeMap<String, Value>,
}

impl OpenApiV3 {
    /// Replace the `IntOrString` definition with "string or int32".
    ///
    /// Upstream specs declare it as a plain string even though the API
    /// server accepts both forms.
    pub fn fix_int_or_string(&mut self) {
        self.components.schemas.insert(
            INT_OR_STRING.to_string(),
            serde_json::json!({
                "oneOf": [
                    { "type": "string" },
                    { "type": "integer", "format": "int32" }
                ]
            }),
        );
    }

    /// Check that every schema reference points at an existing definition
    pub fn resolve_refs(&self) -> Result<()> {
        for (name, schema) in &self.components.schemas {
            let mut refs = Vec::new();
            collect_schema_refs(schema, &mut refs);

            if let Some(missing) = refs
                .iter()
                .find(|target| !self.components.schemas.contains_key(*target))
            {
                return Err(ValidatorError::SchemaConversion {
                    message: format!(
                        "definition '{}' references missing definition '{}'",
                        name, missing
                    ),
                });
            }
        }
        Ok(())
    }

    /// Index every definition by the kinds its GVK extension lists
    pub fn build_index(self) -> Result<SchemaIndex> {
        let definitions = Arc::new(self.components.schemas);
        let mut index = SchemaIndex::new();

        for (name, schema) in definitions.iter() {
            for gvk in group_version_kinds(name, schema)? {
                index.insert(
                    gvk,
                    Schema::with_definitions(schema.clone(), Arc::clone(&definitions)),
                );
            }
        }

        Ok(index)
    }
}

/// Build the schema index from the raw bytes of an OpenAPI v2 document
pub fn load_base_schema(bytes: &[u8]) -> Result<SchemaIndex> {
    let swagger = SwaggerV2::from_slice(bytes)?;
    tracing::debug!(
        definitions = swagger.definitions.len(),
        "decoded OpenAPI v2 document"
    );

    let mut openapi = swagger.into_v3()?;
    openapi.fix_int_or_string();
    openapi.resolve_refs()?;

    let index = openapi.build_index()?;
    tracing::debug!(kinds = index.len(), "built schema index");
    Ok(index)
}

/// Read the GVK extension of a definition
fn group_version_kinds(name: &str, schema: &Value) -> Result<Vec<GroupVersionKind>> {
    match schema.get(GVK_EXTENSION) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(extension) => serde_json::from_value(extension.clone()).map_err(|e| {
            ValidatorError::SchemaExtension {
                schema: name.to_string(),
                message: e.to_string(),
            }
        }),
    }
}

/// Rewrite references and v2-only keywords in place
fn convert_value(value: &mut Value) -> Result<()> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get_mut("$ref") {
                *reference = convert_ref(reference)?;
            }
            if let Some(nullable) = map.remove("x-nullable") {
                map.insert("nullable".into(), nullable);
            }
            for child in map.values_mut() {
                convert_value(child)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                convert_value(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn convert_ref(reference: &str) -> Result<String> {
    REF_PREFIXES
        .iter()
        .find_map(|(v2, v3)| {
            reference
                .strip_prefix(v2)
                .map(|rest| format!("{}{}", v3, rest))
        })
        .ok_or_else(|| ValidatorError::SchemaConversion {
            message: format!("unsupported reference '{}'", reference),
        })
}

fn collect_schema_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$ref", Value::String(reference)) => {
                        if let Some(name) = component_ref_name(reference) {
                            out.push(name);
                        }
                    }
                    _ => collect_schema_refs(child, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_schema_refs(item, out)),
        _ => {}
    }
}
