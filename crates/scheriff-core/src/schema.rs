//! Structural schemas and the GVK-keyed schema index
//!
//! A [`Schema`] is either a named definition from the base OpenAPI document
//! (which may `$ref` other definitions) or a self-contained schema taken
//! from a CRD. Matching a document against a schema is the job of a
//! [`SchemaMatcher`]; the default [`JsonSchemaMatcher`] is backed by the
//! `jsonschema` crate.

use jsonschema::error::ValidationErrorKind;
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::gvk::GroupVersionKind;

/// Prefix of every internal reference in the converted (v3 layout) document
pub const COMPONENTS_REF_PREFIX: &str = "#/components/schemas/";

/// Named definitions a base schema may reference
pub type Definitions = BTreeMap<String, Value>;

/// A structural schema for one resource kind
pub struct Schema {
    root: Value,
    definitions: Arc<Definitions>,
    compiled: OnceCell<Result<jsonschema::Validator, String>>,
}

impl Schema {
    /// A self-contained schema with no external references
    pub fn new(root: Value) -> Self {
        Self::with_definitions(root, Arc::new(Definitions::new()))
    }

    /// A schema whose `#/components/schemas/...` references resolve
    /// against `definitions`
    pub fn with_definitions(root: Value, definitions: Arc<Definitions>) -> Self {
        Self {
            root,
            definitions,
            compiled: OnceCell::new(),
        }
    }

    /// An object schema with no constraints beyond being a mapping
    pub fn any_object() -> Self {
        Self::new(serde_json::json!({ "type": "object" }))
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// Names of the definitions reachable from the root through `$ref`
    pub fn referenced_definitions(&self) -> BTreeSet<String> {
        let mut reachable = BTreeSet::new();
        let mut pending = Vec::new();
        collect_refs(&self.root, &mut pending);

        while let Some(name) = pending.pop() {
            if reachable.contains(&name) {
                continue;
            }
            if let Some(definition) = self.definitions.get(&name) {
                collect_refs(definition, &mut pending);
                reachable.insert(name);
            }
        }

        reachable
    }

    /// The JSON Schema document handed to the matcher.
    ///
    /// Reachable definitions are bundled under `components/schemas` so the
    /// root's references resolve inside a single document, and OpenAPI
    /// `nullable` is rewritten into plain JSON Schema.
    pub fn to_json_schema(&self) -> Value {
        let mut root = self.root.clone();
        rewrite_nullable(&mut root);

        let reachable = self.referenced_definitions();
        if reachable.is_empty() {
            return root;
        }

        let mut bundled = Map::new();
        for name in reachable {
            if let Some(definition) = self.definitions.get(&name) {
                let mut definition = definition.clone();
                rewrite_nullable(&mut definition);
                bundled.insert(name, definition);
            }
        }

        serde_json::json!({
            "allOf": [root],
            "components": { "schemas": bundled },
        })
    }

    /// Compile once and reuse for every document of this kind
    fn compiled(&self) -> Result<&jsonschema::Validator, &str> {
        self.compiled
            .get_or_init(|| {
                let mut options = jsonschema::options();
                // OpenAPI schemas follow draft 4 (boolean exclusiveMinimum etc.)
                options.with_draft(jsonschema::Draft::Draft4);
                options
                    .build(&self.to_json_schema())
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(String::as_str)
    }
}

impl Clone for Schema {
    fn clone(&self) -> Self {
        Self::with_definitions(self.root.clone(), Arc::clone(&self.definitions))
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.definitions == other.definitions
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("root", &self.root)
            .field("definitions", &self.definitions.len())
            .finish()
    }
}

/// Extract the definition name from a `#/components/schemas/<name>` reference
pub fn component_ref_name(reference: &str) -> Option<String> {
    reference
        .strip_prefix(COMPONENTS_REF_PREFIX)
        .map(|pointer| pointer.replace("~1", "/").replace("~0", "~"))
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$ref", Value::String(reference)) => {
                        if let Some(name) = component_ref_name(reference) {
                            out.push(name);
                        }
                    }
                    _ => collect_refs(child, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, out)),
        _ => {}
    }
}

/// Keywords whose values are instance data, not schemas
const DATA_KEYWORDS: &[&str] = &["enum", "default", "example", "const"];

/// Keywords whose values map arbitrary names to schemas
const SCHEMA_MAP_KEYWORDS: &[&str] = &["properties", "patternProperties", "definitions"];

/// Turn `{"type": T, "nullable": true}` into `{"type": [T, "null"]}`
fn rewrite_nullable(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("nullable") == Some(&Value::Bool(true)) {
                if let Some(Value::String(type_)) = map.get("type") {
                    let types = vec![Value::String(type_.clone()), Value::from("null")];
                    map.insert("type".into(), Value::Array(types));
                }
                if let Some(Value::Array(allowed)) = map.get_mut("enum") {
                    if !allowed.contains(&Value::Null) {
                        allowed.push(Value::Null);
                    }
                }
            }
            for (key, child) in map.iter_mut() {
                let key = key.as_str();
                if DATA_KEYWORDS.contains(&key) {
                    continue;
                }
                match child {
                    Value::Object(schemas) if SCHEMA_MAP_KEYWORDS.contains(&key) => {
                        schemas.values_mut().for_each(rewrite_nullable);
                    }
                    _ => rewrite_nullable(child),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(rewrite_nullable),
        _ => {}
    }
}

/// Schemas indexed by the kind they describe.
///
/// Inserting an existing key replaces the previous schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaIndex {
    schemas: BTreeMap<GroupVersionKind, Schema>,
}

impl SchemaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` for `gvk`, returning the schema it replaced
    pub fn insert(&mut self, gvk: GroupVersionKind, schema: Schema) -> Option<Schema> {
        self.schemas.insert(gvk, schema)
    }

    pub fn get(&self, gvk: &GroupVersionKind) -> Option<&Schema> {
        self.schemas.get(gvk)
    }

    pub fn contains(&self, gvk: &GroupVersionKind) -> bool {
        self.schemas.contains_key(gvk)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered kinds in sorted order
    pub fn kinds(&self) -> impl Iterator<Item = &GroupVersionKind> {
        self.schemas.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupVersionKind, &Schema)> {
        self.schemas.iter()
    }
}

/// A document failed to satisfy its schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch(pub String);

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structural conformance check of a document against a schema.
///
/// Diagnostics must be deterministic for the same schema and document.
pub trait SchemaMatcher {
    fn check(&self, schema: &Schema, document: &Value) -> Result<(), Mismatch>;
}

/// [`SchemaMatcher`] backed by the `jsonschema` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaMatcher;

impl SchemaMatcher for JsonSchemaMatcher {
    fn check(&self, schema: &Schema, document: &Value) -> Result<(), Mismatch> {
        let validator = schema
            .compiled()
            .map_err(|e| Mismatch(format!("Invalid schema: {}", e)))?;

        let errors: Vec<String> = validator
            .iter_errors(document)
            .map(|e| format_validation_error(&e))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Mismatch(errors.join("; ")))
        }
    }
}

/// Format a validation error as `Error at "<path>": <message>`
fn format_validation_error(error: &jsonschema::ValidationError) -> String {
    let path = error.instance_path.to_string();

    if let ValidationErrorKind::Required { property } = &error.kind {
        if let Some(property) = property.as_str() {
            return format!("Error at \"{}/{}\":Property '{}' is missing", path, property, property);
        }
    }

    let path = if path.is_empty() { "/".to_string() } else { path };
    format!("Error at \"{}\":{}", path, error.to_string().replace('"', "'"))
}
