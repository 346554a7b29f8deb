//! Decoded Kubernetes resource documents
//!
//! A [`Resource`] is an untyped mapping produced by the YAML decoder. Field
//! access is best-effort: a missing field or a field of the wrong type reads
//! as an empty string instead of failing.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::gvk::{GroupVersionKind, join_non_empty};

/// Why a YAML document could not be turned into a [`Resource`]
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("expected a mapping at the document root, found {found}")]
    NotAMapping { found: &'static str },
}

/// One decoded manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    // Always a `Value::Object`
    value: Value,
}

impl Resource {
    /// Decode a single YAML document.
    ///
    /// Returns `Ok(None)` for documents with no content: blank or
    /// comment-only text, an explicit `null`, or an empty mapping.
    pub fn decode(bytes: &[u8]) -> Result<Option<Self>, DecodeError> {
        if is_blank(bytes) {
            return Ok(None);
        }

        let value: Value = serde_yaml::from_slice(bytes)?;
        match value {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            Value::Object(map) => Ok(Some(Self::from_map(map))),
            other => Err(DecodeError::NotAMapping {
                found: type_name(&other),
            }),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            value: Value::Object(map),
        }
    }

    /// Wrap a JSON value, or `None` if it is not a mapping
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::from_map(map)),
            _ => None,
        }
    }

    /// The whole document as a JSON value
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    pub fn api_version(&self) -> &str {
        string_field(&self.value, "apiVersion")
    }

    pub fn kind(&self) -> &str {
        string_field(&self.value, "kind")
    }

    /// `apiVersion` and `kind` joined with `/`, empty parts omitted
    pub fn api_version_kind(&self) -> String {
        join_non_empty("/", [self.api_version(), self.kind()])
    }

    pub fn group_version_kind(&self) -> GroupVersionKind {
        GroupVersionKind::from_api_version(self.api_version(), self.kind())
    }

    /// The `metadata` mapping, if present and actually a mapping
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.value.get("metadata").and_then(Value::as_object)
    }

    pub fn name(&self) -> &str {
        self.metadata_field("name")
    }

    pub fn namespace(&self) -> &str {
        self.metadata_field("namespace")
    }

    fn metadata_field(&self, key: &str) -> &str {
        self.metadata()
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

fn string_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// True when every line is whitespace or a YAML comment
fn is_blank(bytes: &[u8]) -> bool {
    String::from_utf8_lossy(bytes).lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: some-app-envoy
  namespace: example
spec:
  ports:
    - port: 80
"#;

    #[test]
    fn test_decode_resource() {
        let resource = Resource::decode(SERVICE.as_bytes()).unwrap().unwrap();
        assert_eq!(resource.api_version(), "v1");
        assert_eq!(resource.kind(), "Service");
        assert_eq!(resource.name(), "some-app-envoy");
        assert_eq!(resource.namespace(), "example");
        assert_eq!(resource.api_version_kind(), "v1/Service");
        assert_eq!(
            resource.group_version_kind(),
            GroupVersionKind::new("", "v1", "Service")
        );
    }

    #[test]
    fn test_decode_empty_documents() {
        assert!(Resource::decode(b"").unwrap().is_none());
        assert!(Resource::decode(b"  \n\n").unwrap().is_none());
        assert!(Resource::decode(b"# just a comment\n").unwrap().is_none());
        assert!(Resource::decode(b"null").unwrap().is_none());
        assert!(Resource::decode(b"{}").unwrap().is_none());
    }

    #[test]
    fn test_decode_syntax_error() {
        let err = Resource::decode(b"apiVersion: v1\nkind: Service\n  name: x: y\n").unwrap_err();
        assert!(matches!(err, DecodeError::Yaml(_)));
    }

    #[test]
    fn test_decode_non_mapping() {
        let err = Resource::decode(b"- a\n- b\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected a mapping at the document root, found a sequence"
        );
    }

    #[test]
    fn test_missing_fields_read_as_empty() {
        let resource = Resource::decode(b"kind: Thing\n").unwrap().unwrap();
        assert_eq!(resource.api_version(), "");
        assert_eq!(resource.api_version_kind(), "Thing");
        assert_eq!(resource.name(), "");
        assert_eq!(resource.namespace(), "");
    }

    #[test]
    fn test_metadata_of_wrong_type() {
        let resource = Resource::decode(b"apiVersion: v1\nkind: Pod\nmetadata: oops\n")
            .unwrap()
            .unwrap();
        assert!(resource.metadata().is_none());
        assert_eq!(resource.name(), "");

        let resource = Resource::decode(b"apiVersion: 1\nkind: Pod\nmetadata:\n  name: 7\n")
            .unwrap()
            .unwrap();
        assert_eq!(resource.api_version(), "");
        assert_eq!(resource.name(), "");
    }
}
