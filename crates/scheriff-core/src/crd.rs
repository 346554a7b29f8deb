//! CustomResourceDefinition schema extraction
//!
//! A CRD document contributes one schema per declared version, keyed by
//! `(spec.group, version.name, spec.names.kind)`. Two API shapes are
//! supported and resolved once per document into a [`CrdShape`]:
//!
//! - **`apiextensions.k8s.io/v1`**: each version must carry its own
//!   `schema.openAPIV3Schema`.
//! - **`apiextensions.k8s.io/v1beta1`**: versions may carry a schema; those
//!   that don't fall back to `spec.validation.openAPIV3Schema`, or to an
//!   object schema that accepts anything when that is absent too.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, ValidatorError};
use crate::gvk::GroupVersionKind;
use crate::resource::Resource;
use crate::schema::{Schema, SchemaIndex};

pub const CRD_GROUP: &str = "apiextensions.k8s.io";
pub const CRD_KIND: &str = "CustomResourceDefinition";

/// Resource metadata, only the name is needed for diagnostics
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrdMetadata {
    #[serde(default)]
    pub name: String,
}

/// CRD naming information
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdNames {
    /// Kind (e.g., "Certificate")
    pub kind: String,
    #[serde(default)]
    pub plural: String,
    #[serde(default)]
    pub singular: Option<String>,
    #[serde(default)]
    pub list_kind: Option<String>,
}

/// Wrapper around an embedded OpenAPI v3 schema
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomResourceValidation {
    #[serde(rename = "openAPIV3Schema", default)]
    pub open_api_v3_schema: Option<Value>,
}

/// A single API version of a CRD
#[derive(Debug, Clone, Deserialize)]
pub struct CrdVersion {
    /// Version name (e.g., "v1", "v1beta1", "v1alpha1")
    pub name: String,
    #[serde(default)]
    pub served: bool,
    #[serde(default)]
    pub storage: bool,
    #[serde(default)]
    pub schema: Option<CustomResourceValidation>,
}

impl CrdVersion {
    fn open_api_v3_schema(&self) -> Option<&Value> {
        self.schema.as_ref()?.open_api_v3_schema.as_ref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrdV1Spec {
    pub group: String,
    pub names: CrdNames,
    pub versions: Vec<CrdVersion>,
}

/// `apiextensions.k8s.io/v1` CustomResourceDefinition
#[derive(Debug, Clone, Deserialize)]
pub struct CrdV1 {
    #[serde(default)]
    pub metadata: CrdMetadata,
    pub spec: CrdV1Spec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrdV1Beta1Spec {
    pub group: String,
    pub names: CrdNames,
    /// Single-version form predating `versions`
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub versions: Vec<CrdVersion>,
    #[serde(default)]
    pub validation: Option<CustomResourceValidation>,
}

/// `apiextensions.k8s.io/v1beta1` CustomResourceDefinition
#[derive(Debug, Clone, Deserialize)]
pub struct CrdV1Beta1 {
    #[serde(default)]
    pub metadata: CrdMetadata,
    pub spec: CrdV1Beta1Spec,
}

impl CrdV1Beta1 {
    /// Declared versions, treating a lone `spec.version` as one entry
    fn declared_versions(&self) -> Vec<CrdVersion> {
        match (&self.spec.version, self.spec.versions.is_empty()) {
            (Some(name), true) => vec![CrdVersion {
                name: name.clone(),
                served: true,
                storage: true,
                schema: None,
            }],
            _ => self.spec.versions.clone(),
        }
    }
}

/// A CRD document resolved to one of the supported API shapes
#[derive(Debug, Clone)]
pub enum CrdShape {
    Current(CrdV1),
    Legacy(CrdV1Beta1),
}

impl CrdShape {
    /// Dispatch on the document's own apiVersion/kind and decode it
    pub fn resolve(resource: &Resource) -> Result<Self> {
        let gvk = resource.group_version_kind();
        if gvk.group != CRD_GROUP || gvk.kind != CRD_KIND {
            return Err(unsupported(resource));
        }

        match gvk.version.as_str() {
            "v1" => decode(resource).map(Self::Current),
            "v1beta1" => decode(resource).map(Self::Legacy),
            _ => Err(unsupported(resource)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Current(crd) => &crd.metadata.name,
            Self::Legacy(crd) => &crd.metadata.name,
        }
    }

    /// One `(kind, schema)` pair per declared version.
    ///
    /// Fails without producing anything if any version's schema is unusable.
    pub fn schemas(&self) -> Result<Vec<(GroupVersionKind, Schema)>> {
        match self {
            Self::Current(crd) => crd
                .spec
                .versions
                .iter()
                .map(|version| {
                    let schema = version.open_api_v3_schema().ok_or_else(|| {
                        schema_error(self.name(), &version.name, "missing schema.openAPIV3Schema")
                    })?;
                    let schema = to_schema(self.name(), &version.name, schema)?;
                    Ok((gvk(&crd.spec.group, version, &crd.spec.names), schema))
                })
                .collect(),

            Self::Legacy(crd) => {
                let default_schema = match crd
                    .spec
                    .validation
                    .as_ref()
                    .and_then(|v| v.open_api_v3_schema.as_ref())
                {
                    Some(schema) => to_schema(self.name(), "spec.validation", schema)?,
                    None => Schema::any_object(),
                };

                crd.declared_versions()
                    .iter()
                    .map(|version| {
                        let schema = match version.open_api_v3_schema() {
                            Some(schema) => to_schema(self.name(), &version.name, schema)?,
                            None => default_schema.clone(),
                        };
                        Ok((gvk(&crd.spec.group, version, &crd.spec.names), schema))
                    })
                    .collect()
            }
        }
    }
}

/// Register every version of a CRD document in `index`.
///
/// Existing entries for the same kinds are replaced. Returns the kinds
/// registered, in declaration order.
pub fn ingest_crd(resource: &Resource, index: &mut SchemaIndex) -> Result<Vec<GroupVersionKind>> {
    let shape = CrdShape::resolve(resource)?;
    let schemas = shape.schemas()?;

    let mut registered = Vec::with_capacity(schemas.len());
    for (gvk, schema) in schemas {
        if index.insert(gvk.clone(), schema).is_some() {
            tracing::debug!(kind = %gvk, crd = shape.name(), "replaced existing schema");
        } else {
            tracing::debug!(kind = %gvk, crd = shape.name(), "registered schema");
        }
        registered.push(gvk);
    }

    Ok(registered)
}

fn decode<T: serde::de::DeserializeOwned>(resource: &Resource) -> Result<T> {
    serde_json::from_value(resource.as_value().clone()).map_err(|source| ValidatorError::CrdDecode {
        name: resource.name().to_string(),
        source,
    })
}

fn unsupported(resource: &Resource) -> ValidatorError {
    ValidatorError::UnsupportedCrdKind {
        kind: resource.api_version_kind(),
    }
}

fn gvk(group: &str, version: &CrdVersion, names: &CrdNames) -> GroupVersionKind {
    GroupVersionKind::new(group, version.name.as_str(), names.kind.as_str())
}

fn to_schema(crd: &str, version: &str, value: &Value) -> Result<Schema> {
    if !value.is_object() {
        return Err(schema_error(crd, version, "openAPIV3Schema must be a mapping"));
    }
    Ok(Schema::new(value.clone()))
}

fn schema_error(crd: &str, version: &str, message: &str) -> ValidatorError {
    ValidatorError::CrdSchema {
        name: crd.to_string(),
        version: version.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{JsonSchemaMatcher, SchemaMatcher};
    use serde_json::json;

    fn resource(yaml: &str) -> Resource {
        Resource::decode(yaml.as_bytes()).unwrap().unwrap()
    }

    const CRONTAB_V1: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: crontabs.stable.example.com
spec:
  group: stable.example.com
  scope: Namespaced
  names:
    plural: crontabs
    singular: crontab
    kind: CronTab
    shortNames:
      - ct
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              required: [cronSpec]
              properties:
                cronSpec:
                  type: string
                image:
                  type: string
                replicas:
                  type: integer
    - name: v1beta1
      served: true
      storage: false
      schema:
        openAPIV3Schema:
          type: object
"#;

    const CERTIFICATE_V1BETA1: &str = r#"
apiVersion: apiextensions.k8s.io/v1beta1
kind: CustomResourceDefinition
metadata:
  name: certificates.cert-manager.io
spec:
  group: cert-manager.io
  names:
    kind: Certificate
    plural: certificates
  validation:
    openAPIV3Schema:
      type: object
      required: [spec]
      properties:
        spec:
          type: object
          required: [secretName]
          properties:
            secretName:
              type: string
  versions:
    - name: v1alpha2
      served: true
      storage: true
    - name: v1alpha3
      served: true
      storage: false
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
"#;

    const WITHOUT_SCHEMAS: &str = r#"
apiVersion: apiextensions.k8s.io/v1beta1
kind: CustomResourceDefinition
metadata:
  name: crontabs.stable.example.com
spec:
  group: stable.example.com
  names:
    kind: CronTab
    plural: crontabs
  versions:
    - name: v1
      served: true
      storage: true
"#;

    #[test]
    fn test_current_shape_registers_each_version() {
        let mut index = SchemaIndex::new();
        let kinds = ingest_crd(&resource(CRONTAB_V1), &mut index).unwrap();

        assert_eq!(
            kinds,
            vec![
                GroupVersionKind::new("stable.example.com", "v1", "CronTab"),
                GroupVersionKind::new("stable.example.com", "v1beta1", "CronTab"),
            ]
        );
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_current_shape_schema_is_stored_verbatim() {
        let crd = resource(CRONTAB_V1);
        let mut index = SchemaIndex::new();
        ingest_crd(&crd, &mut index).unwrap();

        let expected = &crd.as_value()["spec"]["versions"][0]["schema"]["openAPIV3Schema"];
        let stored = index
            .get(&GroupVersionKind::new("stable.example.com", "v1", "CronTab"))
            .unwrap();
        assert_eq!(stored.root(), expected);
    }

    #[test]
    fn test_current_shape_round_trip_validation() {
        let mut index = SchemaIndex::new();
        ingest_crd(&resource(CRONTAB_V1), &mut index).unwrap();
        let schema = index
            .get(&GroupVersionKind::new("stable.example.com", "v1", "CronTab"))
            .unwrap();

        let valid = json!({ "spec": { "cronSpec": "* * * * */5", "image": "my-cron-image" } });
        assert!(JsonSchemaMatcher.check(schema, &valid).is_ok());

        let invalid = json!({ "spec": { "image": "my-cron-image" } });
        assert!(JsonSchemaMatcher.check(schema, &invalid).is_err());
    }

    #[test]
    fn test_current_shape_requires_schema_per_version() {
        let yaml = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: things.example.io
spec:
  group: example.io
  names:
    kind: Thing
    plural: things
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
    - name: v2
      served: true
      storage: false
"#;
        let mut index = SchemaIndex::new();
        let err = ingest_crd(&resource(yaml), &mut index).unwrap_err();

        match err {
            ValidatorError::CrdSchema { name, version, .. } => {
                assert_eq!(name, "things.example.io");
                assert_eq!(version, "v2");
            }
            other => panic!("expected CrdSchema, got {other:?}"),
        }
        // nothing registered, not even v1
        assert!(index.is_empty());
    }

    #[test]
    fn test_non_mapping_schema_is_schema_error() {
        let yaml = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: things.example.io
spec:
  group: example.io
  names:
    kind: Thing
  versions:
    - name: v1
      schema:
        openAPIV3Schema: "not a schema"
"#;
        let mut index = SchemaIndex::new();
        let err = ingest_crd(&resource(yaml), &mut index).unwrap_err();
        assert!(matches!(err, ValidatorError::CrdSchema { .. }));
    }

    #[test]
    fn test_legacy_shape_falls_back_to_validation_schema() {
        let crd = resource(CERTIFICATE_V1BETA1);
        let mut index = SchemaIndex::new();
        ingest_crd(&crd, &mut index).unwrap();

        let v1alpha2 = index
            .get(&GroupVersionKind::new("cert-manager.io", "v1alpha2", "Certificate"))
            .unwrap();
        assert_eq!(
            v1alpha2.root(),
            &crd.as_value()["spec"]["validation"]["openAPIV3Schema"]
        );

        let v1alpha3 = index
            .get(&GroupVersionKind::new("cert-manager.io", "v1alpha3", "Certificate"))
            .unwrap();
        assert_eq!(
            v1alpha3.root(),
            &json!({ "type": "object", "properties": { "spec": { "type": "object" } } })
        );
    }

    #[test]
    fn test_legacy_shape_without_schemas_accepts_anything() {
        let mut index = SchemaIndex::new();
        ingest_crd(&resource(WITHOUT_SCHEMAS), &mut index).unwrap();

        let schema = index
            .get(&GroupVersionKind::new("stable.example.com", "v1", "CronTab"))
            .unwrap();
        assert_eq!(schema, &Schema::any_object());
        assert!(JsonSchemaMatcher.check(schema, &json!({})).is_ok());
    }

    #[test]
    fn test_legacy_single_version_field() {
        let yaml = r#"
apiVersion: apiextensions.k8s.io/v1beta1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.io
spec:
  group: example.io
  version: v1alpha1
  names:
    kind: Widget
"#;
        let mut index = SchemaIndex::new();
        let kinds = ingest_crd(&resource(yaml), &mut index).unwrap();
        assert_eq!(kinds, vec![GroupVersionKind::new("example.io", "v1alpha1", "Widget")]);
    }

    #[test]
    fn test_ingestion_is_idempotent() {
        let crd = resource(CERTIFICATE_V1BETA1);

        let mut once = SchemaIndex::new();
        ingest_crd(&crd, &mut once).unwrap();

        let mut twice = SchemaIndex::new();
        ingest_crd(&crd, &mut twice).unwrap();
        ingest_crd(&crd, &mut twice).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_later_registration_replaces_earlier() {
        let mut index = SchemaIndex::new();
        ingest_crd(&resource(WITHOUT_SCHEMAS), &mut index).unwrap();
        ingest_crd(&resource(CRONTAB_V1), &mut index).unwrap();

        let schema = index
            .get(&GroupVersionKind::new("stable.example.com", "v1", "CronTab"))
            .unwrap();
        assert_ne!(schema, &Schema::any_object());
    }

    #[test]
    fn test_unsupported_kind() {
        let yaml = r#"
apiVersion: apiextensions.k8s.io/v2
kind: CustomResourceDefinition
metadata:
  name: x
"#;
        let mut index = SchemaIndex::new();
        let err = ingest_crd(&resource(yaml), &mut index).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid CRD Kind: apiextensions.k8s.io/v2/CustomResourceDefinition"
        );

        let err = ingest_crd(&resource("apiVersion: v1\nkind: ConfigMap\n"), &mut index).unwrap_err();
        assert!(matches!(err, ValidatorError::UnsupportedCrdKind { .. }));
    }

    #[test]
    fn test_missing_required_fields_is_decode_error() {
        let yaml = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: broken.example.io
spec:
  names:
    kind: Broken
  versions: []
"#;
        let mut index = SchemaIndex::new();
        let err = ingest_crd(&resource(yaml), &mut index).unwrap_err();
        match err {
            ValidatorError::CrdDecode { name, source } => {
                assert_eq!(name, "broken.example.io");
                assert!(source.to_string().contains("group"));
            }
            other => panic!("expected CrdDecode, got {other:?}"),
        }
    }
}
