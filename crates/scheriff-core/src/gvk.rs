//! Group/Version/Kind keys

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a Kubernetes resource type.
///
/// The canonical string form joins the non-empty parts with `/`, so core
/// kinds (empty group) render as `v1/Service` and grouped kinds as
/// `apps/v1/Deployment`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Build a key from a manifest's `apiVersion` and `kind` fields.
    ///
    /// `apps/v1` splits into group `apps` and version `v1`; an `apiVersion`
    /// without a slash is a core-group version.
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    /// The `apiVersion` string a manifest of this kind carries
    pub fn api_version(&self) -> String {
        join_non_empty("/", [self.group.as_str(), self.version.as_str()])
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_non_empty(
            "/",
            [self.group.as_str(), self.version.as_str(), self.kind.as_str()],
        ))
    }
}

/// Join the non-empty strings in `parts` with `sep`
pub fn join_non_empty<'a>(sep: &str, parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}
