use chrono::{DateTime, Utc};
use podium_semver::Stability;
use serde::Deserialize;
use serde_json::Value;

/// A tracked composer package. One row per unique `vendor/name`.
///
/// `managed` distinguishes plugins we track proactively from transitive
/// libraries that exist only because another package requires them.
#[derive(Debug, Clone)]
pub struct Package {
    pub id: i64,
    pub name: String,
    pub package_type: String,
    pub repository: Option<String>,
    pub managed: bool,
    pub abandoned: bool,
    pub replacement_package: Option<String>,
    pub latest_version: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// A single release of a package, keyed by its normalized version.
///
/// Structured manifest fields are stored as opaque serialized JSON so
/// unknown future composer keys survive the round-trip into the provider
/// tree.
#[derive(Debug, Clone, Default)]
pub struct PackageVersion {
    pub id: Option<i64>,
    pub package_id: i64,
    pub version: String,
    pub normalized_version: String,
    pub stability: Stability,
    pub sha: String,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub homepage: Option<String>,
    pub time: Option<String>,
    pub license: Option<String>,
    pub authors: Option<String>,
    pub support: Option<String>,
    pub conflict: Option<String>,
    pub replace: Option<String>,
    pub provide: Option<String>,
    pub suggest: Option<String>,
    pub autoload: Option<String>,
    pub include_paths: Option<String>,
    pub target_dir: Option<String>,
    pub extra: Option<String>,
    pub binaries: Option<String>,
    pub source: Option<String>,
    pub dist: Option<String>,
    pub changelog: Option<String>,
}

impl PackageVersion {
    pub fn new(
        package_id: i64,
        version: impl Into<String>,
        normalized_version: impl Into<String>,
        stability: Stability,
        sha: impl Into<String>,
    ) -> Self {
        Self {
            package_id,
            version: version.into(),
            normalized_version: normalized_version.into(),
            stability,
            sha: sha.into(),
            ..Default::default()
        }
    }
}

/// A stored dependency edge. `name` is not a foreign key; the target
/// package may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub id: i64,
    pub package_id: i64,
    pub version_id: i64,
    pub name: String,
    pub constraints: String,
}

/// A dependency requirement of a release about to be inserted; becomes a
/// [`DependencyEdge`] once the owning version row exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequirement {
    pub name: String,
    pub constraints: String,
}

impl DependencyRequirement {
    pub fn new(name: impl Into<String>, constraints: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: constraints.into(),
        }
    }
}

/// The parts of a `composer.json` manifest the registry records.
///
/// Structured fields stay as raw [`Value`]s end-to-end; unknown keys are
/// ignored rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposerManifest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub package_type: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<Value>,
    pub homepage: Option<String>,
    pub time: Option<String>,
    pub license: Option<Value>,
    pub authors: Option<Value>,
    pub support: Option<Value>,
    pub require: Option<std::collections::BTreeMap<String, String>>,
    pub conflict: Option<Value>,
    pub replace: Option<Value>,
    pub provide: Option<Value>,
    pub suggest: Option<Value>,
    pub autoload: Option<Value>,
    #[serde(rename = "include-path")]
    pub include_path: Option<Value>,
    #[serde(rename = "target-dir")]
    pub target_dir: Option<String>,
    pub extra: Option<Value>,
    pub bin: Option<Value>,
}
