//! Emission of the content-addressed provider JSON tree.
//!
//! The published layout follows the Composer v1 provider protocol:
//! `packages.json` points at a provider index under `p/provider/`, which
//! points at one provider file per package under `p/<name>/`, each path
//! embedding the SHA-256 of its content. Two runs over identical database
//! state must produce byte-identical output, so field order and omission
//! rules here are fixed.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use podium_semver::cmp_normalized;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{
    constants::{PROVIDERS_URL_TEMPLATE, PROVIDER_INCLUDE_KEY},
    database::models::{DependencyEdge, Package, PackageVersion},
    error::ErrorContext,
    queue::Job,
    services::Services,
    PodiumResult,
};

pub struct ProviderEmitter<'a> {
    services: &'a Services,
}

impl<'a> ProviderEmitter<'a> {
    pub fn new(services: &'a Services) -> Self {
        Self { services }
    }

    /// Rebuilds the whole provider tree from a snapshot of the store.
    ///
    /// Content-addressed files are written first and the root
    /// `packages.json` last, so a failed run leaves the previous tree
    /// intact. Files superseded by this run are scheduled for delayed
    /// deletion in a single job.
    pub fn dump_provider_json(&self) -> PodiumResult<()> {
        let snapshot = self.services.store.provider_snapshot()?;
        let webroot = self.services.config.composer_webroot.clone();

        let mut providers = Map::new();
        let mut stale: Vec<PathBuf> = Vec::new();

        for package in &snapshot.packages {
            let mut versions = snapshot
                .versions
                .get(&package.id)
                .cloned()
                .unwrap_or_default();
            versions.sort_by(|a, b| cmp_normalized(&a.normalized_version, &b.normalized_version));

            let mut version_map = Map::new();
            for version in &versions {
                let edges = version
                    .id
                    .and_then(|id| snapshot.edges.get(&id))
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                version_map.insert(
                    version.version.clone(),
                    version_object(package, version, edges),
                );
            }

            let mut packages_map = Map::new();
            packages_map.insert(package.name.clone(), Value::Object(version_map));
            let content = serde_json::to_vec(&json!({ "packages": packages_map }))?;
            let hash = hex_sha256(&content);

            let dir = webroot.join("p").join(&package.name);
            stale.extend(self.write_hashed(&dir, &hash, &content)?);
            providers.insert(package.name.clone(), json!({ "sha256": hash }));
        }

        let index_content = serde_json::to_vec(&json!({ "providers": providers }))?;
        let index_hash = hex_sha256(&index_content);
        let index_dir = webroot.join("p").join("provider");
        stale.extend(self.write_hashed(&index_dir, &index_hash, &index_content)?);

        self.write_root_manifest(&webroot, &index_hash)?;

        if !stale.is_empty() {
            info!("Scheduling delayed deletion of {} superseded provider file(s)", stale.len());
            self.services.queue.enqueue_delayed(
                Job::DeletePaths { paths: stale },
                Duration::from_secs(self.services.config.delete_delay_secs),
            );
        }
        Ok(())
    }

    /// Writes `dir/<hash>.json` unless it already exists. Returns the
    /// sibling files the new file supersedes.
    fn write_hashed(&self, dir: &Path, hash: &str, content: &[u8]) -> PodiumResult<Vec<PathBuf>> {
        let path = dir.join(format!("{hash}.json"));
        let existing = enumerate_json_files(dir)?;
        if path.exists() {
            return Ok(Vec::new());
        }

        fs::create_dir_all(dir)
            .with_context(|| format!("creating provider directory {}", dir.display()))?;
        fs::write(&path, content)
            .with_context(|| format!("writing provider file {}", path.display()))?;
        Ok(existing)
    }

    /// The root manifest is the only mutable path, so it is swapped in
    /// atomically and only after the rest of the tree is in place.
    fn write_root_manifest(&self, webroot: &Path, index_hash: &str) -> PodiumResult<()> {
        let mut root = Map::new();
        root.insert("packages".to_string(), Value::Array(Vec::new()));
        let mut includes = Map::new();
        includes.insert(
            PROVIDER_INCLUDE_KEY.to_string(),
            json!({ "sha256": index_hash }),
        );
        root.insert("provider-includes".to_string(), Value::Object(includes));
        root.insert(
            "providers-url".to_string(),
            Value::String(PROVIDERS_URL_TEMPLATE.to_string()),
        );
        let content = serde_json::to_vec(&Value::Object(root))?;

        fs::create_dir_all(webroot)
            .with_context(|| format!("creating webroot {}", webroot.display()))?;
        let tmp_path = webroot.join("packages.json.tmp");
        let final_path = webroot.join("packages.json");
        fs::write(&tmp_path, &content)
            .with_context(|| format!("writing manifest {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("renaming manifest to {}", final_path.display()))?;
        Ok(())
    }
}

fn hex_sha256(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

fn enumerate_json_files(dir: &Path) -> PodiumResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir)
        .with_context(|| format!("listing provider directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("listing provider directory {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn decode(field: &Option<String>) -> Option<Value> {
    field
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok())
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn insert_unless_empty(obj: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        if !is_empty_value(&value) {
            obj.insert(key.to_string(), value);
        }
    }
}

/// One version entry of a provider file. Fields are emitted in a fixed
/// order; `support` and `source` are intentionally left out of the
/// published tree.
fn version_object(package: &Package, version: &PackageVersion, edges: &[DependencyEdge]) -> Value {
    let mut obj = Map::new();

    obj.insert("name".to_string(), Value::String(package.name.clone()));
    obj.insert(
        "description".to_string(),
        Value::String(version.description.clone().unwrap_or_default()),
    );
    obj.insert(
        "keywords".to_string(),
        decode(&version.keywords).unwrap_or_else(|| json!([])),
    );
    obj.insert(
        "homepage".to_string(),
        Value::String(version.homepage.clone().unwrap_or_default()),
    );
    obj.insert("version".to_string(), Value::String(version.version.clone()));
    obj.insert(
        "version_normalized".to_string(),
        Value::String(version.normalized_version.clone()),
    );
    obj.insert(
        "license".to_string(),
        decode(&version.license).unwrap_or_else(|| json!([])),
    );
    obj.insert(
        "authors".to_string(),
        decode(&version.authors).unwrap_or_else(|| json!([])),
    );
    obj.insert(
        "dist".to_string(),
        decode(&version.dist).unwrap_or(Value::Null),
    );
    if !package.package_type.is_empty() {
        obj.insert(
            "type".to_string(),
            Value::String(package.package_type.clone()),
        );
    }

    insert_unless_empty(&mut obj, "time", version.time.clone().map(Value::String));
    insert_unless_empty(&mut obj, "autoload", decode(&version.autoload));
    insert_unless_empty(&mut obj, "extra", decode(&version.extra));
    insert_unless_empty(
        &mut obj,
        "target-dir",
        version.target_dir.clone().map(Value::String),
    );
    insert_unless_empty(&mut obj, "include-path", decode(&version.include_paths));
    insert_unless_empty(&mut obj, "bin", decode(&version.binaries));

    if !edges.is_empty() {
        let mut sorted: Vec<&DependencyEdge> = edges.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        let mut require = Map::new();
        for edge in sorted {
            require.insert(edge.name.clone(), Value::String(edge.constraints.clone()));
        }
        obj.insert("require".to_string(), Value::Object(require));
    }

    insert_unless_empty(&mut obj, "suggest", decode(&version.suggest));
    insert_unless_empty(&mut obj, "conflict", decode(&version.conflict));
    insert_unless_empty(&mut obj, "provide", decode(&version.provide));
    insert_unless_empty(&mut obj, "replace", decode(&version.replace));

    if package.abandoned {
        let replacement = match &package.replacement_package {
            Some(name) => Value::String(name.clone()),
            None => Value::Bool(true),
        };
        obj.insert("abandoned".to_string(), replacement);
    }

    obj.insert("uid".to_string(), Value::from(version.id.unwrap_or(0)));
    Value::Object(obj)
}
