//! Reconciliation of stored package state against the VCS backend.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use podium_semver::{normalize, sort_descending, Stability};
use tracing::{info, warn};

use crate::{
    database::models::PackageVersion,
    queue::Job,
    services::Services,
    utils::{is_platform_package, FileLock},
    PodiumResult,
};

/// Reconciles one package at a time: pulls VCS state, diffs it against the
/// store, writes the deltas and schedules follow-up jobs for dependencies.
///
/// The engine is stateless between invocations; all progress is committed
/// to the store before a job returns.
pub struct UpdateEngine<'a> {
    services: &'a Services,
}

impl<'a> UpdateEngine<'a> {
    pub fn new(services: &'a Services) -> Self {
        Self { services }
    }

    /// Brings the stored version set of `name` in line with the backend.
    ///
    /// Dev-stability tags are never ingested. For an unmanaged package a
    /// tag is only ingested when a stored dependency edge already admits
    /// it, which bounds fan-out through transitive libraries; until some
    /// managed update records a satisfiable constraint, a freshly created
    /// dependency package stays empty.
    ///
    /// With `force`, unchanged versions are reprocessed as if their sha
    /// had drifted.
    pub fn update_package(&self, name: &str, force: bool) -> PodiumResult<()> {
        // Two concurrent updates of the same package would race on the
        // delete+insert of overlapping version sets.
        let _lock = FileLock::acquire(&format!("package:{name}"))?;

        let store = &self.services.store;
        let package = store.get_package(name)?;
        let adapter = self.services.vcs.adapter_for(&package)?;

        let stored = store.version_shas(name)?;
        let vcs_versions = adapter.versions()?;

        let mut candidates: HashMap<String, String> = HashMap::new();
        for (tag, sha) in vcs_versions {
            if Stability::from_version(&tag) == Stability::Dev {
                continue;
            }
            if let Err(err) = normalize(&tag) {
                warn!("Skipping unparseable tag '{tag}' of {name}: {err}");
                continue;
            }
            if !package.managed && !store.is_dependency_version_required(name, &tag)? {
                continue;
            }
            candidates.insert(tag, sha);
        }

        let mut delete_ids = Vec::new();
        let mut new_versions = Vec::new();
        for (version, (id, stored_sha)) in &stored {
            match candidates.get(version) {
                None => delete_ids.push(*id),
                Some(vcs_sha) if force || vcs_sha != stored_sha => {
                    delete_ids.push(*id);
                    new_versions.push(version.clone());
                }
                Some(_) => {}
            }
        }
        for version in candidates.keys() {
            if !stored.contains_key(version) {
                new_versions.push(version.clone());
            }
        }

        if !delete_ids.is_empty() {
            store.replace_versions(package.id, &delete_ids, vec![])?;
        }
        if new_versions.is_empty() {
            return Ok(());
        }

        sort_descending(&mut new_versions);

        let mut first_processed: Option<&str> = None;
        let mut first_stable: Option<&str> = None;
        let mut package_deps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for version in &new_versions {
            let sha = candidates
                .get(version)
                .cloned()
                .expect("candidate version has a sha");
            let stability = Stability::from_version(version);
            let mut release = PackageVersion::new(
                package.id,
                version.clone(),
                normalize(version)?,
                stability,
                sha,
            );

            let requirements = match adapter.populate_release(&mut release) {
                Ok(requirements) => requirements,
                Err(err) if err.is_version_local() => {
                    warn!("Skipping {name} {version}: {err}");
                    continue;
                }
                Err(err) => return Err(err),
            };

            store.replace_versions(package.id, &[], vec![(release, requirements.clone())])?;

            if first_processed.is_none() {
                first_processed = Some(version);
            }
            if first_stable.is_none() && stability == Stability::Stable {
                first_stable = Some(version);
            }

            for requirement in requirements {
                if is_platform_package(&requirement.name) {
                    continue;
                }
                package_deps
                    .entry(requirement.name)
                    .or_default()
                    .insert(requirement.constraints);
            }
        }

        // The latest version is picked from the newly processed walk only,
        // not from retained pre-existing versions.
        if let Some(latest) = first_stable.or(first_processed) {
            store.set_latest(package.id, latest)?;
            if package.managed {
                store.set_plugin_latest(&package.name, latest)?;
            }
        }
        store.touch_package(package.id)?;

        let mut scheduled = 0usize;
        for (dep_name, constraints) in package_deps {
            let constraints: Vec<String> = constraints.into_iter().collect();
            let needs_update = if !store.package_exists(&dep_name)? {
                store.create_package(&dep_name, "library", None, false)?;
                true
            } else {
                !store.versions_exist(&dep_name, &constraints)?
            };
            if needs_update {
                self.services
                    .queue
                    .enqueue(Job::UpdatePackage { name: dep_name });
                scheduled += 1;
            }
        }

        info!(
            "Updated {name}: {} new version(s), {} deleted, {scheduled} dependency update(s) scheduled",
            new_versions.len(),
            delete_ids.len(),
        );
        Ok(())
    }
}
