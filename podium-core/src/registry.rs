//! Query surface used by the front-end and CLI.

use chrono::Duration;
use podium_semver::Stability;

use crate::{
    database::models::{Package, PackageVersion},
    error::PodiumError,
    provider::ProviderEmitter,
    queue::Job,
    services::Services,
    update::UpdateEngine,
    PodiumResult,
};

/// Facade over the store and semver rules, plus the write entry points.
pub struct Registry {
    services: Services,
}

impl Registry {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn package_exists(&self, name: &str) -> PodiumResult<bool> {
        self.services.store.package_exists(name)
    }

    pub fn get_package(&self, name: &str) -> PodiumResult<Package> {
        self.services.store.get_package(name)
    }

    /// Versions of a package admitted by `min_stability`, oldest-first.
    pub fn all_versions(&self, name: &str, min_stability: Stability) -> PodiumResult<Vec<String>> {
        self.services.store.get_package(name)?;
        self.services.store.all_versions(name, min_stability, true)
    }

    /// The newest stored version admitted by `min_stability`, if any.
    pub fn latest_version(
        &self,
        name: &str,
        min_stability: Stability,
    ) -> PodiumResult<Option<String>> {
        let mut versions = self.all_versions(name, min_stability)?;
        Ok(versions.pop())
    }

    pub fn get_release(&self, name: &str, version: &str) -> PodiumResult<PackageVersion> {
        self.services
            .store
            .get_release(name, version)?
            .ok_or_else(|| PodiumError::ReleaseNotFound {
                name: name.to_string(),
                version: version.to_string(),
            })
    }

    pub fn get_releases(
        &self,
        name: &str,
        versions: &[String],
    ) -> PodiumResult<Vec<PackageVersion>> {
        self.services.store.get_releases(name, versions)
    }

    /// Whether the package finished an update within `delta`.
    pub fn is_fresh(&self, name: &str, delta: Duration) -> PodiumResult<bool> {
        self.services.store.package_updated_within(name, delta)
    }

    pub fn remove_package(&self, name: &str) -> PodiumResult<()> {
        self.services.store.remove_package(name)
    }

    /// Runs a reconciliation for `name` in the calling thread.
    pub fn update_package(&self, name: &str, force: bool) -> PodiumResult<()> {
        UpdateEngine::new(&self.services).update_package(name, force)
    }

    /// Defers a reconciliation for `name` to the job queue.
    pub fn schedule_update(&self, name: &str) {
        self.services.queue.enqueue(Job::UpdatePackage {
            name: name.to_string(),
        });
    }

    /// Republishes the provider JSON tree.
    pub fn dump_provider_json(&self) -> PodiumResult<()> {
        ProviderEmitter::new(&self.services).dump_provider_json()
    }
}

#[cfg(test)]
mod tests {
    use podium_semver::normalize;

    use super::*;
    use crate::{
        database::models::PackageVersion,
        update::tests::{harness, FakeBackend},
    };

    fn seed(registry: &Registry, name: &str, versions: &[&str]) -> i64 {
        let store = &registry.services.store;
        let pkg = store.create_package(name, "library", None, false).unwrap();
        let inserts = versions
            .iter()
            .map(|v| {
                (
                    PackageVersion::new(
                        pkg.id,
                        *v,
                        normalize(v).unwrap(),
                        Stability::from_version(v),
                        "sha",
                    ),
                    vec![],
                )
            })
            .collect();
        store.replace_versions(pkg.id, &[], inserts).unwrap();
        pkg.id
    }

    #[test]
    fn test_latest_version_respects_stability_floor() {
        let h = harness();
        let registry = Registry::new(h.services.clone());
        seed(&registry, "acme/lib", &["1.0.0", "1.1.0-beta1", "1.1.0"]);

        assert_eq!(
            registry.latest_version("acme/lib", Stability::Stable).unwrap(),
            Some("1.1.0".to_string())
        );
        // The beta floor admits 1.1.0-beta1, but 1.1.0 still outranks it.
        assert_eq!(
            registry.latest_version("acme/lib", Stability::Beta).unwrap(),
            Some("1.1.0".to_string())
        );
    }

    #[test]
    fn test_latest_version_without_newer_stable() {
        let h = harness();
        let registry = Registry::new(h.services.clone());
        seed(&registry, "acme/lib", &["1.0.0", "1.1.0-beta1"]);

        assert_eq!(
            registry.latest_version("acme/lib", Stability::Stable).unwrap(),
            Some("1.0.0".to_string())
        );
        assert_eq!(
            registry.latest_version("acme/lib", Stability::Beta).unwrap(),
            Some("1.1.0-beta1".to_string())
        );
        assert_eq!(
            registry.latest_version("acme/lib", Stability::Dev).unwrap(),
            Some("1.1.0-beta1".to_string())
        );
    }

    #[test]
    fn test_release_lookup() {
        let h = harness();
        let registry = Registry::new(h.services.clone());
        seed(&registry, "acme/lib", &["1.0.0"]);

        assert_eq!(registry.get_release("acme/lib", "v1.0").unwrap().version, "1.0.0");
        assert!(matches!(
            registry.get_release("acme/lib", "9.9.9"),
            Err(PodiumError::ReleaseNotFound { .. })
        ));
        assert!(matches!(
            registry.all_versions("acme/none", Stability::Dev),
            Err(PodiumError::PackageNotFound(_))
        ));
    }

    #[test]
    fn test_update_and_schedule_delegation() {
        let h = harness();
        let registry = Registry::new(h.services.clone());
        registry
            .services
            .store
            .create_package("acme/plugin", "composer-plugin", None, true)
            .unwrap();
        h.factory.set_backend(
            "acme/plugin",
            FakeBackend::with_tags(&[("1.0.0", "sha1")]),
        );

        registry.update_package("acme/plugin", false).unwrap();
        assert_eq!(
            registry.get_package("acme/plugin").unwrap().latest_version,
            Some("1.0.0".to_string())
        );
        assert!(registry.is_fresh("acme/plugin", Duration::hours(1)).unwrap());

        registry.schedule_update("acme/plugin");
        assert_eq!(h.queue.len(), 1);

        registry.remove_package("acme/plugin").unwrap();
        assert!(!registry.package_exists("acme/plugin").unwrap());
    }
}
