//! Version-control backends the registry ingests from.

pub mod github;

use std::collections::HashMap;

use crate::{
    database::models::{DependencyRequirement, Package, PackageVersion},
    PodiumResult,
};

pub use github::{GithubAdapter, GithubFactory};

/// A connected VCS backend for one package repository.
pub trait VcsAdapter: Send + Sync {
    /// Every tag the backend exposes, as `raw version -> commit sha`.
    fn versions(&self) -> PodiumResult<HashMap<String, String>>;

    /// Fills the manifest fields of a release from the backend, reading the
    /// composer manifest at the release's commit. Returns the release's
    /// dependency requirements.
    fn populate_release(&self, release: &mut PackageVersion)
        -> PodiumResult<Vec<DependencyRequirement>>;
}

/// Produces an adapter for a package from its repository URL and the
/// credential policy.
pub trait VcsAdapterFactory: Send + Sync {
    fn adapter_for(&self, package: &Package) -> PodiumResult<Box<dyn VcsAdapter>>;
}
