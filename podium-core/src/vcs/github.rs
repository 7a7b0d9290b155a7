//! GitHub-backed VCS adapter.

use std::{collections::HashMap, sync::LazyLock, time::Duration};

use rand::seq::SliceRandom;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use ureq::Agent;

use crate::{
    config::Config,
    database::models::{ComposerManifest, DependencyRequirement, Package, PackageVersion},
    error::PodiumError,
    vcs::{VcsAdapter, VcsAdapterFactory},
    PodiumResult,
};

const API_BASE: &str = "https://api.github.com";
const PER_PAGE: usize = 100;

static PROJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:https?://)?(?:www\.)?github\.com[:/]|git@github\.com:|github:)([^/\s]+/[^/\s]+?)(?:\.git)?/?$",
    )
    .expect("unable to compile github project regex")
});

/// Extracts `owner/repo` from the repository URL forms we accept.
pub fn parse_project(url: &str) -> Option<String> {
    PROJECT_RE
        .captures(url.trim())
        .map(|caps| caps[1].to_string())
}

#[derive(Debug, Clone, Deserialize)]
struct GithubTag {
    name: String,
    commit: GithubCommit,
}

#[derive(Debug, Clone, Deserialize)]
struct GithubCommit {
    sha: String,
}

/// Adapter factory applying the registry's credential policy.
///
/// A managed plugin must have a registered token when
/// `require_plugin_vcs_tokens` is on; transitive libraries fall back to a
/// randomly rotated credential from the fallback pool.
pub struct GithubFactory {
    agent: Agent,
    tokens: HashMap<String, String>,
    fallback_tokens: Vec<String>,
    require_plugin_tokens: bool,
}

impl GithubFactory {
    pub fn from_config(config: &Config) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .user_agent("podium-registry")
            .timeout_global(Some(Duration::from_secs(30)))
            .build()
            .into();

        Self {
            agent,
            tokens: config.github_tokens.clone(),
            fallback_tokens: config.github_fallback_tokens.clone(),
            require_plugin_tokens: config.require_plugin_vcs_tokens,
        }
    }

    fn fallback_token(&self) -> Option<String> {
        self.fallback_tokens.choose(&mut rand::thread_rng()).cloned()
    }
}

impl VcsAdapterFactory for GithubFactory {
    fn adapter_for(&self, package: &Package) -> PodiumResult<Box<dyn VcsAdapter>> {
        let url = package
            .repository
            .as_deref()
            .ok_or_else(|| PodiumError::UnsupportedRepository(format!("{}: none", package.name)))?;
        let project =
            parse_project(url).ok_or_else(|| PodiumError::UnsupportedRepository(url.to_string()))?;

        let token = match self.tokens.get(&package.name) {
            Some(token) => Some(token.clone()),
            None if package.managed && self.require_plugin_tokens => {
                return Err(PodiumError::MissingToken(package.name.clone()));
            }
            None => self.fallback_token(),
        };

        Ok(Box::new(GithubAdapter::new(
            self.agent.clone(),
            package.name.clone(),
            project,
            token,
        )))
    }
}

pub struct GithubAdapter {
    agent: Agent,
    package_name: String,
    project: String,
    token: Option<String>,
}

impl GithubAdapter {
    pub fn new(agent: Agent, package_name: String, project: String, token: Option<String>) -> Self {
        Self {
            agent,
            package_name,
            project,
            token,
        }
    }

    fn get(&self, url: &str, accept: &str) -> PodiumResult<ureq::http::Response<ureq::Body>> {
        let mut req = self.agent.get(url).header("Accept", accept);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req.call()?)
    }
}

impl VcsAdapter for GithubAdapter {
    fn versions(&self) -> PodiumResult<HashMap<String, String>> {
        let mut versions = HashMap::new();

        for page in 1.. {
            let url = format!(
                "{API_BASE}/repos/{}/tags?per_page={PER_PAGE}&page={page}",
                self.project
            );
            let mut resp = self.get(&url, "application/vnd.github+json")?;

            let status = resp.status();
            if !status.is_success() {
                return Err(PodiumError::VcsTransient(format!(
                    "{url} [{status}]"
                )));
            }

            let tags: Vec<GithubTag> = resp
                .body_mut()
                .read_json()
                .map_err(|err| PodiumError::VcsTransient(format!("{url}: {err}")))?;
            let page_len = tags.len();

            for tag in tags {
                versions.insert(tag.name, tag.commit.sha);
            }
            if page_len < PER_PAGE {
                break;
            }
        }

        debug!(
            "Fetched {} tags for {} from github:{}",
            versions.len(),
            self.package_name,
            self.project
        );
        Ok(versions)
    }

    fn populate_release(
        &self,
        release: &mut PackageVersion,
    ) -> PodiumResult<Vec<DependencyRequirement>> {
        let url = format!(
            "{API_BASE}/repos/{}/contents/composer.json?ref={}",
            self.project, release.sha
        );
        let mut resp = self.get(&url, "application/vnd.github.raw+json")?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(PodiumError::InvalidManifest {
                name: self.package_name.clone(),
                version: release.version.clone(),
                reason: "no composer.json at this commit".into(),
            });
        }
        if !status.is_success() {
            return Err(PodiumError::VcsTransient(format!("{url} [{status}]")));
        }

        let body = resp
            .body_mut()
            .read_to_string()
            .map_err(|err| PodiumError::VcsTransient(format!("{url}: {err}")))?;
        let manifest: ComposerManifest =
            serde_json::from_str(&body).map_err(|err| PodiumError::InvalidManifest {
                name: self.package_name.clone(),
                version: release.version.clone(),
                reason: err.to_string(),
            })?;

        Ok(apply_manifest(release, &self.project, manifest))
    }
}

fn to_json_string(value: Option<Value>) -> Option<String> {
    value.and_then(|v| {
        if v.is_null() {
            None
        } else {
            serde_json::to_string(&v).ok()
        }
    })
}

/// Copies manifest fields onto the release row and derives its dist and
/// source pointers from the commit.
fn apply_manifest(
    release: &mut PackageVersion,
    project: &str,
    manifest: ComposerManifest,
) -> Vec<DependencyRequirement> {
    release.description = manifest.description;
    release.keywords = to_json_string(manifest.keywords);
    release.homepage = manifest.homepage;
    release.time = manifest.time;
    release.license = to_json_string(manifest.license);
    release.authors = to_json_string(manifest.authors);
    release.support = to_json_string(manifest.support);
    release.conflict = to_json_string(manifest.conflict);
    release.replace = to_json_string(manifest.replace);
    release.provide = to_json_string(manifest.provide);
    release.suggest = to_json_string(manifest.suggest);
    release.autoload = to_json_string(manifest.autoload);
    release.include_paths = to_json_string(manifest.include_path);
    release.target_dir = manifest.target_dir;
    release.extra = to_json_string(manifest.extra);
    release.binaries = to_json_string(manifest.bin);

    let dist = serde_json::json!({
        "type": "zip",
        "url": format!("{API_BASE}/repos/{project}/zipball/{}", release.sha),
        "reference": release.sha,
        "shasum": "",
    });
    release.dist = serde_json::to_string(&dist).ok();

    let source = serde_json::json!({
        "type": "git",
        "url": format!("https://github.com/{project}.git"),
        "reference": release.sha,
    });
    release.source = serde_json::to_string(&source).ok();

    manifest
        .require
        .unwrap_or_default()
        .into_iter()
        .map(|(name, constraints)| DependencyRequirement::new(name, constraints))
        .collect()
}
