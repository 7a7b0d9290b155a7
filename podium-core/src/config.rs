use std::{collections::HashMap, fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{constants::DELETE_DELAY_SECS, error::ErrorContext, PodiumResult};

/// Application configuration, loaded from a TOML file and passed around
/// explicitly through [`crate::services::Services`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Path to the registry SQLite database.
    pub db_path: PathBuf,

    /// Directory the provider JSON tree is written into.
    pub composer_webroot: PathBuf,

    /// Per-package registered VCS tokens, keyed by package name.
    pub github_tokens: HashMap<String, String>,

    /// Credentials rotated randomly when no package-specific token is
    /// registered.
    pub github_fallback_tokens: Vec<String>,

    /// Refuse to update a managed plugin without a registered token.
    pub require_plugin_vcs_tokens: bool,

    /// Number of update workers draining the job queue.
    pub worker_count: usize,

    /// Delay in seconds before superseded provider files are deleted.
    pub delete_delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("podium.db"),
            composer_webroot: PathBuf::from("webroot"),
            github_tokens: HashMap::new(),
            github_fallback_tokens: Vec::new(),
            require_plugin_vcs_tokens: true,
            worker_count: 4,
            delete_delay_secs: DELETE_DELAY_SECS,
        }
    }
}

impl Config {
    pub fn load<P: Into<PathBuf>>(path: P) -> PodiumResult<Self> {
        let path = path.into();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.require_plugin_vcs_tokens);
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.delete_delay_secs, 300);
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/var/lib/podium/registry.db"
            composer_webroot = "/srv/composer"
            require_plugin_vcs_tokens = false
            github_fallback_tokens = ["token-a", "token-b"]

            [github_tokens]
            "acme/plugin" = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/podium/registry.db"));
        assert!(!config.require_plugin_vcs_tokens);
        assert_eq!(config.github_fallback_tokens.len(), 2);
        assert_eq!(
            config.github_tokens.get("acme/plugin").map(String::as_str),
            Some("secret")
        );
        assert_eq!(config.worker_count, 4);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load("/nonexistent/podium.toml").is_err());
    }
}
