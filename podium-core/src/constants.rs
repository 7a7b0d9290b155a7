use include_dir::{include_dir, Dir};

/// Dependency targets that never become packages of their own.
pub const PLATFORM_PACKAGE_NAMES: [&str; 3] = ["php", "composer-plugin-api", "__root__"];
pub const PLATFORM_PACKAGE_PREFIXES: [&str; 2] = ["ext-", "lib-"];
pub const ASSET_PACKAGE_PREFIXES: [&str; 2] = ["bower-asset/", "npm-asset/"];

/// Grace period before superseded provider files are removed, so in-flight
/// readers resolving through the old tree can complete.
pub const DELETE_DELAY_SECS: u64 = 300;

/// Backoff before a transient VCS failure is retried.
pub const RETRY_BACKOFF_SECS: u64 = 60;

pub const PROVIDERS_URL_TEMPLATE: &str = "/p/%package%/%hash%.json";
pub const PROVIDER_INCLUDE_KEY: &str = "p/provider/%hash%.json";

pub const REGISTRY_MIGRATIONS: Dir = include_dir!("$CARGO_MANIFEST_DIR/migrations");
