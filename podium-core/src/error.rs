use rusqlite::ErrorCode;
use thiserror::Error;

/// Core error type for podium registry operations.
#[derive(Error, Debug)]
pub enum PodiumError {
    #[error("Package '{0}' not found")]
    PackageNotFound(String),

    #[error("Release '{version}' of package '{name}' not found")]
    ReleaseNotFound { name: String, version: String },

    #[error("No VCS token registered for managed package '{0}'")]
    MissingToken(String),

    #[error("Invalid composer manifest for {name} {version}: {reason}")]
    InvalidManifest {
        name: String,
        version: String,
        reason: String,
    },

    #[error("Transient VCS failure: {0}")]
    VcsTransient(String),

    #[error("Conflicting concurrent write, aborted with no effect")]
    StoreConflict,

    #[error("Database operation failed: {0}")]
    Database(rusqlite::Error),

    #[error(transparent)]
    Semver(#[from] podium_semver::SemverError),

    #[error("IO error while {action}")]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Unsupported repository URL '{0}'")]
    UnsupportedRepository(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] Box<ureq::Error>),

    #[error("Thread lock poison error")]
    PoisonError,

    #[error("{0}")]
    Custom(String),
}

impl PodiumError {
    /// Whether this error only affects a single version and the update may
    /// keep going with the remaining versions.
    pub fn is_version_local(&self) -> bool {
        matches!(self, Self::Semver(_) | Self::InvalidManifest { .. })
    }
}

impl From<rusqlite::Error> for PodiumError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::StoreConflict
            }
            _ => Self::Database(err),
        }
    }
}

impl From<ureq::Error> for PodiumError {
    fn from(err: ureq::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

impl<T> From<std::sync::PoisonError<T>> for PodiumError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::PoisonError
    }
}

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, PodiumError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, PodiumError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| PodiumError::IoError {
            action: context(),
            source: err,
        })
    }
}
