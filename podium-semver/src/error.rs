use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemverError {
    #[error("Invalid version string '{0}'")]
    InvalidVersion(String),

    #[error("Invalid version constraint '{0}'")]
    InvalidConstraint(String),
}
