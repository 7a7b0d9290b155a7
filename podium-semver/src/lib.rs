//! Composer-compatible semantic version handling.
//!
//! Composer versions differ from crates.io semver in a few load-bearing
//! ways: tags normalize to a four-component canonical form
//! (`1.2.0-beta.3` becomes `1.2.0.0-beta3`), stability is derived from the
//! version string itself, and constraint expressions support `~`, `^`,
//! wildcards, hyphen ranges and `||` disjunction. This crate implements
//! those rules natively.

mod constraint;
mod error;
mod stability;
mod version;

pub use constraint::{satisfies, Constraint};
pub use error::SemverError;
pub use stability::Stability;
pub use version::{cmp_normalized, compare, normalize, sort_ascending, sort_descending};

pub type SemverResult<T> = std::result::Result<T, SemverError>;
