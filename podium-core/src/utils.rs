//! Advisory locking and small shared helpers.

use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
};

use crate::{
    constants::{ASSET_PACKAGE_PREFIXES, PLATFORM_PACKAGE_NAMES, PLATFORM_PACKAGE_PREFIXES},
    error::ErrorContext,
    PodiumResult,
};

/// Whether a dependency target is a platform, sentinel or foreign-asset
/// package. These are recorded as dependency edges but never created as
/// packages of their own.
pub fn is_platform_package(name: &str) -> bool {
    PLATFORM_PACKAGE_NAMES.contains(&name)
        || PLATFORM_PACKAGE_PREFIXES
            .iter()
            .chain(ASSET_PACKAGE_PREFIXES.iter())
            .any(|prefix| name.starts_with(prefix))
}

/// A file-based advisory lock using `flock`.
///
/// Two concurrent updates of the same package would race on the
/// delete+insert of overlapping version sets, so every update holds the
/// lock named `package:<name>` for its duration. The lock is released when
/// `FileLock` is dropped.
pub struct FileLock {
    _file: nix::fcntl::Flock<File>,
    path: PathBuf,
}

impl FileLock {
    /// Lock directory: `$PODIUM_LOCK_DIR`, else `$XDG_RUNTIME_DIR/podium/locks`,
    /// else a podium directory under the system temp dir.
    fn lock_dir() -> PodiumResult<PathBuf> {
        let lock_dir = if let Ok(dir) = std::env::var("PODIUM_LOCK_DIR") {
            PathBuf::from(dir)
        } else {
            let base = std::env::var("XDG_RUNTIME_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir());
            base.join("podium").join("locks")
        };

        if !lock_dir.exists() {
            fs::create_dir_all(&lock_dir)
                .with_context(|| format!("creating lock directory {}", lock_dir.display()))?;
        }

        Ok(lock_dir)
    }

    fn lock_path(name: &str) -> PodiumResult<PathBuf> {
        let lock_dir = Self::lock_dir()?;

        // Package names contain '/' and ':'; keep the filename valid.
        let sanitize = |s: &str| {
            s.chars()
                .map(|c| {
                    if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect::<String>()
        };

        let filename = format!("{}.lock", sanitize(name));
        Ok(lock_dir.join(filename))
    }

    /// Acquire an exclusive lock, blocking until it is available.
    pub fn acquire(name: &str) -> PodiumResult<Self> {
        let lock_path = Self::lock_path(name)?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("opening lock file {}", lock_path.display()))?;

        let file = nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusive).map_err(
            |(_, err)| crate::error::PodiumError::Custom(format!(
                "acquiring lock {}: {}",
                lock_path.display(),
                err
            )),
        )?;

        Ok(FileLock {
            path: lock_path,
            _file: file,
        })
    }

    /// Try to acquire an exclusive lock without blocking.
    ///
    /// Returns `None` if the lock is already held.
    pub fn try_acquire(name: &str) -> PodiumResult<Option<Self>> {
        let lock_path = Self::lock_path(name)?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("opening lock file {}", lock_path.display()))?;

        match nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusiveNonblock) {
            Ok(file) => Ok(Some(FileLock {
                path: lock_path,
                _file: file,
            })),
            Err((_, err)) => {
                if matches!(err, nix::errno::Errno::EWOULDBLOCK) {
                    return Ok(None);
                }
                Err(crate::error::PodiumError::Custom(format!(
                    "acquiring lock {}: {}",
                    lock_path.display(),
                    err
                )))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
