//! Embedded schema migrations.
//!
//! Migration files live in the crate's `migrations/` directory, are
//! compiled in via `include_dir`, and are named `V<n>_<label>.sql`. The
//! database tracks its schema version in `PRAGMA user_version`; each
//! pending migration runs in its own transaction and bumps the pragma on
//! commit.

use include_dir::Dir;
use rusqlite::Connection;

use crate::{error::PodiumError, PodiumResult};

/// Applies every embedded migration newer than the database's current
/// schema version.
pub fn apply_migrations(conn: &mut Connection, dir: Dir) -> PodiumResult<()> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for (version, sql) in load_migrations(dir)? {
        if version <= current {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
    }
    Ok(())
}

/// Collects the embedded `V<n>_<label>.sql` files, ordered by version.
///
/// Versions must be contiguous starting at 1, so a migration that went
/// missing from the build cannot be skipped silently.
fn load_migrations(dir: Dir) -> PodiumResult<Vec<(i32, &str)>> {
    let mut migrations = Vec::new();

    for file in dir.files() {
        let path = file.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let Some((number, _label)) = stem
            .strip_prefix('V')
            .and_then(|rest| rest.split_once('_'))
        else {
            continue;
        };

        let version = number.parse::<i32>().map_err(|_| {
            PodiumError::Custom(format!("migration filename '{stem}' has no numeric version"))
        })?;
        let sql = file.contents_utf8().ok_or_else(|| {
            PodiumError::Custom(format!("migration '{stem}' is not valid UTF-8"))
        })?;
        migrations.push((version, sql));
    }

    migrations.sort_by_key(|(version, _)| *version);

    for (idx, (version, _)) in migrations.iter().enumerate() {
        let expected = idx as i32 + 1;
        if *version != expected {
            return Err(PodiumError::Custom(format!(
                "migrations must be contiguous from V1, found V{version} where V{expected} was expected"
            )));
        }
    }

    Ok(migrations)
}
