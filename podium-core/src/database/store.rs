//! Persistence operations for packages, versions and dependency edges.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use podium_semver::{cmp_normalized, normalize, Constraint, Stability};
use rusqlite::{params, OptionalExtension, Row, Transaction};
use tracing::warn;

use crate::{
    database::{
        connection::Database,
        models::{DependencyEdge, DependencyRequirement, Package, PackageVersion},
        statements::DbStatements,
    },
    error::PodiumError,
    PodiumResult,
};

const PACKAGE_COLUMNS: &str = "id, name, type, repository, managed, abandoned, \
     replacement_package, latest_version, date_created, date_updated";

const VERSION_COLUMNS: &str = "id, package_id, version, normalized_version, stability, sha, \
     description, keywords, homepage, time, license, authors, support, \
     conflict, \"replace\", provide, suggest, autoload, include_paths, \
     target_dir, extra, binaries, source, dist, changelog";

/// Query and mutation surface over the registry database.
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn package_exists(&self, name: &str) -> PodiumResult<bool> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM packages WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Whether the package finished an update more recently than `delta`
    /// ago. A freshly created row that was never updated does not count.
    pub fn package_updated_within(&self, name: &str, delta: Duration) -> PodiumResult<bool> {
        let package = self.get_package(name)?;
        Ok(package.date_updated > Utc::now() - delta
            && package.date_updated != package.date_created)
    }

    pub fn get_package(&self, name: &str) -> PodiumResult<Package> {
        self.find_package(name)?
            .ok_or_else(|| PodiumError::PackageNotFound(name.to_string()))
    }

    pub fn find_package(&self, name: &str) -> PodiumResult<Option<Package>> {
        self.db.with_conn(|conn| {
            let package = conn
                .query_row(
                    &format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE name = ?1"),
                    params![name],
                    map_package,
                )
                .optional()?;
            Ok(package)
        })
    }

    pub fn get_package_by_id(&self, id: i64) -> PodiumResult<Package> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ?1"),
                params![id],
                map_package,
            )
            .optional()?
            .ok_or_else(|| PodiumError::PackageNotFound(format!("#{id}")))
        })
    }

    /// Creates a package row. `date_created` and `date_updated` start equal,
    /// which is what marks the package as never updated.
    pub fn create_package(
        &self,
        name: &str,
        package_type: &str,
        repository: Option<&str>,
        managed: bool,
    ) -> PodiumResult<Package> {
        let now = Utc::now();
        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO packages (name, type, repository, managed, date_created, date_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    name,
                    package_type,
                    repository,
                    managed,
                    now.to_rfc3339(),
                    now.to_rfc3339()
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(Package {
            id,
            name: name.to_string(),
            package_type: package_type.to_string(),
            repository: repository.map(str::to_string),
            managed,
            abandoned: false,
            replacement_package: None,
            latest_version: None,
            date_created: now,
            date_updated: now,
        })
    }

    /// Updates an existing package row by id.
    pub fn save_package(&self, package: &Package) -> PodiumResult<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE packages SET
                    name = ?1, type = ?2, repository = ?3, managed = ?4,
                    abandoned = ?5, replacement_package = ?6,
                    latest_version = ?7, date_updated = ?8
                 WHERE id = ?9",
                params![
                    package.name,
                    package.package_type,
                    package.repository,
                    package.managed,
                    package.abandoned,
                    package.replacement_package,
                    package.latest_version,
                    package.date_updated.to_rfc3339(),
                    package.id
                ],
            )?;
            Ok(())
        })
    }

    /// Marks the package as updated just now.
    pub fn touch_package(&self, id: i64) -> PodiumResult<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE packages SET date_updated = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), id],
            )?;
            Ok(())
        })
    }

    /// Removes a package; its versions and their edges cascade.
    pub fn remove_package(&self, name: &str) -> PodiumResult<()> {
        self.db.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM packages WHERE name = ?1", params![name])?;
            if affected == 0 {
                return Err(PodiumError::PackageNotFound(name.to_string()));
            }
            Ok(())
        })
    }

    /// Raw version strings of a package admitted by `min_stability`,
    /// optionally sorted oldest-first.
    pub fn all_versions(
        &self,
        name: &str,
        min_stability: Stability,
        sorted: bool,
    ) -> PodiumResult<Vec<String>> {
        let mut rows: Vec<(String, String, Stability)> = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT v.version, v.normalized_version, v.stability
                 FROM packageversions v
                 JOIN packages p ON p.id = v.package_id
                 WHERE p.name = ?1",
            )?;
            let rows = stmt
                .query_map(params![name], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?.parse().unwrap_or_default(),
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.retain(|(_, _, stability)| min_stability.admits(*stability));
        if sorted {
            rows.sort_by(|a, b| cmp_normalized(&a.1, &b.1));
        }
        Ok(rows.into_iter().map(|(raw, _, _)| raw).collect())
    }

    /// Stored versions of a package as `raw -> (row id, sha)`.
    pub fn version_shas(&self, name: &str) -> PodiumResult<HashMap<String, (i64, String)>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT v.version, v.id, v.sha
                 FROM packageversions v
                 JOIN packages p ON p.id = v.package_id
                 WHERE p.name = ?1",
            )?;
            let rows = stmt
                .query_map(params![name], |row| {
                    Ok((row.get(0)?, (row.get(1)?, row.get(2)?)))
                })?
                .collect::<Result<HashMap<_, _>, _>>()?;
            Ok(rows)
        })
    }

    /// Looks up a release by the normalized form of `version`.
    pub fn get_release(&self, name: &str, version: &str) -> PodiumResult<Option<PackageVersion>> {
        let normalized = normalize(version)?;
        self.db.with_conn(|conn| {
            let release = conn
                .query_row(
                    &format!(
                        "SELECT {VERSION_COLUMNS} FROM packageversions
                         WHERE normalized_version = ?2
                           AND package_id = (SELECT id FROM packages WHERE name = ?1)"
                    ),
                    params![name, normalized],
                    map_version,
                )
                .optional()?;
            Ok(release)
        })
    }

    /// Batched release lookup. Unknown and unparseable versions are left out.
    pub fn get_releases(&self, name: &str, versions: &[String]) -> PodiumResult<Vec<PackageVersion>> {
        let normalized: Vec<String> = versions
            .iter()
            .filter_map(|raw| normalize(raw).ok())
            .collect();
        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        self.db.with_conn(|conn| {
            let placeholders = vec!["?"; normalized.len()].join(",");
            let mut stmt = conn.prepare(&format!(
                "SELECT {VERSION_COLUMNS} FROM packageversions
                 WHERE package_id = (SELECT id FROM packages WHERE name = ?1)
                   AND normalized_version IN ({placeholders})"
            ))?;

            let mut sql_params: Vec<&dyn rusqlite::ToSql> = vec![&name];
            for n in &normalized {
                sql_params.push(n);
            }

            let releases = stmt
                .query_map(sql_params.as_slice(), map_version)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(releases)
        })
    }

    /// True only when every constraint is satisfied by at least one stored
    /// version of `name`.
    pub fn versions_exist(&self, name: &str, constraints: &[String]) -> PodiumResult<bool> {
        if constraints.is_empty() {
            return Ok(true);
        }

        let normalized: Vec<String> = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT v.normalized_version
                 FROM packageversions v
                 JOIN packages p ON p.id = v.package_id
                 WHERE p.name = ?1",
            )?;
            let rows = stmt
                .query_map(params![name], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        for constraint in constraints {
            let parsed = match Constraint::parse(constraint) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!("Skipping invalid constraint '{constraint}' for {name}: {err}");
                    return Ok(false);
                }
            };
            if !normalized.iter().any(|v| parsed.matches_normalized(v)) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether any stored dependency edge targeting `name` has a constraint
    /// satisfied by `version`.
    pub fn is_dependency_version_required(&self, name: &str, version: &str) -> PodiumResult<bool> {
        let normalized = normalize(version)?;

        let constraints: Vec<String> = self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT constraints FROM packagedeps WHERE name = ?1")?;
            let rows = stmt
                .query_map(params![name], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        for constraint in constraints {
            match Constraint::parse(&constraint) {
                Ok(parsed) => {
                    if parsed.matches_normalized(&normalized) {
                        return Ok(true);
                    }
                }
                Err(err) => {
                    warn!("Skipping invalid stored constraint '{constraint}' for {name}: {err}");
                }
            }
        }
        Ok(false)
    }

    /// Deletes and inserts version rows in a single transaction. Edges of
    /// deleted versions cascade; edges of inserted versions are written
    /// alongside them. Returns the ids of the inserted rows.
    pub fn replace_versions(
        &self,
        package_id: i64,
        delete_ids: &[i64],
        inserts: Vec<(PackageVersion, Vec<DependencyRequirement>)>,
    ) -> PodiumResult<Vec<i64>> {
        self.db.transaction(|tx| {
            let mut writer = ReleaseWriter::new(tx)?;
            for id in delete_ids {
                writer.delete(*id)?;
            }
            let mut inserted = Vec::with_capacity(inserts.len());
            for (version, requirements) in &inserts {
                debug_assert_eq!(version.package_id, package_id);
                inserted.push(writer.insert(version, requirements)?);
            }
            Ok(inserted)
        })
    }

    pub fn set_latest(&self, package_id: i64, version: &str) -> PodiumResult<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE packages SET latest_version = ?1 WHERE id = ?2",
                params![version, package_id],
            )?;
            Ok(())
        })
    }

    /// Mirrors the latest version onto the operator-registered plugin row,
    /// when one exists for this package.
    pub fn set_plugin_latest(&self, package_name: &str, version: &str) -> PodiumResult<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE plugins SET latest_version = ?1 WHERE package_name = ?2",
                params![version, package_name],
            )?;
            Ok(())
        })
    }

    /// Registers a plugin row for a managed package.
    pub fn register_plugin(&self, package_name: &str) -> PodiumResult<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO plugins (package_name) VALUES (?1)",
                params![package_name],
            )?;
            Ok(())
        })
    }

    pub fn plugin_latest(&self, package_name: &str) -> PodiumResult<Option<String>> {
        self.db.with_conn(|conn| {
            let latest = conn
                .query_row(
                    "SELECT latest_version FROM plugins WHERE package_name = ?1",
                    params![package_name],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(latest.flatten())
        })
    }

    /// Consistent snapshot of everything the provider emitter needs, read
    /// in a single transaction.
    pub fn provider_snapshot(&self) -> PodiumResult<ProviderSnapshot> {
        self.db.transaction(|tx| {
            let packages = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {PACKAGE_COLUMNS} FROM packages
                     WHERE latest_version IS NOT NULL ORDER BY name"
                ))?;
                let rows = stmt
                    .query_map([], map_package)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            };

            let mut versions: HashMap<i64, Vec<PackageVersion>> = HashMap::new();
            {
                let mut stmt =
                    tx.prepare(&format!("SELECT {VERSION_COLUMNS} FROM packageversions"))?;
                for version in stmt.query_map([], map_version)? {
                    let version = version?;
                    versions.entry(version.package_id).or_default().push(version);
                }
            }

            let mut edges: HashMap<i64, Vec<DependencyEdge>> = HashMap::new();
            {
                let mut stmt = tx.prepare(
                    "SELECT id, package_id, version_id, name, constraints FROM packagedeps",
                )?;
                for edge in stmt.query_map([], |row| {
                    Ok(DependencyEdge {
                        id: row.get(0)?,
                        package_id: row.get(1)?,
                        version_id: row.get(2)?,
                        name: row.get(3)?,
                        constraints: row.get(4)?,
                    })
                })? {
                    let edge = edge?;
                    edges.entry(edge.version_id).or_default().push(edge);
                }
            }

            Ok(ProviderSnapshot {
                packages,
                versions,
                edges,
            })
        })
    }
}

/// A snapshot of the published surface of the registry.
pub struct ProviderSnapshot {
    /// Packages with a latest version, ordered by name.
    pub packages: Vec<Package>,
    /// Version rows grouped by owning package id.
    pub versions: HashMap<i64, Vec<PackageVersion>>,
    /// Dependency edges grouped by owning version id.
    pub edges: HashMap<i64, Vec<DependencyEdge>>,
}

/// Writes version deletions and insertions through prepared statements
/// inside one transaction.
struct ReleaseWriter<'a> {
    tx: &'a Transaction<'a>,
    statements: DbStatements<'a>,
}

impl<'a> ReleaseWriter<'a> {
    fn new(tx: &'a Transaction<'a>) -> rusqlite::Result<Self> {
        let statements = DbStatements::new(tx)?;
        Ok(Self { tx, statements })
    }

    fn delete(&mut self, id: i64) -> rusqlite::Result<()> {
        self.statements.version_delete.execute(params![id])?;
        Ok(())
    }

    fn insert(
        &mut self,
        version: &PackageVersion,
        requirements: &[DependencyRequirement],
    ) -> rusqlite::Result<i64> {
        self.statements.version_insert.execute(params![
            version.package_id,
            version.version,
            version.normalized_version,
            version.stability.as_str(),
            version.sha,
            version.description,
            version.keywords,
            version.homepage,
            version.time,
            version.license,
            version.authors,
            version.support,
            version.conflict,
            version.replace,
            version.provide,
            version.suggest,
            version.autoload,
            version.include_paths,
            version.target_dir,
            version.extra,
            version.binaries,
            version.source,
            version.dist,
            version.changelog,
        ])?;
        let version_id = self.tx.last_insert_rowid();

        for requirement in requirements {
            self.statements.edge_insert.execute(params![
                version.package_id,
                version_id,
                requirement.name,
                requirement.constraints,
            ])?;
        }

        Ok(version_id)
    }
}

fn parse_datetime(value: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn map_package(row: &Row) -> rusqlite::Result<Package> {
    Ok(Package {
        id: row.get(0)?,
        name: row.get(1)?,
        package_type: row.get(2)?,
        repository: row.get(3)?,
        managed: row.get(4)?,
        abandoned: row.get(5)?,
        replacement_package: row.get(6)?,
        latest_version: row.get(7)?,
        date_created: parse_datetime(row.get(8)?),
        date_updated: parse_datetime(row.get(9)?),
    })
}

fn map_version(row: &Row) -> rusqlite::Result<PackageVersion> {
    Ok(PackageVersion {
        id: Some(row.get(0)?),
        package_id: row.get(1)?,
        version: row.get(2)?,
        normalized_version: row.get(3)?,
        stability: row.get::<_, String>(4)?.parse().unwrap_or_default(),
        sha: row.get(5)?,
        description: row.get(6)?,
        keywords: row.get(7)?,
        homepage: row.get(8)?,
        time: row.get(9)?,
        license: row.get(10)?,
        authors: row.get(11)?,
        support: row.get(12)?,
        conflict: row.get(13)?,
        replace: row.get(14)?,
        provide: row.get(15)?,
        suggest: row.get(16)?,
        autoload: row.get(17)?,
        include_paths: row.get(18)?,
        target_dir: row.get(19)?,
        extra: row.get(20)?,
        binaries: row.get(21)?,
        source: row.get(22)?,
        dist: row.get(23)?,
        changelog: row.get(24)?,
    })
}

#[cfg(test)]
mod tests {
    use podium_semver::Stability;

    use super::*;
    use crate::database::models::DependencyRequirement;

    fn test_store() -> Store {
        Store::new(Database::in_memory().unwrap())
    }

    fn release(package_id: i64, version: &str, sha: &str) -> PackageVersion {
        PackageVersion::new(
            package_id,
            version,
            normalize(version).unwrap(),
            Stability::from_version(version),
            sha,
        )
    }

    #[test]
    fn test_create_and_get_package() {
        let store = test_store();
        let created = store
            .create_package("acme/plugin", "composer-plugin", Some("https://github.com/acme/plugin"), true)
            .unwrap();
        assert!(created.id > 0);

        let found = store.get_package("acme/plugin").unwrap();
        assert_eq!(found.name, "acme/plugin");
        assert!(found.managed);
        assert_eq!(found.latest_version, None);
        assert!(store.package_exists("acme/plugin").unwrap());
        assert!(!store.package_exists("acme/other").unwrap());
        assert!(matches!(
            store.get_package("acme/other"),
            Err(PodiumError::PackageNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_package_is_conflict() {
        let store = test_store();
        store.create_package("psr/log", "library", None, false).unwrap();
        let err = store
            .create_package("psr/log", "library", None, false)
            .unwrap_err();
        assert!(matches!(err, PodiumError::StoreConflict));
    }

    #[test]
    fn test_updated_within() {
        let store = test_store();
        let pkg = store.create_package("psr/log", "library", None, false).unwrap();

        // Never updated: created == updated.
        assert!(!store
            .package_updated_within("psr/log", Duration::hours(1))
            .unwrap());

        store.touch_package(pkg.id).unwrap();
        assert!(store
            .package_updated_within("psr/log", Duration::hours(1))
            .unwrap());
        assert!(!store
            .package_updated_within("psr/log", Duration::zero())
            .unwrap());
    }

    #[test]
    fn test_replace_versions_and_lookup() {
        let store = test_store();
        let pkg = store.create_package("acme/lib", "library", None, false).unwrap();

        let ids = store
            .replace_versions(
                pkg.id,
                &[],
                vec![
                    (
                        release(pkg.id, "1.0.0", "sha1"),
                        vec![DependencyRequirement::new("psr/log", "^1.0")],
                    ),
                    (release(pkg.id, "1.1.0-beta1", "sha2"), vec![]),
                ],
            )
            .unwrap();
        assert_eq!(ids.len(), 2);

        let found = store.get_release("acme/lib", "v1.0.0").unwrap().unwrap();
        assert_eq!(found.version, "1.0.0");
        assert_eq!(found.normalized_version, "1.0.0.0");
        assert_eq!(found.sha, "sha1");

        assert!(store.get_release("acme/lib", "2.0.0").unwrap().is_none());

        let batch = store
            .get_releases(
                "acme/lib",
                &["1.0.0".to_string(), "1.1.0-beta1".to_string(), "nope".to_string()],
            )
            .unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_unique_normalized_version() {
        let store = test_store();
        let pkg = store.create_package("acme/lib", "library", None, false).unwrap();

        store
            .replace_versions(pkg.id, &[], vec![(release(pkg.id, "1.0.0", "a"), vec![])])
            .unwrap();
        // v1.0.0 normalizes to the same row.
        let err = store
            .replace_versions(pkg.id, &[], vec![(release(pkg.id, "v1.0.0", "b"), vec![])])
            .unwrap_err();
        assert!(matches!(err, PodiumError::StoreConflict));
    }

    #[test]
    fn test_replace_is_transactional() {
        let store = test_store();
        let pkg = store.create_package("acme/lib", "library", None, false).unwrap();
        let ids = store
            .replace_versions(pkg.id, &[], vec![(release(pkg.id, "1.0.0", "a"), vec![])])
            .unwrap();

        // Second insert in the batch collides; the delete must roll back too.
        let result = store.replace_versions(
            pkg.id,
            &ids,
            vec![
                (release(pkg.id, "2.0.0", "c"), vec![]),
                (release(pkg.id, "2.0.0", "d"), vec![]),
            ],
        );
        assert!(result.is_err());
        assert!(store.get_release("acme/lib", "1.0.0").unwrap().is_some());
        assert!(store.get_release("acme/lib", "2.0.0").unwrap().is_none());
    }

    #[test]
    fn test_all_versions_stability_filter() {
        let store = test_store();
        let pkg = store.create_package("acme/lib", "library", None, false).unwrap();
        store
            .replace_versions(
                pkg.id,
                &[],
                vec![
                    (release(pkg.id, "1.1.0", "a"), vec![]),
                    (release(pkg.id, "1.0.0", "b"), vec![]),
                    (release(pkg.id, "1.2.0-beta1", "c"), vec![]),
                    (release(pkg.id, "1.2.0-RC1", "d"), vec![]),
                ],
            )
            .unwrap();

        let stable = store.all_versions("acme/lib", Stability::Stable, true).unwrap();
        assert_eq!(stable, vec!["1.0.0", "1.1.0"]);

        let rc = store.all_versions("acme/lib", Stability::RC, true).unwrap();
        assert_eq!(rc, vec!["1.0.0", "1.1.0", "1.2.0-RC1"]);

        let beta = store.all_versions("acme/lib", Stability::Beta, true).unwrap();
        assert_eq!(beta, vec!["1.0.0", "1.1.0", "1.2.0-beta1", "1.2.0-RC1"]);

        // Raising the minimum stability never adds versions.
        assert!(stable.len() <= rc.len() && rc.len() <= beta.len());
    }

    #[test]
    fn test_versions_exist() {
        let store = test_store();
        let pkg = store.create_package("psr/log", "library", None, false).unwrap();
        store
            .replace_versions(
                pkg.id,
                &[],
                vec![
                    (release(pkg.id, "1.0.0", "a"), vec![]),
                    (release(pkg.id, "1.1.0", "b"), vec![]),
                ],
            )
            .unwrap();

        assert!(store.versions_exist("psr/log", &["^1.0".to_string()]).unwrap());
        assert!(store
            .versions_exist("psr/log", &["^1.0".to_string(), "~1.1".to_string()])
            .unwrap());
        assert!(!store.versions_exist("psr/log", &["^2.0".to_string()]).unwrap());
        assert!(!store
            .versions_exist("psr/log", &["^1.0".to_string(), "^2.0".to_string()])
            .unwrap());
        assert!(store.versions_exist("psr/log", &[]).unwrap());
    }

    #[test]
    fn test_is_dependency_version_required() {
        let store = test_store();
        let pkg = store.create_package("acme/plugin", "composer-plugin", None, true).unwrap();
        store
            .replace_versions(
                pkg.id,
                &[],
                vec![(
                    release(pkg.id, "1.0.0", "a"),
                    vec![DependencyRequirement::new("psr/log", "^1.2 || ^2.0")],
                )],
            )
            .unwrap();

        assert!(store.is_dependency_version_required("psr/log", "1.3.0").unwrap());
        assert!(store.is_dependency_version_required("psr/log", "2.0.1").unwrap());
        assert!(!store.is_dependency_version_required("psr/log", "3.0.0").unwrap());
        assert!(!store.is_dependency_version_required("psr/http", "1.0.0").unwrap());
    }

    #[test]
    fn test_remove_package_cascades() {
        let store = test_store();
        let pkg = store.create_package("acme/lib", "library", None, false).unwrap();
        store
            .replace_versions(
                pkg.id,
                &[],
                vec![(
                    release(pkg.id, "1.0.0", "a"),
                    vec![DependencyRequirement::new("psr/log", "^1.0")],
                )],
            )
            .unwrap();

        store.remove_package("acme/lib").unwrap();
        assert!(!store.package_exists("acme/lib").unwrap());
        assert!(!store.is_dependency_version_required("psr/log", "1.0.0").unwrap());
        assert!(matches!(
            store.remove_package("acme/lib"),
            Err(PodiumError::PackageNotFound(_))
        ));
    }

    #[test]
    fn test_latest_version_and_plugin_mirror() {
        let store = test_store();
        let pkg = store
            .create_package("acme/plugin", "composer-plugin", None, true)
            .unwrap();
        store.register_plugin("acme/plugin").unwrap();

        store.set_latest(pkg.id, "1.1.0").unwrap();
        store.set_plugin_latest("acme/plugin", "1.1.0").unwrap();

        assert_eq!(
            store.get_package("acme/plugin").unwrap().latest_version,
            Some("1.1.0".to_string())
        );
        assert_eq!(
            store.plugin_latest("acme/plugin").unwrap(),
            Some("1.1.0".to_string())
        );
        // No plugin row registered: the mirror write is a no-op.
        store.set_plugin_latest("acme/other", "1.0.0").unwrap();
        assert_eq!(store.plugin_latest("acme/other").unwrap(), None);
    }

    #[test]
    fn test_provider_snapshot_groups() {
        let store = test_store();
        let a = store.create_package("acme/a", "library", None, false).unwrap();
        let b = store.create_package("acme/b", "library", None, false).unwrap();
        store
            .replace_versions(
                a.id,
                &[],
                vec![(
                    release(a.id, "1.0.0", "x"),
                    vec![DependencyRequirement::new("acme/b", "^1.0")],
                )],
            )
            .unwrap();
        store
            .replace_versions(b.id, &[], vec![(release(b.id, "1.0.0", "y"), vec![])])
            .unwrap();
        store.set_latest(a.id, "1.0.0").unwrap();

        let snapshot = store.provider_snapshot().unwrap();
        // Only packages with a latest version are published.
        assert_eq!(snapshot.packages.len(), 1);
        assert_eq!(snapshot.packages[0].name, "acme/a");

        let versions = snapshot.versions.get(&a.id).unwrap();
        assert_eq!(versions.len(), 1);
        let edges = snapshot.edges.get(&versions[0].id.unwrap()).unwrap();
        assert_eq!(edges[0].name, "acme/b");
        assert_eq!(edges[0].constraints, "^1.0");
    }
}
