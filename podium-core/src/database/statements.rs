use rusqlite::{Statement, Transaction};

pub struct DbStatements<'a> {
    pub version_delete: Statement<'a>,
    pub version_insert: Statement<'a>,
    pub edge_insert: Statement<'a>,
}

impl<'a> DbStatements<'a> {
    pub fn new(tx: &'a Transaction) -> rusqlite::Result<Self> {
        Ok(Self {
            version_delete: tx.prepare("DELETE FROM packageversions WHERE id = ?1")?,
            version_insert: tx.prepare(
                "INSERT INTO packageversions (
                    package_id, version, normalized_version, stability, sha,
                    description, keywords, homepage, time, license, authors,
                    support, conflict, \"replace\", provide, suggest, autoload,
                    include_paths, target_dir, extra, binaries, source, dist,
                    changelog
                )
                VALUES
                (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24
                )",
            )?,
            edge_insert: tx.prepare(
                "INSERT INTO packagedeps (package_id, version_id, name, constraints)
                 VALUES (?1, ?2, ?3, ?4)",
            )?,
        })
    }
}
