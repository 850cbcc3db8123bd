//! Exact-match fingerprint lookup.

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::Fingerprint;

use super::LOOKUP_HASHES_SQL;

/// One stored `(key, frame)` row sharing a fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct StoredMatch {
    pub key: String,
    pub frame: i64,
}

/// All stored rows whose four words equal `fp`. Empty means no match.
pub fn lookup_fingerprint(conn: &Connection, fp: &Fingerprint) -> Result<Vec<StoredMatch>> {
    let [h1, h2, h3, h4] = fp.words();
    let mut stmt = conn
        .prepare_cached(LOOKUP_HASHES_SQL)
        .context("prepare lookup")?;
    let rows = stmt
        .query_map(
            (i64::from(h1), i64::from(h2), i64::from(h3), i64::from(h4)),
            |row| {
                Ok(StoredMatch {
                    key: row.get(0)?,
                    frame: row.get(1)?,
                })
            },
        )
        .context("query lookup")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("scan lookup row")?);
    }
    Ok(out)
}
