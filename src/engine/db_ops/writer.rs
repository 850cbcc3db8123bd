//! Batched fingerprint insert: one transaction per batch.

use anyhow::{Context, Result};
use rusqlite::{Connection, Statement};

use crate::{Fingerprint, ImageDescriptor};

use super::{INSERT_HASHES_SQL, StoreErrorKind, classify};

/// Rows written and duplicates absorbed by one committed batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Execute one row insert. Returns the raw rusqlite error so the caller can classify it.
fn execute_insert(
    stmt: &mut Statement<'_>,
    key: &str,
    frame: i64,
    fp: &Fingerprint,
) -> rusqlite::Result<usize> {
    let [h1, h2, h3, h4] = fp.words();
    stmt.execute((
        key,
        frame,
        i64::from(h1),
        i64::from(h2),
        i64::from(h3),
        i64::from(h4),
    ))
}

/// Insert every fingerprinted descriptor in `batch` inside one transaction.
///
/// Uniqueness violations are counted and skipped. Any other failure returns early; the
/// transaction is rolled back when dropped, leaving other batches untouched.
pub fn insert_batch(conn: &mut Connection, batch: &[ImageDescriptor]) -> Result<BatchOutcome> {
    let tx = conn.transaction().context("begin transaction")?;
    let mut outcome = BatchOutcome::default();
    {
        let mut stmt = tx.prepare(INSERT_HASHES_SQL).context("prepare insert")?;
        for d in batch {
            let fp = d.fingerprint.as_ref().with_context(|| {
                format!("descriptor {} reached the store unfingerprinted", d.path.display())
            })?;
            match execute_insert(&mut stmt, &d.key, d.frame, fp) {
                Ok(_) => outcome.inserted += 1,
                Err(e) if classify(&e) == StoreErrorKind::Duplicate => outcome.duplicates += 1,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("insert {} frame {}", d.key, d.frame));
                }
            }
        }
    }
    tx.commit().context("commit transaction")?;
    Ok(outcome)
}
