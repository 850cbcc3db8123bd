//! Database operations: schema, open, batched insert, fingerprint lookup, lock-retry.

mod connection;
mod errors;
mod lookup;
mod retry;
mod writer;

pub use connection::{Store, count_rows, open_db, open_db_in_memory, open_db_read_only};
pub use errors::{StoreErrorKind, classify, classify_error, is_locked};
pub use lookup::{StoredMatch, lookup_fingerprint};
pub use retry::retry_while_locked;
pub use writer::{BatchOutcome, insert_batch};

use crate::UniquePolicy;

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// Fingerprint table. Column layout is shared with existing stores; `mtime` is never written.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS key_hashes (
    fullpath TEXT,
    mtime TEXT,
    frame INTEGER,
    h1 BIGINT,
    h2 BIGINT,
    h3 BIGINT,
    h4 BIGINT
);
CREATE INDEX IF NOT EXISTS idx_key_hashes_hash ON key_hashes(h1, h2, h3, h4);
"#;

pub(crate) const UNIQUE_FULL_TUPLE_SQL: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_key_hashes_full \
     ON key_hashes(fullpath, frame, h1, h2, h3, h4)";

pub(crate) const UNIQUE_KEY_FRAME_SQL: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_key_hashes_key_frame ON key_hashes(fullpath, frame)";

/// Insert statement for one fingerprint row. A uniqueness violation means "already stored".
pub(crate) const INSERT_HASHES_SQL: &str =
    "INSERT INTO key_hashes (fullpath, frame, h1, h2, h3, h4) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

/// Exact 128-bit match.
pub(crate) const LOOKUP_HASHES_SQL: &str =
    "SELECT fullpath, frame FROM key_hashes WHERE h1 = ?1 AND h2 = ?2 AND h3 = ?3 AND h4 = ?4";

pub(crate) fn unique_index_sql(policy: UniquePolicy) -> &'static str {
    match policy {
        UniquePolicy::FullTuple => UNIQUE_FULL_TUPLE_SQL,
        UniquePolicy::KeyFrame => UNIQUE_KEY_FRAME_SQL,
    }
}
