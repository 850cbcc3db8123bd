//! Classify store failures: lock contention is retryable, uniqueness violations are absorbed.

use rusqlite::{ErrorCode, ffi};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Another writer holds the database.
    Locked,
    /// Row already stored under the unique index.
    Duplicate,
    Other,
}

pub fn classify(err: &rusqlite::Error) -> StoreErrorKind {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => match e.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => StoreErrorKind::Locked,
            ErrorCode::ConstraintViolation
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                StoreErrorKind::Duplicate
            }
            _ => StoreErrorKind::Other,
        },
        _ => StoreErrorKind::Other,
    }
}

/// Classify an error that may wrap a `rusqlite::Error` under context.
pub fn classify_error(err: &anyhow::Error) -> StoreErrorKind {
    err.downcast_ref::<rusqlite::Error>()
        .map(classify)
        .unwrap_or(StoreErrorKind::Other)
}

pub fn is_locked(err: &anyhow::Error) -> bool {
    classify_error(err) == StoreErrorKind::Locked
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn failure(code: std::ffi::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn busy_and_locked_are_locked() {
        assert_eq!(classify(&failure(ffi::SQLITE_BUSY)), StoreErrorKind::Locked);
        assert_eq!(classify(&failure(ffi::SQLITE_LOCKED)), StoreErrorKind::Locked);
    }

    #[test]
    fn unique_violation_is_duplicate() {
        assert_eq!(
            classify(&failure(ffi::SQLITE_CONSTRAINT_UNIQUE)),
            StoreErrorKind::Duplicate
        );
        assert_eq!(
            classify(&failure(ffi::SQLITE_CONSTRAINT_NOTNULL)),
            StoreErrorKind::Other
        );
    }

    #[test]
    fn classification_sees_through_context() {
        let err = Err::<(), _>(failure(ffi::SQLITE_BUSY))
            .context("commit transaction")
            .unwrap_err();
        assert!(is_locked(&err));
        assert!(!is_locked(&anyhow::anyhow!("database is locked")));
    }
}
