//! Retry a store operation while the database is locked by another writer.

use anyhow::Result;
use log::debug;
use rand::Rng;
use std::thread;
use std::time::{Duration, Instant};

use crate::utils::config::RetryConsts;

use super::is_locked;

/// Run `f`, retrying with jittered exponential backoff while it fails with lock contention and
/// `timeout` has not elapsed since the first attempt. Any other error, or the last lock error
/// once the budget is spent, is returned. `f` always runs at least once.
pub fn retry_while_locked<T, F>(timeout: Duration, mut f: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let start = Instant::now();
    let mut backoff = RetryConsts::INITIAL_BACKOFF;
    let mut attempt = 1_u32;
    loop {
        let err = match f() {
            Ok(v) => {
                if attempt > 1 {
                    debug!("store unlocked after {} attempts", attempt);
                }
                return Ok(v);
            }
            Err(e) => e,
        };
        let elapsed = start.elapsed();
        if !is_locked(&err) || elapsed >= timeout {
            return Err(err);
        }
        let jitter_us = rand::rng().random_range(0..=backoff.as_micros() as u64);
        let delay = (backoff + Duration::from_micros(jitter_us)).min(timeout - elapsed);
        debug!(
            "store locked (attempt {}), retrying in {:?}",
            attempt, delay
        );
        thread::sleep(delay);
        backoff = (backoff * 2).min(RetryConsts::MAX_BACKOFF);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn locked() -> anyhow::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_BUSY), None).into()
    }

    #[test]
    fn succeeds_after_transient_lock() {
        let mut calls = 0;
        let out = retry_while_locked(Duration::from_secs(5), || {
            calls += 1;
            if calls < 3 { Err(locked()) } else { Ok(calls) }
        })
        .unwrap();
        assert_eq!(out, 3);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let mut calls = 0;
        let res: Result<()> = retry_while_locked(Duration::from_secs(5), || {
            calls += 1;
            Err(anyhow::anyhow!("disk I/O error"))
        });
        assert!(res.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn gives_up_after_timeout_with_last_error() {
        let mut calls = 0;
        let res: Result<()> = retry_while_locked(Duration::from_millis(20), || {
            calls += 1;
            Err(locked())
        });
        let err = res.unwrap_err();
        assert!(is_locked(&err));
        assert!(calls >= 2);
    }

    #[test]
    fn zero_timeout_still_attempts_once() {
        let mut calls = 0;
        let res = retry_while_locked(Duration::ZERO, || {
            calls += 1;
            Ok::<_, anyhow::Error>(())
        });
        assert!(res.is_ok());
        assert_eq!(calls, 1);
    }
}
