//! Query sink: a fixed pool of lookup threads, each with its own read connection.

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use log::{debug, error};
use rusqlite::Connection;
use std::path::Path;
use std::thread::{self, JoinHandle};

use crate::engine::db_ops::{Store, StoredMatch, lookup_fingerprint};
use crate::engine::progress::tick;
use crate::pipeline::context::{bump, drop_one, flush_out, write_line};
use crate::{Fingerprint, ImageDescriptor};

use super::SinkContext;

/// `path<TAB>fingerprint<TAB>[key#frame, ...]`; an empty list means no stored match.
pub fn format_query_line(path: &Path, fp: &Fingerprint, matches: &[StoredMatch]) -> String {
    let list = matches
        .iter()
        .map(|m| format!("{}#{}", m.key, m.frame))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}\t{}\t[{}]", path.display(), fp, list)
}

/// Look up one descriptor and print its result. Lookup failures are logged and counted;
/// only a write error is returned.
fn lookup_and_print(
    conn: Option<&Connection>,
    desc: &ImageDescriptor,
    ctx: &SinkContext,
) -> Result<()> {
    let Some(fp) = desc.fingerprint else {
        return Ok(());
    };
    let Some(conn) = conn else {
        bump(&ctx.stats.lookups_failed, 1);
        error!("lookup {}: no store connection", desc.path.display());
        return Ok(());
    };

    bump(&ctx.stats.lookups_in_flight, 1);
    let res = lookup_fingerprint(conn, &fp);
    drop_one(&ctx.stats.lookups_in_flight);

    let mut matches = match res {
        Ok(m) => m,
        Err(e) => {
            bump(&ctx.stats.lookups_failed, 1);
            error!("lookup {}: {:#}", desc.path.display(), e);
            return Ok(());
        }
    };
    matches.sort();
    bump(&ctx.stats.lookups, 1);
    bump(&ctx.stats.matches, matches.len());
    write_line(&ctx.out, &format_query_line(&desc.path, &fp, &matches))
        .with_context(|| format!("write matches for {}", desc.path.display()))?;
    bump(&ctx.stats.printed, 1);
    Ok(())
}

fn lookup_worker_loop(
    output_rx: Receiver<ImageDescriptor>,
    store: Store,
    ctx: SinkContext,
) -> Result<()> {
    // A worker that cannot connect keeps draining so upstream never stalls; its lookups fail.
    let conn = store
        .connect()
        .map_err(|e| error!("lookup worker: {:#}", e))
        .ok();
    while let Ok(desc) = output_rx.recv() {
        tick(ctx.bar.as_ref());
        lookup_and_print(conn.as_ref(), &desc, &ctx)?;
    }
    Ok(())
}

/// Run `lookups` lookup threads over the output channel and wait for all of them. The first
/// write error, if any, is returned after every thread has stopped.
pub fn run_query_sink(
    output_rx: Receiver<ImageDescriptor>,
    store: Store,
    lookups: usize,
    ctx: SinkContext,
) -> Result<()> {
    debug!("query sink: {} lookup threads", lookups);
    let handles: Vec<JoinHandle<Result<()>>> = (0..lookups)
        .map(|_| {
            let output_rx = output_rx.clone();
            let store = store.clone();
            let ctx = ctx.clone();
            thread::spawn(move || lookup_worker_loop(output_rx, store, ctx))
        })
        .collect();
    drop(output_rx);

    let mut first_err = None;
    for h in handles {
        let res = h
            .join()
            .unwrap_or_else(|_| Err(anyhow::anyhow!("lookup thread panicked")));
        if let Err(e) = res {
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => flush_out(&ctx.out).context("flush output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_line_lists_matches() {
        let fp = Fingerprint::from_words([1, 2, 3, 4]);
        let matches = vec![
            StoredMatch {
                key: "d1/img".to_string(),
                frame: 1,
            },
            StoredMatch {
                key: "d2/img".to_string(),
                frame: 7,
            },
        ];
        assert_eq!(
            format_query_line(Path::new("d1/img-1.jpg"), &fp, &matches),
            "d1/img-1.jpg\t00000001000000020000000300000004\t[d1/img#1, d2/img#7]"
        );
    }

    #[test]
    fn no_match_prints_empty_list() {
        let fp = Fingerprint::from_words([0; 4]);
        assert!(format_query_line(Path::new("x-1.jpg"), &fp, &[]).ends_with("\t[]"));
    }
}
