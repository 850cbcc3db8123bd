//! Terminal stage: one sink per run, chosen by [`Mode`].

pub mod query;
pub mod show;
pub mod store;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::db_ops::Store;
use crate::engine::progress::ProgressBar;
use crate::{ImageDescriptor, Mode, Opts};

use super::context::{PipelineStats, SharedOut};

pub use query::{format_query_line, run_query_sink};
pub use show::{format_show_line, run_show_sink};
pub use store::{commit_batch, run_store_sink};

/// State every sink and its sub-tasks share.
#[derive(Clone)]
pub struct SinkContext {
    pub out: SharedOut,
    pub stats: Arc<PipelineStats>,
    pub bar: Option<ProgressBar>,
}

/// Start the sink for `opts.mode` on its own thread. Joining the handle waits for the sink and
/// every commit or lookup it started.
pub fn spawn_sink(
    opts: &Opts,
    store: Option<Store>,
    output_rx: Receiver<ImageDescriptor>,
    ctx: SinkContext,
) -> Result<JoinHandle<Result<()>>> {
    let handle = match opts.mode {
        Mode::Show => thread::spawn(move || run_show_sink(output_rx, ctx)),
        Mode::Store => {
            let store = store.context("store mode needs an open store")?;
            let batch_size = opts.batch_size;
            let timeout = opts.db_timeout;
            thread::spawn(move || run_store_sink(output_rx, store, batch_size, timeout, ctx))
        }
        Mode::Query => {
            let store = store.context("query mode needs an open store")?;
            let lookups = opts.lookups();
            thread::spawn(move || run_query_sink(output_rx, store, lookups, ctx))
        }
    };
    Ok(handle)
}
