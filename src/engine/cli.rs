//! CLI command handler: resolve options (defaults ← `.framehash.toml` ← flags), then run one pass.

use anyhow::Result;
use log::{debug, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::arg_parser::Cli;
use crate::pipeline::{PipelineStats, run_with_stats};
use crate::utils::{
    FramehashToml, apply_file_to_opts, install_interrupt_diagnostics, load_framehash_toml,
    setup_logging,
};
use crate::{Opts, RunSummary};

/// Merge file settings and CLI flags into validated [`Opts`]. Flags win over the file.
pub fn setup_opts(cli: &Cli, file: Option<&FramehashToml>) -> Result<Opts> {
    let mut opts = Opts::default();
    if let Some(f) = file {
        apply_file_to_opts(f, &mut opts);
    }
    opts.mode = cli
        .mode()
        .or_else(|| file.and_then(|f| f.mode()))
        .ok_or_else(|| anyhow::anyhow!("must provide exactly one of --show, --query, --store"))?;
    opts.paths = cli.paths.clone();
    if let Some(ref db) = cli.db {
        opts.db_path = Some(db.clone());
    }
    if let Some(ref k) = cli.keyfile {
        opts.key_file = Some(k.clone());
    }
    if cli.procs.is_some() {
        opts.num_workers = cli.procs;
    }
    if cli.lookup_procs.is_some() {
        opts.lookup_workers = cli.lookup_procs;
    }
    if let Some(secs) = cli.db_timeout {
        opts.db_timeout = Duration::from_secs(secs);
    }
    if let Some(p) = cli.unique {
        opts.unique_policy = p;
    }
    if let Some(n) = cli.batch_size {
        opts.batch_size = n;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    opts.validate()?;
    Ok(opts)
}

/// Run one pipeline pass for the parsed command line.
pub fn handle_run(cli: &Cli) -> Result<RunSummary> {
    let file = load_framehash_toml(Path::new("."));
    let verbose = cli
        .verbose
        .or_else(|| {
            file.as_ref()
                .ok()
                .and_then(|f| f.as_ref())
                .and_then(|f| f.verbose())
        })
        .unwrap_or(false);
    setup_logging(verbose);
    let file = file.unwrap_or_else(|e| {
        warn!("ignoring config file: {}", e);
        None
    });

    let opts = setup_opts(cli, file.as_ref())?;
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );

    let stats = Arc::new(PipelineStats::default());
    install_interrupt_diagnostics(Arc::clone(&stats))?;
    run_with_stats(&opts, stats)
}
