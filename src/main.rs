//! Framehash CLI: fingerprint frame directories; store, query, or show the fingerprints.

use anyhow::Result;
use clap::Parser;
use framehash::engine::arg_parser::Cli;
use framehash::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
