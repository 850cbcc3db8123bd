use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::{Mode, UniquePolicy};

/// Concurrent image-sequence fingerprinting.
#[derive(Clone, Debug, Parser)]
#[command(name = "framehash")]
#[command(about = "Fingerprint <name>-<frame>.jpg images and show, store, or query them.")]
#[command(group(ArgGroup::new("mode").args(["show", "store", "query"]).multiple(false)))]
pub struct Cli {
    /// Directories to scan (not recursive). One scanner runs per directory.
    #[arg(value_name = "DIR", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// Print the fingerprint of each input image.
    #[arg(long)]
    pub show: bool,

    /// Add fingerprints to the store.
    #[arg(long)]
    pub store: bool,

    /// Look up each input fingerprint in the store and print matches.
    #[arg(long)]
    pub query: bool,

    /// SQLite store file. Required for --store and --query.
    #[arg(long, short)]
    pub db: Option<PathBuf>,

    /// Read each directory's key from this file inside the directory.
    #[arg(long, short = 'k')]
    pub keyfile: Option<String>,

    /// Number of fingerprint workers. Default: available processing units.
    #[arg(long, short = 'p', value_parser = clap::value_parser!(usize))]
    pub procs: Option<usize>,

    /// Concurrent store lookups in --query mode. Default: same as --procs.
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub lookup_procs: Option<usize>,

    /// Seconds to keep retrying a batch commit while the store is locked. Default: 30.
    #[arg(long, short = 't', value_parser = clap::value_parser!(u64))]
    pub db_timeout: Option<u64>,

    /// Uniqueness of stored rows: `full-tuple` (key, frame, fingerprint) or `key-frame`.
    #[arg(long, value_parser = parse_unique_policy)]
    pub unique: Option<UniquePolicy>,

    /// Fingerprints per store transaction. Default: 100.
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub batch_size: Option<usize>,

    /// Verbose output. `-v` alone enables it; `--verbose=false` overrides the config file.
    #[arg(
        long,
        short = 'v',
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = clap::value_parser!(bool)
    )]
    pub verbose: Option<bool>,
}

impl Cli {
    /// Mode selected on the command line, if any. Clap rejects more than one.
    pub fn mode(&self) -> Option<Mode> {
        match (self.show, self.store, self.query) {
            (true, _, _) => Some(Mode::Show),
            (_, true, _) => Some(Mode::Store),
            (_, _, true) => Some(Mode::Query),
            _ => None,
        }
    }
}

fn parse_unique_policy(s: &str) -> Result<UniquePolicy, String> {
    match s {
        "full-tuple" => Ok(UniquePolicy::FullTuple),
        "key-frame" => Ok(UniquePolicy::KeyFrame),
        other => Err(format!(
            "unknown uniqueness policy {other:?} (expected full-tuple or key-frame)"
        )),
    }
}
