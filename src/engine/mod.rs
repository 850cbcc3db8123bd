//! Engine module: CLI surface, fingerprinting, filename rules, and store operations

pub mod arg_parser;
pub mod cli;
pub mod db_ops;
pub mod fingerprint;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{handle_run, setup_opts};
pub use db_ops::{
    BatchOutcome, Store, StoreErrorKind, StoredMatch, count_rows, insert_batch,
    lookup_fingerprint, open_db, open_db_in_memory, open_db_read_only, retry_while_locked,
};
pub use fingerprint::{BlockMeanHasher, Fingerprinter, decode_grayscale};
pub use tools::{FrameName, derive_key, parse_frame_filename, path_to_db_string, read_key_file};
