pub mod config;
pub mod framehash_toml;
pub mod interrupt;
pub mod logger;

pub use config::*;
pub use framehash_toml::{FramehashToml, apply_file_to_opts, load_framehash_toml};
pub use interrupt::install_interrupt_diagnostics;
pub use logger::setup_logging;
