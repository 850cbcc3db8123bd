use colored::{ColoredString, Colorize};
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Short stage tag from a log target: `framehash::pipeline::sinks::store` → `store`.
fn stage_tag(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

fn level_label(level: Level) -> Option<ColoredString> {
    match level {
        Level::Error => Some("ERROR".red()),
        Level::Warn => Some("WARN".yellow()),
        Level::Debug => Some("debug".dimmed()),
        _ => None,
    }
}

/// Install the stderr logger. `verbose` lowers this crate's level to debug; dependencies stay at
/// warn unless `RUST_LOG` says otherwise. Safe to call more than once.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME").cyan();
            match level_label(record.level()) {
                Some(label) => writeln!(
                    buf,
                    "[{} {} {}] {}",
                    name,
                    label,
                    stage_tag(record.target()).white(),
                    record.args()
                ),
                None => writeln!(buf, "[{}] {}", name, record.args()),
            }
        })
        .try_init();
}
