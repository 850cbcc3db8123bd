use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use std::path::Path;

use crate::{Fingerprint, ImageDescriptor};

use super::SinkContext;
use crate::engine::progress::tick;
use crate::pipeline::context::{SharedOut, bump, flush_out, write_line};

/// Tab-separated `path<TAB>fingerprint`.
pub fn format_show_line(path: &Path, fp: &Fingerprint) -> String {
    format!("{}\t{}", path.display(), fp)
}

/// Print every fingerprinted descriptor in arrival order. A write error ends the sink and fails
/// the run; upstream stages then see their sends fail and wind down.
pub fn run_show_sink(output_rx: Receiver<ImageDescriptor>, ctx: SinkContext) -> Result<()> {
    while let Ok(desc) = output_rx.recv() {
        tick(ctx.bar.as_ref());
        let Some(fp) = desc.fingerprint else {
            continue;
        };
        print_show_line(&ctx.out, &desc.path, &fp)?;
        bump(&ctx.stats.printed, 1);
    }
    flush_out(&ctx.out).context("flush output")
}

fn print_show_line(out: &SharedOut, path: &Path, fp: &Fingerprint) -> Result<()> {
    write_line(out, &format_show_line(path, fp))
        .with_context(|| format!("write fingerprint for {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn show_line_is_path_tab_hex() {
        let fp = Fingerprint::from_words([0, 1, 0xdeadbeef, u32::MAX]);
        assert_eq!(
            format_show_line(&PathBuf::from("d1/img-1.jpg"), &fp),
            "d1/img-1.jpg\t0000000000000001deadbeefffffffff"
        );
    }
}
