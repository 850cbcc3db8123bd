//! Progress counter for fingerprints reaching the sink

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " frames"
    )))
}

/// Force a refresh of the bar (e.g. so the counter shows "0 frames" immediately).
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Update progress bar if available.
/// Uses try_lock so a contended bar never stalls a sink; the next update catches up.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Verbose runs get a counter; quiet runs get None.
pub fn maybe_counter(verbose: bool, desc: &'static str) -> Option<ProgressBar> {
    verbose.then(|| {
        let bar = create_counter(desc);
        refresh_bar(&bar);
        bar
    })
}

/// Tick an optional counter by one.
pub fn tick(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        update_progress_bar(pb, 1);
    }
}
