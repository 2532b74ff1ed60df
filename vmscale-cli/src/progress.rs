use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{prefix} {percent:>3}%|{wide_bar}| {pos}/{len} \
                        [{elapsed_precise}<{eta_precise}, {per_sec}] {msg}";

/// Per-item counter drawn on stderr; hidden when stderr is not a terminal.
pub fn counter(len: u64, prefix: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    match ProgressStyle::with_template(TEMPLATE) {
        Ok(style) => bar.set_style(style),
        Err(e) => tracing::debug!(error = %e, "falling back to default style"),
    }
    bar.set_prefix(prefix);
    bar
}
