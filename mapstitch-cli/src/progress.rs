//! Terminal progress bar for the fetch phase.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use mapstitch::pipeline::ProgressSink;

const TEMPLATE: &str =
    "{spinner} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos:>6}/{len:6} tiles {per_sec} ETA {eta}";

/// Shows fetched tiles on an indicatif bar drawn to stderr.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// Creates a bar; `hidden` suppresses drawing (e.g. with `--quiet`).
    pub fn new(hidden: bool) -> Self {
        let bar = ProgressBar::with_draw_target(
            Some(0),
            if hidden {
                ProgressDrawTarget::hidden()
            } else {
                ProgressDrawTarget::stderr()
            },
        );
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }

    /// Current bar position, for tests.
    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressSink for BarProgress {
    fn on_start(&mut self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn on_tile(&mut self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }

    fn on_finish(&mut self, completed: usize, total: usize) {
        if completed == total {
            self.bar.finish();
        } else {
            self.bar.abandon();
        }
    }
}
