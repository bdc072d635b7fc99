use dsu_core::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn spinner(message: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(80));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(style.tick_chars("/|\\- "));
    }
    spinner.set_message(message.to_string());
    spinner
}

/// Progress bar fed by the scheduler's completion counter.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(message: &str, visible: bool) -> Self {
        let bar = if visible { ProgressBar::new(0) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}") {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(message.to_string());
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.enable_steady_tick(Duration::from_millis(120));
    }

    /// Completions can be reported out of order; the bar only moves forward.
    fn advance(&self, _completed: usize, _total: usize) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_never_moves_backwards() {
        let progress = BarProgress::new("Analyzing updates", false);
        progress.start(3);
        progress.advance(2, 3);
        progress.advance(1, 3);
        assert_eq!(progress.bar.position(), 2);
        progress.advance(3, 3);
        assert_eq!(progress.bar.position(), 3);
        progress.finish();
    }
}
