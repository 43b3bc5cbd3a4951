//! Terminal progress bar for a single file transfer

use civico_core::{ProgressEvent, ProgressSink};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})";

/// Progress bar driven by every chunk the engine writes
pub struct FileProgress {
    bar: ProgressBar,
}

impl FileProgress {
    /// Hidden bars are used for JSON output so stdout stays clean
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::no_length()
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub fn already_complete(&self, name: &str) {
        self.bar.finish_and_clear();
        if !self.bar.is_hidden() {
            println!("{}", crate::output::already_complete_line(name));
        }
    }

    pub fn complete(&self) {
        self.bar.finish_with_message("done");
    }

    pub fn abandon(&self, reason: &str) {
        self.bar
            .abandon_with_message(format!("{} {}", style("✗").red().bold(), reason));
    }
}

impl ProgressSink for FileProgress {
    fn begin(&mut self, initial: ProgressEvent) {
        let template = match initial.total {
            Some(total) => {
                self.bar.set_length(total);
                BAR_TEMPLATE
            }
            None => SPINNER_TEMPLATE,
        };
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            self.bar.set_style(style.progress_chars("█▓▒░  "));
        }
        self.bar.set_position(initial.downloaded);
    }

    fn report(&mut self, event: ProgressEvent) {
        if let Some(total) = event.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(event.downloaded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_resumed_position_and_total() {
        let mut progress = FileProgress::new(false);
        progress.begin(ProgressEvent::new(8192, Some(100_000)));
        assert_eq!(progress.bar.position(), 8192);
        assert_eq!(progress.bar.length(), Some(100_000));

        progress.report(ProgressEvent::new(16384, Some(100_000)));
        assert_eq!(progress.bar.position(), 16384);
    }
}
