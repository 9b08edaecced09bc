//! Build status reporting.
//!
//! The runner announces its plan, each target as it starts and finishes, and
//! a final summary. [`TextReporter`] writes plain labelled lines to stderr,
//! which suits logs and screen readers. [`IndicatifReporter`] drives a
//! progress bar when stderr is a terminal. [`SilentReporter`] keeps tests
//! quiet.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};

fn step_label(current: usize, total: usize, label: &str) -> String {
    format!("[{current}/{total}] {label}")
}

/// Receives progress notifications from the runner.
pub trait StatusReporter {
    /// Called once with the number of targets that will run.
    fn report_plan(&self, total: usize);

    /// Called before a target's action starts.
    fn target_started(&self, current: usize, total: usize, label: &str);

    /// Called after a target's action succeeded.
    fn target_finished(&self, label: &str);

    /// Called once after a successful run.
    fn report_complete(&self, summary: &str);
}

/// Writes static, labelled lines to stderr.
pub struct TextReporter;

impl StatusReporter for TextReporter {
    fn report_plan(&self, total: usize) {
        if total == 0 {
            drop(writeln!(io::stderr(), "Nothing to do; all targets are up to date."));
        }
    }

    fn target_started(&self, current: usize, total: usize, label: &str) {
        // Status output failures never abort a build.
        drop(writeln!(io::stderr(), "{}", step_label(current, total, label)));
    }

    fn target_finished(&self, _label: &str) {}

    fn report_complete(&self, summary: &str) {
        drop(writeln!(io::stderr(), "{summary}"));
    }
}

/// Emits nothing.
pub struct SilentReporter;

impl StatusReporter for SilentReporter {
    fn report_plan(&self, _total: usize) {}
    fn target_started(&self, _current: usize, _total: usize, _label: &str) {}
    fn target_finished(&self, _label: &str) {}
    fn report_complete(&self, _summary: &str) {}
}

/// Terminal progress bar backed by `indicatif`.
pub struct IndicatifReporter {
    bar: ProgressBar,
}

impl IndicatifReporter {
    /// Construct a reporter drawing to stderr.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr_with_hz(12));
        let style = ProgressStyle::with_template("{pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for IndicatifReporter {
    fn report_plan(&self, total: usize) {
        self.bar.set_length(u64::try_from(total).unwrap_or(u64::MAX));
        self.bar.set_position(0);
    }

    fn target_started(&self, current: usize, total: usize, label: &str) {
        if self.bar.is_hidden() {
            drop(writeln!(io::stderr(), "{}", step_label(current, total, label)));
        } else {
            self.bar.set_message(label.to_owned());
        }
    }

    fn target_finished(&self, _label: &str) {
        self.bar.inc(1);
    }

    fn report_complete(&self, summary: &str) {
        if self.bar.is_hidden() {
            drop(writeln!(io::stderr(), "{summary}"));
        } else {
            self.bar.finish_with_message(summary.to_owned());
        }
    }
}

/// Choose a reporter for the current terminal.
///
/// `verbose` runs interleave tracing output with action output, so they use
/// plain lines instead of a redrawn bar.
#[must_use]
pub fn make_reporter(verbose: bool) -> Box<dyn StatusReporter> {
    use std::io::IsTerminal;
    if !verbose && io::stderr().is_terminal() {
        Box::new(IndicatifReporter::new())
    } else {
        Box::new(TextReporter)
    }
}
