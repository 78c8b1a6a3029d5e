//! Progress reporting for harvest batches.
//!
//! The CLI uses `IndicatifReporter` for a visible completed/total bar.
//! Library callers can use `NoopReporter` or provide their own implementation.
//! The harvester calls `advance(1)` exactly once per finished task, from a
//! single join loop, so implementations never see concurrent `advance` calls
//! from the same batch.

use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Trait for reporting progress of a harvest batch.
pub trait ProgressReporter: Send + Sync + std::fmt::Debug {
    /// Begin a new batch of `total` tasks.
    fn start(&self, task: &str, total: u64);

    /// Record `amount` more finished tasks.
    fn advance(&self, amount: u64);

    /// Mark the current batch as finished.
    fn finish(&self);

    /// Display an informational message.
    fn message(&self, msg: &str);
}

/// No-op reporter for library callers that don't need progress output.
#[derive(Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn start(&self, _task: &str, _total: u64) {}
    fn advance(&self, _amount: u64) {}
    fn finish(&self) {}
    fn message(&self, _msg: &str) {}
}

/// Reporter backed by an `indicatif` progress bar on stderr.
#[derive(Debug)]
pub struct IndicatifReporter {
    bar: ProgressBar,
    completed: AtomicU64,
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatifReporter {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A reporter that tracks counts but draws nothing (for `--quiet`).
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            bar: ProgressBar::with_draw_target(Some(0), target),
            completed: AtomicU64::new(0),
        }
    }

    /// Tasks finished in the current batch.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl ProgressReporter for IndicatifReporter {
    fn start(&self, task: &str, total: u64) {
        self.completed.store(0, Ordering::Relaxed);
        self.bar.set_length(total);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            self.bar.set_style(style.progress_chars("=> "));
        }
        self.bar.set_message(task.to_string());
        self.bar.reset();
    }

    fn advance(&self, amount: u64) {
        self.completed.fetch_add(amount, Ordering::Relaxed);
        self.bar.inc(amount);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn message(&self, msg: &str) {
        self.bar.println(msg);
    }
}
