// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training loop never prints or writes files itself. It hands
// typed events to a ProgressReporter, and whoever built the run
// decides where they go:
//
//   - ConsoleReporter → terminal lines + tracing events
//   - MetricsLogger   → one CSV row per epoch
//   - (a, b)          → both, in order
//   - tests           → a Vec that records every event
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::report::{EpochSummary, TestSummary, WindowReport};

/// Receives progress events from the Trainer and the TrainingRun.
///
/// Every method defaults to a no-op so a reporter only implements
/// the events it cares about.
pub trait ProgressReporter {
    fn window_report(&mut self, _report: &WindowReport) -> Result<()> {
        Ok(())
    }

    fn epoch_summary(&mut self, _summary: &EpochSummary) -> Result<()> {
        Ok(())
    }

    fn test_summary(&mut self, _summary: &TestSummary) -> Result<()> {
        Ok(())
    }
}

impl<R: ProgressReporter + ?Sized> ProgressReporter for &mut R {
    fn window_report(&mut self, report: &WindowReport) -> Result<()> {
        (**self).window_report(report)
    }

    fn epoch_summary(&mut self, summary: &EpochSummary) -> Result<()> {
        (**self).epoch_summary(summary)
    }

    fn test_summary(&mut self, summary: &TestSummary) -> Result<()> {
        (**self).test_summary(summary)
    }
}

/// Fan an event out to two reporters, first `.0` then `.1`.
impl<A: ProgressReporter, C: ProgressReporter> ProgressReporter for (A, C) {
    fn window_report(&mut self, report: &WindowReport) -> Result<()> {
        self.0.window_report(report)?;
        self.1.window_report(report)
    }

    fn epoch_summary(&mut self, summary: &EpochSummary) -> Result<()> {
        self.0.epoch_summary(summary)?;
        self.1.epoch_summary(summary)
    }

    fn test_summary(&mut self, summary: &TestSummary) -> Result<()> {
        self.0.test_summary(summary)?;
        self.1.test_summary(summary)
    }
}
