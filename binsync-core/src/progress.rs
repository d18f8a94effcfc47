//! Stage-tagged progress reporting.
//!
//! Stages report through a [`ProgressSink`]; any `Fn(ProgressEvent)` closure
//! is a sink, so callers can forward events to a channel, a terminal line or
//! nowhere (`&|_| {}`).

use serde::Serialize;

use crate::types::Stage;

/// How far a stage has come.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Progress {
    /// Completed fraction in `0.0..=1.0`.
    Fraction(f32),
    /// The stage is running but cannot estimate completion.
    Indeterminate,
}

impl Progress {
    /// Fraction clamped into `0.0..=1.0`. NaN becomes indeterminate.
    pub fn fraction(value: f32) -> Self {
        if value.is_nan() {
            Progress::Indeterminate
        } else {
            Progress::Fraction(value.clamp(0.0, 1.0))
        }
    }

    /// `index / total` as a fraction; an empty total counts as done.
    pub fn ratio(index: usize, total: usize) -> Self {
        if total == 0 {
            Progress::Fraction(1.0)
        } else {
            Progress::fraction(index as f32 / total as f32)
        }
    }
}

/// A single progress update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub progress: Progress,
    /// Optional human-readable detail (current step, file, tool line).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProgressEvent {
    pub fn new(stage: Stage, progress: Progress) -> Self {
        Self {
            stage,
            progress,
            detail: None,
        }
    }

    pub fn indeterminate(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            progress: Progress::Indeterminate,
            detail: Some(detail.into()),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);

    /// Called exactly once when the session ends, on every exit path.
    fn finish(&self) {}
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}
