// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for learning, mapping storage, and harvesting.
//!
//! Field-level and task-level failures are accumulated and reported in the
//! final summary; only structural failures (unreadable mapping document,
//! version mismatch) abort a run immediately.

use thiserror::Error;

/// Errors raised by the pattern learner.
#[derive(Debug, Error)]
pub enum LearnError {
    /// No candidate locator for the field cleared the acceptance threshold.
    #[error("no stable locator for field '{field}' (best score {best_score:.2}, threshold {threshold:.2})")]
    NoStableLocator {
        field: String,
        best_score: f64,
        threshold: f64,
    },

    /// One or more required fields were unlearnable. Reports all of them at
    /// once rather than failing on the first.
    #[error("pattern learning failed for {category}: unlearnable fields [{}]", missing.join(", "))]
    PatternLearningFailed {
        category: String,
        missing: Vec<String>,
    },

    /// Fewer sample pages were captured than the scorer needs.
    #[error("not enough sample pages: got {got}, need at least {need}")]
    NotEnoughSamples { got: usize, need: usize },

    /// A probe list does not line up with the captured samples.
    #[error("probe values for field '{field}' cover {got} samples, expected {expected}")]
    ProbeMismatch {
        field: String,
        got: usize,
        expected: usize,
    },
}

/// Errors raised when loading or saving a pattern mapping document.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The document is malformed: bad JSON, missing required keys.
    #[error("corrupt mapping document: {0}")]
    Corrupt(String),

    /// The document's version tag is incompatible with this build's
    /// extraction script generator.
    #[error("mapping version mismatch: document is '{found}', this build expects '{expected}'")]
    VersionMismatch { found: String, expected: String },

    #[error("mapping io: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-task errors during the harvesting pass. Retried up to a bound, then
/// downgraded to a recorded failure — never fatal to the whole run.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("navigation timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("extraction script failed: {0}")]
    Script(String),
}
