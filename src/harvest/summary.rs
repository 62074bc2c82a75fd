// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run summary: the accumulator the orchestrator owns for one harvest run.

use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Pages that completed navigation, successfully or not.
    pub pages_visited: u32,
    /// Records handed to the sink.
    pub records_emitted: u64,
    /// Page indices whose retries were exhausted, kept for a later retry
    /// run.
    pub failed_pages: Vec<u32>,
    /// Tasks dropped because the run was already stopping.
    pub skipped_pages: u32,
    /// True when the walk ended on an observed empty page rather than a
    /// cap.
    pub end_of_listing: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn failed_count(&self) -> u32 {
        self.failed_pages.len() as u32
    }
}
