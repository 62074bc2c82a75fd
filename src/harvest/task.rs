// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Crawl tasks and their terminal outcomes.

use crate::error::TaskError;
use crate::extract::Record;

/// One listing page to visit.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlTask {
    pub url: String,
    /// 1-based listing page number.
    pub page_index: u32,
    /// Item count observed on the most recent completed page, if any.
    /// Sizing hint only; never affects correctness.
    pub item_hint: Option<usize>,
}

/// Terminal state of one task after all retry attempts.
#[derive(Debug)]
pub enum TaskOutcome {
    /// The page loaded and the extraction script ran. `records` may be
    /// empty; an empty listing page is a normal end-of-listing signal,
    /// not a failure.
    Succeeded {
        task: CrawlTask,
        records: Vec<Record>,
        /// Attempt number that succeeded (1 = first try).
        attempt: u32,
    },
    /// All attempts exhausted. Recorded in the run summary; never fatal.
    Failed {
        task: CrawlTask,
        attempts: u32,
        error: TaskError,
    },
    /// The run was already stopping when this task came up; nothing was
    /// navigated.
    Skipped { task: CrawlTask },
}

impl TaskOutcome {
    pub fn page_index(&self) -> u32 {
        match self {
            TaskOutcome::Succeeded { task, .. }
            | TaskOutcome::Failed { task, .. }
            | TaskOutcome::Skipped { task } => task.page_index,
        }
    }
}
