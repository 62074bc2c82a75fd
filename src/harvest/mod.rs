// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Harvesting: replay a learned pattern across listing pages with a bounded
//! pool of browser tabs.

pub mod pool;
pub mod summary;
pub mod task;
pub mod walker;

pub use pool::{PoolConfig, TabPool};
pub use summary::RunSummary;
pub use task::{CrawlTask, TaskOutcome};
pub use walker::{page_url, PaginationWalker, WalkerConfig};
