// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded tab pool: runs crawl tasks concurrently against the browser,
//! feeding records to the sink as pages complete.
//!
//! A semaphore caps the number of tasks in flight at `max_tabs`. Tasks are
//! dispatched lazily from the walker with a paced delay plus jitter, so the
//! catalog sees a drip of page loads rather than a burst. Each attempt gets
//! a fresh tab; navigation and script failures are retried with exponential
//! backoff and downgraded to recorded per-page failures when retries run
//! out.

use crate::browser::Browser;
use crate::error::TaskError;
use crate::events::EventBus;
use crate::extract::{build_extraction_script, parse_records, Record};
use crate::harvest::summary::RunSummary;
use crate::harvest::task::{CrawlTask, TaskOutcome};
use crate::harvest::walker::PaginationWalker;
use crate::pattern::mapping::PatternMapping;
use crate::sink::RecordSink;
use anyhow::{Context, Result};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum tabs (tasks) in flight at once.
    pub max_tabs: usize,
    /// Base inter-dispatch delay; actual delay is base + U[0, base).
    pub delay_ms: u64,
    pub nav_timeout_ms: u64,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// First backoff; doubles per failed attempt.
    pub backoff_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_tabs: 15,
            delay_ms: 900,
            nav_timeout_ms: 20_000,
            max_retries: 2,
            backoff_ms: 500,
        }
    }
}

pub struct TabPool {
    browser: Arc<dyn Browser>,
    config: PoolConfig,
    events: EventBus,
}

impl TabPool {
    pub fn new(browser: Arc<dyn Browser>, config: PoolConfig, events: EventBus) -> Self {
        Self {
            browser,
            config,
            events,
        }
    }

    /// Run the harvest: walk listing pages, extract records, append them to
    /// the sink. Stops at max-pages, max-items, or end-of-listing,
    /// whichever comes first. Per-page failures end up in the summary, not
    /// in an error.
    pub async fn run(
        &self,
        mapping: &PatternMapping,
        mut walker: PaginationWalker,
        sink: &mut dyn RecordSink,
    ) -> Result<RunSummary> {
        let started = Instant::now();
        let script = Arc::new(build_extraction_script(mapping));
        let mapping = Arc::new(mapping.clone());
        let max_items = walker.max_items();
        let semaphore = Arc::new(Semaphore::new(self.config.max_tabs));
        let stopping = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::channel::<TaskOutcome>(self.config.max_tabs.max(1));

        let mut summary = RunSummary::default();
        let mut in_flight = 0usize;

        loop {
            // Dispatch while tabs are free and the walker still has pages.
            while semaphore.available_permits() > 0 {
                let Some(task) = walker.next_task()? else {
                    break;
                };
                let permit = Arc::clone(&semaphore)
                    .acquire_owned()
                    .await
                    .context("tab pool semaphore closed")?;
                self.events.page_started(task.page_index, &task.url);
                debug!("dispatching page {} -> {}", task.page_index, task.url);
                self.spawn_task(
                    task,
                    permit,
                    tx.clone(),
                    Arc::clone(&script),
                    Arc::clone(&mapping),
                    Arc::clone(&stopping),
                );
                in_flight += 1;
                self.pace().await;
            }

            if in_flight == 0 {
                break;
            }

            let Some(outcome) = rx.recv().await else {
                break;
            };
            in_flight -= 1;

            let was_ended = walker.ended();
            match outcome {
                TaskOutcome::Succeeded {
                    task,
                    records,
                    attempt,
                } => {
                    summary.pages_visited += 1;
                    walker.record_result(task.page_index, records.len());
                    if walker.ended() && !was_ended {
                        info!("page {} is empty, end of listing", task.page_index);
                        summary.end_of_listing = true;
                        self.events.end_of_listing(task.page_index);
                    }
                    let appended =
                        append_records(sink, &records, max_items, &mut summary)?;
                    if appended < records.len() {
                        stopping.store(true, Ordering::SeqCst);
                    }
                    self.events
                        .page_completed(task.page_index, records.len(), attempt);
                }
                TaskOutcome::Failed {
                    task,
                    attempts,
                    error,
                } => {
                    warn!(
                        "page {} failed after {attempts} attempts: {error}",
                        task.page_index
                    );
                    summary.pages_visited += 1;
                    summary.failed_pages.push(task.page_index);
                    self.events
                        .page_failed(task.page_index, attempts, &error.to_string());
                }
                TaskOutcome::Skipped { task } => {
                    debug!("page {} skipped, run is stopping", task.page_index);
                    summary.skipped_pages += 1;
                }
            }
        }

        summary.failed_pages.sort_unstable();
        summary.elapsed = started.elapsed();
        sink.flush()?;
        self.events.run_complete(
            summary.pages_visited,
            summary.records_emitted,
            summary.failed_count(),
        );
        info!(
            "harvest done: {} pages, {} records, {} failed in {:.1}s",
            summary.pages_visited,
            summary.records_emitted,
            summary.failed_count(),
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    async fn pace(&self) {
        if self.config.delay_ms == 0 {
            return;
        }
        let jitter = {
            let mut rng = rand::thread_rng();
            rng.gen_range(0..self.config.delay_ms)
        };
        tokio::time::sleep(Duration::from_millis(self.config.delay_ms + jitter)).await;
    }

    fn spawn_task(
        &self,
        task: CrawlTask,
        permit: OwnedSemaphorePermit,
        tx: mpsc::Sender<TaskOutcome>,
        script: Arc<String>,
        mapping: Arc<PatternMapping>,
        stopping: Arc<AtomicBool>,
    ) {
        let browser = Arc::clone(&self.browser);
        let config = self.config.clone();
        tokio::spawn(async move {
            let _permit = permit;
            if stopping.load(Ordering::SeqCst) {
                let _ = tx.send(TaskOutcome::Skipped { task }).await;
                return;
            }

            let mut attempt = 0u32;
            let outcome = loop {
                attempt += 1;
                match run_attempt(&*browser, &task, &script, &mapping, config.nav_timeout_ms)
                    .await
                {
                    Ok(records) => {
                        break TaskOutcome::Succeeded {
                            task,
                            records,
                            attempt,
                        }
                    }
                    Err(error) if attempt <= config.max_retries => {
                        let backoff = config.backoff_ms << (attempt - 1);
                        warn!(
                            "page {} attempt {attempt} failed ({error}), retrying in {backoff}ms",
                            task.page_index
                        );
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                    Err(error) => {
                        break TaskOutcome::Failed {
                            task,
                            attempts: attempt,
                            error,
                        }
                    }
                }
            };
            let _ = tx.send(outcome).await;
        });
    }
}

/// One attempt on a fresh tab. The tab is closed whatever happens.
async fn run_attempt(
    browser: &dyn Browser,
    task: &CrawlTask,
    script: &str,
    mapping: &PatternMapping,
    nav_timeout_ms: u64,
) -> Result<Vec<Record>, TaskError> {
    let mut tab = browser
        .new_tab()
        .await
        .map_err(|e| TaskError::Navigation(format!("failed to open tab: {e:#}")))?;

    let result = async {
        tab.navigate(&task.url, nav_timeout_ms)
            .await
            .map_err(|e| classify_nav_error(e, nav_timeout_ms))?;
        let value = tab
            .evaluate(script)
            .await
            .map_err(|e| TaskError::Script(format!("{e:#}")))?;
        parse_records(task.page_index, &task.url, &value, mapping)
    }
    .await;

    tab.close().await.ok();
    result
}

fn classify_nav_error(e: anyhow::Error, nav_timeout_ms: u64) -> TaskError {
    let message = format!("{e:#}");
    if message.contains("timed out") {
        TaskError::Timeout { ms: nav_timeout_ms }
    } else {
        TaskError::Navigation(message)
    }
}

/// Append records up to the item cap; returns how many were appended.
fn append_records(
    sink: &mut dyn RecordSink,
    records: &[Record],
    max_items: Option<u64>,
    summary: &mut RunSummary,
) -> Result<usize> {
    let mut appended = 0;
    for record in records {
        if let Some(cap) = max_items {
            if summary.records_emitted >= cap {
                break;
            }
        }
        sink.append(record)?;
        summary.records_emitted += 1;
        appended += 1;
    }
    Ok(appended)
}
