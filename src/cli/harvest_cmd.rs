// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! `gleaner harvest` — replay a learned mapping across listing pages.

use crate::browser::chromium::ChromiumBrowser;
use crate::events::{EventBus, HarvestEvent};
use crate::harvest::pool::{PoolConfig, TabPool};
use crate::harvest::walker::{PaginationWalker, WalkerConfig};
use crate::pattern::fields::catalog_fields;
use crate::pattern::mapping::PatternMapping;
use crate::sink::CsvSink;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct HarvestOpts {
    /// Overrides the mapping's stored category URL when set.
    pub category_url: Option<String>,
    pub mapping: std::path::PathBuf,
    pub output: std::path::PathBuf,
    pub max_pages: u32,
    pub max_items: Option<u64>,
    pub tabs: usize,
    pub delay_ms: u64,
    pub page_param: String,
    pub retries: u32,
    pub nav_timeout_ms: u64,
    pub headed: bool,
    pub quiet: bool,
}

pub async fn run(opts: &HarvestOpts) -> Result<()> {
    let mapping = PatternMapping::load(&opts.mapping)
        .with_context(|| format!("failed to load mapping {}", opts.mapping.display()))?;
    let category_url = opts
        .category_url
        .clone()
        .unwrap_or_else(|| mapping.category_url.clone());
    info!(
        "harvesting {} with {} tabs (mapping {})",
        category_url,
        opts.tabs,
        opts.mapping.display()
    );

    let browser = ChromiumBrowser::launch(!opts.headed).await?;

    let walker = PaginationWalker::new(WalkerConfig {
        category_url,
        page_param: opts.page_param.clone(),
        max_pages: opts.max_pages,
        max_items: opts.max_items,
    });

    let events = EventBus::new(256);
    let progress = if opts.quiet {
        None
    } else {
        Some(spawn_progress(&events))
    };

    let pool = TabPool::new(
        Arc::new(browser),
        PoolConfig {
            max_tabs: opts.tabs,
            delay_ms: opts.delay_ms,
            nav_timeout_ms: opts.nav_timeout_ms,
            max_retries: opts.retries,
            ..PoolConfig::default()
        },
        events,
    );

    // Always the full declared header, whatever subset the mapping learned.
    let fields: Vec<String> = catalog_fields().into_iter().map(|f| f.name).collect();
    let mut sink = CsvSink::create(&opts.output, &fields)?;

    let summary = pool.run(&mapping, walker, &mut sink).await?;

    if let Some((bar, listener)) = progress {
        listener.await.ok();
        bar.finish_and_clear();
    }

    eprintln!(
        "  Harvested {} records from {} pages in {:.1}s",
        summary.records_emitted,
        summary.pages_visited,
        summary.elapsed.as_secs_f64()
    );
    if summary.end_of_listing {
        eprintln!("  Listing ended naturally.");
    }
    if !summary.failed_pages.is_empty() {
        eprintln!(
            "  {} pages failed and were skipped: {:?}",
            summary.failed_pages.len(),
            summary.failed_pages
        );
    }
    eprintln!("  Output written to {}", opts.output.display());
    Ok(())
}

fn spawn_progress(events: &EventBus) -> (ProgressBar, tokio::task::JoinHandle<()>) {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let mut rx = events.subscribe();
    let handle = {
        let bar = bar.clone();
        tokio::spawn(async move {
            let mut records = 0u64;
            while let Ok(event) = rx.recv().await {
                match event {
                    HarvestEvent::PageCompleted {
                        page_index,
                        records: n,
                        ..
                    } => {
                        records += n as u64;
                        bar.set_message(format!("page {page_index} done, {records} records"));
                    }
                    HarvestEvent::PageFailed { page_index, .. } => {
                        bar.set_message(format!("page {page_index} failed"));
                    }
                    HarvestEvent::EndOfListing { page_index, .. } => {
                        bar.set_message(format!("end of listing at page {page_index}"));
                    }
                    HarvestEvent::RunComplete { .. } => break,
                    HarvestEvent::PageStarted { .. } => {}
                }
            }
        })
    };
    (bar, handle)
}
