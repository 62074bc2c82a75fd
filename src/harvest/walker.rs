// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pagination walker: a lazy, finite sequence of listing-page URLs.
//!
//! The walker hands out one `CrawlTask` per listing page and consumes
//! feedback through `record_result`. It never restarts: once it reports
//! end-of-listing (an observed empty page), hits the page cap, or hits the
//! item cap, no further URLs are produced.

use crate::harvest::task::CrawlTask;
use anyhow::{Context, Result};
use url::Url;

/// Build the URL for one listing page by setting the page-number query
/// parameter, replacing any existing value and keeping other parameters.
pub fn page_url(category_url: &str, page_param: &str, page: u32) -> Result<String> {
    let mut url = Url::parse(category_url)
        .with_context(|| format!("invalid category url '{category_url}'"))?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != page_param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(kept);
        pairs.append_pair(page_param, &page.to_string());
    }
    Ok(url.into())
}

#[derive(Debug, Clone)]
pub struct WalkerConfig {
    pub category_url: String,
    /// Query parameter carrying the page number. Most catalogs use `page`.
    pub page_param: String,
    pub max_pages: u32,
    pub max_items: Option<u64>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            category_url: String::new(),
            page_param: "page".to_string(),
            max_pages: 50,
            max_items: None,
        }
    }
}

#[derive(Debug)]
pub struct PaginationWalker {
    config: WalkerConfig,
    next_page: u32,
    items_seen: u64,
    last_item_count: Option<usize>,
    ended: bool,
}

impl PaginationWalker {
    pub fn new(config: WalkerConfig) -> Self {
        Self {
            config,
            next_page: 1,
            items_seen: 0,
            last_item_count: None,
            ended: false,
        }
    }

    /// Next listing page to visit, or `None` when the walk is over.
    pub fn next_task(&mut self) -> Result<Option<CrawlTask>> {
        if self.ended || self.next_page > self.config.max_pages {
            return Ok(None);
        }
        if let Some(cap) = self.config.max_items {
            if self.items_seen >= cap {
                return Ok(None);
            }
        }
        let page_index = self.next_page;
        self.next_page += 1;
        let url = page_url(&self.config.category_url, &self.config.page_param, page_index)?;
        Ok(Some(CrawlTask {
            url,
            page_index,
            item_hint: self.last_item_count,
        }))
    }

    /// Feed back the item count observed on a completed page. Zero items
    /// means the listing ran out; the walk ends there, normally.
    pub fn record_result(&mut self, _page_index: u32, item_count: usize) {
        if item_count == 0 {
            self.ended = true;
            return;
        }
        self.items_seen += item_count as u64;
        self.last_item_count = Some(item_count);
    }

    /// True once an empty page has been observed.
    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn max_items(&self) -> Option<u64> {
        self.config.max_items
    }
}
