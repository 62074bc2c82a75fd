//! Browser engine abstraction.
//!
//! `Browser` and `Tab` split engine lifecycle from per-tab navigation and
//! script evaluation, so the learner and the tab pool never depend on
//! chromiumoxide directly — tests drive them with an in-memory fake.

pub mod chromium;
pub mod filter;

#[cfg(test)]
pub mod fake;

use anyhow::Result;
use async_trait::async_trait;

/// A browser engine that can open isolated tabs.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a fresh tab with the resource filter installed, ready to
    /// navigate.
    async fn new_tab(&self) -> Result<Box<dyn Tab>>;
    /// Shut down the engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently open tabs.
    fn active_tabs(&self) -> usize;
}

/// One isolated browser tab.
#[async_trait]
pub trait Tab: Send + Sync {
    /// Navigate to a URL, waiting up to `timeout_ms` for the document.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()>;
    /// Evaluate JavaScript in the page and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;
    /// Full DOM snapshot (`document.documentElement.outerHTML`).
    async fn content(&self) -> Result<String>;
    /// Close this tab.
    async fn close(self: Box<Self>) -> Result<()>;
}
