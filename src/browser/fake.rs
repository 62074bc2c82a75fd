//! In-memory fake browser for tests: canned pages, injectable navigation
//! failures, and a high-water mark of concurrently open tabs.

use super::{Browser, Tab};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct FakePage {
    pub html: String,
    pub eval_result: serde_json::Value,
}

#[derive(Default)]
struct FakeState {
    pages: Mutex<HashMap<String, FakePage>>,
    /// Remaining forced navigation failures per URL.
    failures: Mutex<HashMap<String, usize>>,
    /// Log of successfully navigated URLs.
    visits: Mutex<Vec<String>>,
    active: AtomicUsize,
    high_water: AtomicUsize,
    nav_delay_ms: u64,
}

pub struct FakeBrowser {
    state: Arc<FakeState>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::with_nav_delay(5)
    }

    /// `nav_delay_ms` keeps navigations overlapping so the high-water mark
    /// actually observes concurrency.
    pub fn with_nav_delay(nav_delay_ms: u64) -> Self {
        Self {
            state: Arc::new(FakeState {
                nav_delay_ms,
                ..FakeState::default()
            }),
        }
    }

    pub fn insert_page(&self, url: &str, html: &str, eval_result: serde_json::Value) {
        self.state.pages.lock().unwrap().insert(
            url.to_string(),
            FakePage {
                html: html.to_string(),
                eval_result,
            },
        );
    }

    /// Make the next `n` navigations to `url` fail.
    pub fn fail_times(&self, url: &str, n: usize) {
        self.state.failures.lock().unwrap().insert(url.to_string(), n);
    }

    /// Highest number of tabs open at the same time.
    pub fn high_water(&self) -> usize {
        self.state.high_water.load(Ordering::SeqCst)
    }

    /// Successful navigations to `url`.
    pub fn visit_count(&self, url: &str) -> usize {
        self.state
            .visits
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_tab(&self) -> Result<Box<dyn Tab>> {
        let n = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.high_water.fetch_max(n, Ordering::SeqCst);
        Ok(Box::new(FakeTab {
            state: Arc::clone(&self.state),
            current: None,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_tabs(&self) -> usize {
        self.state.active.load(Ordering::SeqCst)
    }
}

struct FakeTab {
    state: Arc<FakeState>,
    current: Option<FakePage>,
}

#[async_trait]
impl Tab for FakeTab {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()> {
        tokio::time::sleep(std::time::Duration::from_millis(self.state.nav_delay_ms)).await;

        {
            let mut failures = self.state.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(url) {
                if *left > 0 {
                    *left -= 1;
                    bail!("navigation timed out after {timeout_ms}ms");
                }
            }
        }

        let page = self.state.pages.lock().unwrap().get(url).cloned();
        match page {
            Some(p) => {
                self.state.visits.lock().unwrap().push(url.to_string());
                self.current = Some(p);
                Ok(())
            }
            None => bail!("navigation failed: unknown url {url}"),
        }
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        match &self.current {
            Some(p) => Ok(p.eval_result.clone()),
            None => bail!("no page loaded"),
        }
    }

    async fn content(&self) -> Result<String> {
        match &self.current {
            Some(p) => Ok(p.html.clone()),
            None => bail!("no page loaded"),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
