//! Chromium engine via chromiumoxide.

use super::filter::install_resource_filter;
use super::{Browser, Tab};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Desktop user agent presented to the catalog. Headless Chromium's default
/// UA gets listing pages served in a degraded template.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. GLEANER_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("GLEANER_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.gleaner/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".gleaner/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".gleaner/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".gleaner/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".gleaner/chromium/chrome-linux64/chrome"),
                home.join(".gleaner/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based browser engine.
pub struct ChromiumBrowser {
    browser: CdpBrowser,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumBrowser {
    /// Launch a Chromium instance. `headless` is false only for debugging a
    /// category's template interactively.
    pub async fn launch(headless: bool) -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Install Chrome or set GLEANER_CHROMIUM_PATH.")?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(1366, 800)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Drain CDP events for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn new_tab(&self) -> Result<Box<dyn Tab>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new tab")?;

        page.set_user_agent(USER_AGENT)
            .await
            .context("failed to set user agent")?;

        // The resource filter must be live before the first navigation.
        install_resource_filter(&page)
            .await
            .context("failed to install resource filter")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumTab {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        // The browser process exits when ChromiumBrowser is dropped.
        Ok(())
    }

    fn active_tabs(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium tab.
pub struct ChromiumTab {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

#[async_trait]
impl Tab for ChromiumTab {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()> {
        // One deadline over goto AND the load wait; a page that commits
        // navigation but never reaches load must not hold the tab open.
        let nav = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| anyhow::anyhow!("navigation failed: {e}"))?;
            let _ = self.page.wait_for_navigation().await;
            Ok(())
        };

        match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), nav).await {
            Ok(result) => result,
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS evaluation failed")?;

        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn content(&self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        let html: String = result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))?;

        Ok(html)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_navigate_and_evaluate() {
        let browser = ChromiumBrowser::launch(true)
            .await
            .expect("failed to launch browser");
        let mut tab = browser.new_tab().await.expect("failed to open tab");

        tab.navigate("data:text/html,<h1>Hello</h1><p>World</p>", 10000)
            .await
            .expect("navigation failed");

        let result = tab
            .evaluate("document.querySelector('h1').textContent")
            .await
            .expect("evaluation failed");
        assert_eq!(result.as_str().unwrap(), "Hello");

        let html = tab.content().await.expect("content failed");
        assert!(html.contains("<h1>Hello</h1>"));

        tab.close().await.expect("close failed");
        assert_eq!(browser.active_tabs(), 0);
        browser.shutdown().await.expect("shutdown failed");
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_navigate_deadline_covers_stalled_loads() {
        let browser = ChromiumBrowser::launch(true)
            .await
            .expect("failed to launch browser");
        let mut tab = browser.new_tab().await.expect("failed to open tab");

        // Non-routable address: the connection hangs rather than failing
        // fast, so only the deadline can end the attempt.
        let started = std::time::Instant::now();
        let err = tab
            .navigate("http://10.255.255.1/", 500)
            .await
            .expect_err("stalled navigation must time out");
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));

        tab.close().await.expect("close failed");
        browser.shutdown().await.expect("shutdown failed");
    }
}
