// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! `gleaner learn` — infer a pattern mapping from sample pages.

use crate::browser::chromium::ChromiumBrowser;
use crate::pattern::learner::{FieldProbes, LearnRequest, PatternLearner};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Options for one learning run.
#[derive(Debug, Clone)]
pub struct LearnOpts {
    pub category_url: String,
    /// JSON file mapping each field to its known value on every sample
    /// page, in page order.
    pub probes: std::path::PathBuf,
    pub output: std::path::PathBuf,
    pub sample_pages: u32,
    pub page_param: String,
    pub threshold: f64,
    pub nav_timeout_ms: u64,
    pub headed: bool,
}

pub async fn run(opts: &LearnOpts) -> Result<()> {
    let probes = load_probes(&opts.probes)?;

    let browser = ChromiumBrowser::launch(!opts.headed).await?;
    let learner = PatternLearner::new(Arc::new(browser));

    let request = LearnRequest {
        category_url: opts.category_url.clone(),
        sample_pages: opts.sample_pages,
        page_param: opts.page_param.clone(),
        threshold: opts.threshold,
        nav_timeout_ms: opts.nav_timeout_ms,
    };

    let mapping = learner.learn(&request, &probes).await?;
    mapping
        .save(&opts.output)
        .with_context(|| format!("failed to write mapping to {}", opts.output.display()))?;

    info!("mapping written to {}", opts.output.display());
    eprintln!(
        "  Learned {} fields for {} (item selector '{}')",
        mapping.entries.len(),
        mapping.category_url,
        mapping.item_selector
    );
    eprintln!("  Mapping saved to {}", opts.output.display());
    Ok(())
}

fn load_probes(path: &Path) -> Result<FieldProbes> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read probe file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid probe file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_probes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probes.json");
        std::fs::write(
            &path,
            r#"{"name": ["Alpha", "Beta"], "price_min": ["1000", "2000"]}"#,
        )
        .unwrap();
        let probes = load_probes(&path).unwrap();
        assert_eq!(probes.get("name").unwrap().len(), 2);
        assert_eq!(probes.get("price_min").unwrap()[1], "2000");
    }

    #[test]
    fn test_load_probes_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probes.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_probes(&path).is_err());
    }
}
