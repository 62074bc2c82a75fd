// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pattern learner: drives sample pages through a browser and assembles a
//! validated pattern mapping.
//!
//! The human-marked anchors arrive as `FieldProbes` — for each field, its
//! known value on every sample page, in sample order. The learner only
//! captures DOM snapshots and runs the scorer; how the probes were marked
//! is the calling workflow's concern.

use crate::browser::Browser;
use crate::error::LearnError;
use crate::harvest::walker::page_url;
use crate::pattern::fields::catalog_fields;
use crate::pattern::mapping::{FieldLocator, PatternMapping};
use crate::pattern::scorer::{learn_item_selector, SamplePage, Scorer};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Request to learn a pattern for one category.
#[derive(Debug, Clone)]
pub struct LearnRequest {
    pub category_url: String,
    /// Number of sample listing pages to capture (K).
    pub sample_pages: u32,
    /// Query parameter carrying the page number.
    pub page_param: String,
    /// Acceptance threshold for locator scores.
    pub threshold: f64,
    pub nav_timeout_ms: u64,
}

impl Default for LearnRequest {
    fn default() -> Self {
        Self {
            category_url: String::new(),
            sample_pages: 3,
            page_param: "page".to_string(),
            threshold: crate::pattern::scorer::DEFAULT_THRESHOLD,
            nav_timeout_ms: 15_000,
        }
    }
}

/// Per-field expected values, one per sample page, in sample order.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FieldProbes(pub HashMap<String, Vec<String>>);

impl FieldProbes {
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.0.get(field)
    }

    /// Keep only the probe entries for the sample pages that were actually
    /// captured. `kept` holds 0-based indices into the requested page
    /// sequence. A probe list whose length does not cover the request is
    /// left as-is and surfaces as `ProbeMismatch` during scoring.
    fn select_pages(&self, kept: &[usize], requested: usize) -> FieldProbes {
        let map = self
            .0
            .iter()
            .map(|(field, values)| {
                let aligned = if values.len() == requested {
                    kept.iter().map(|&i| values[i].clone()).collect()
                } else {
                    values.clone()
                };
                (field.clone(), aligned)
            })
            .collect();
        FieldProbes(map)
    }
}

/// Drives learning runs against a browser engine.
pub struct PatternLearner {
    browser: Arc<dyn Browser>,
}

impl PatternLearner {
    pub fn new(browser: Arc<dyn Browser>) -> Self {
        Self { browser }
    }

    /// Learn a pattern mapping for the requested category.
    ///
    /// Every unlearnable *required* field is gathered before failing with
    /// `PatternLearningFailed`; no partial mapping is produced. Optional
    /// fields that cannot be learned are dropped with a warning.
    pub async fn learn(
        &self,
        request: &LearnRequest,
        probes: &FieldProbes,
    ) -> Result<PatternMapping> {
        info!(
            "learning pattern for {} ({} sample pages)",
            request.category_url, request.sample_pages
        );

        let (samples, kept) = self.capture_samples(request).await?;
        info!("captured {} sample snapshots", samples.len());

        // A failed sample page drops out of both the samples and the probe
        // lists, so the remaining pairs stay aligned.
        let probes = probes.select_pages(&kept, request.sample_pages as usize);
        let category_url = request.category_url.clone();
        let threshold = request.threshold;

        // Scorer types (scraper) are !Send; do all DOM work on a blocking
        // thread.
        let mapping = tokio::task::spawn_blocking(move || {
            assemble_mapping(&category_url, &samples, &probes, threshold)
        })
        .await
        .context("scoring task panicked")??;

        info!(
            "learned pattern for {}: {} fields, item selector '{}'",
            mapping.category_url,
            mapping.entries.len(),
            mapping.item_selector
        );
        Ok(mapping)
    }

    /// Capture sample snapshots, returning them with the 0-based indices
    /// of the requested pages that actually loaded.
    async fn capture_samples(
        &self,
        request: &LearnRequest,
    ) -> Result<(Vec<SamplePage>, Vec<usize>)> {
        let mut samples = Vec::new();
        let mut kept = Vec::new();
        for page_no in 1..=request.sample_pages {
            let url = page_url(&request.category_url, &request.page_param, page_no)?;
            let mut tab = self.browser.new_tab().await?;
            let outcome = async {
                tab.navigate(&url, request.nav_timeout_ms).await?;
                tab.content().await
            }
            .await;
            tab.close().await.ok();

            match outcome {
                Ok(html) => {
                    samples.push(SamplePage { url, html });
                    kept.push((page_no - 1) as usize);
                }
                // A missing sample page is not fatal as long as enough
                // remain for the scorer.
                Err(e) => warn!("sample page {page_no} failed: {e:#}"),
            }
        }
        Ok((samples, kept))
    }
}

/// Score every field and assemble the mapping. Synchronous; runs inside
/// `spawn_blocking`.
fn assemble_mapping(
    category_url: &str,
    samples: &[SamplePage],
    probes: &FieldProbes,
    threshold: f64,
) -> Result<PatternMapping, LearnError> {
    let scorer = Scorer::new(threshold);
    let mut missing: Vec<String> = Vec::new();
    let mut entries: Vec<FieldLocator> = Vec::new();

    // The item container comes first: field locators resolve inside it.
    let name_probes = probes.get("name").cloned().unwrap_or_default();
    let item_selector = if name_probes.len() == samples.len() {
        learn_item_selector(samples, &name_probes)
    } else {
        None
    };
    if item_selector.is_none() {
        missing.push("item_container".to_string());
    }
    let container = item_selector.as_deref();

    for field in catalog_fields() {
        let Some(expected) = probes.get(&field.name) else {
            if field.required {
                missing.push(field.name.clone());
            }
            continue;
        };

        match scorer.score_field(samples, expected, &field, container) {
            Ok(locator) => {
                info!(
                    "field '{}' -> '{}' (score {:.2})",
                    field.name, locator.selector, locator.score
                );
                entries.push(FieldLocator { field, locator });
            }
            Err(e) if field.required => {
                warn!("required field unlearnable: {e}");
                missing.push(field.name.clone());
            }
            Err(e) => {
                warn!("optional field '{}' dropped: {e}", field.name);
            }
        }
    }

    if !missing.is_empty() {
        return Err(LearnError::PatternLearningFailed {
            category: category_url.to_string(),
            missing,
        });
    }

    Ok(PatternMapping::new(
        category_url,
        item_selector.as_deref().unwrap_or_default(),
        entries,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeBrowser;
    use crate::pattern::candidate::Pick;

    fn listing_html(items: &[(&str, &str, &str, &str, &str)]) -> String {
        let cards: String = items
            .iter()
            .map(|(name, url, img, min, max)| {
                format!(
                    r#"<li class="prod-item">
                         <div class="prod-info">
                           <p class="prod-name"><a class="prod-link" href="{url}">{name}</a></p>
                           <img class="thumb" src="{img}">
                           <span class="price-min">{min}</span>
                           <span class="price-max">{max}</span>
                         </div>
                       </li>"#
                )
            })
            .collect();
        format!(r#"<html><body><ul class="prod-list">{cards}</ul></body></html>"#)
    }

    fn probes() -> FieldProbes {
        let mut map = HashMap::new();
        map.insert("name".into(), vec!["Alpha Stroller".into(), "Gamma Seat".into()]);
        map.insert("url".into(), vec!["/product/a1".into(), "/product/g1".into()]);
        map.insert(
            "image".into(),
            vec!["//img.example/a1.jpg".into(), "//img.example/g1.jpg".into()],
        );
        map.insert("price_min".into(), vec!["1000".into(), "3000".into()]);
        map.insert("price_max".into(), vec!["2000".into(), "4000".into()]);
        FieldProbes(map)
    }

    fn seeded_browser() -> FakeBrowser {
        let browser = FakeBrowser::new();
        browser.insert_page(
            "https://catalog.example/list?cate=1&page=1",
            &listing_html(&[
                ("Alpha Stroller", "/product/a1", "//img.example/a1.jpg", "1,000", "2,000"),
                ("Beta Stroller", "/product/b1", "//img.example/b1.jpg", "1,500", "2,500"),
            ]),
            serde_json::Value::Null,
        );
        browser.insert_page(
            "https://catalog.example/list?cate=1&page=2",
            &listing_html(&[
                ("Gamma Seat", "/product/g1", "//img.example/g1.jpg", "3,000", "4,000"),
                ("Delta Seat", "/product/d1", "//img.example/d1.jpg", "3,500", "4,500"),
            ]),
            serde_json::Value::Null,
        );
        browser
    }

    fn request() -> LearnRequest {
        LearnRequest {
            category_url: "https://catalog.example/list?cate=1".to_string(),
            sample_pages: 2,
            ..LearnRequest::default()
        }
    }

    #[tokio::test]
    async fn test_learns_full_mapping() {
        let learner = PatternLearner::new(Arc::new(seeded_browser()));
        let mapping = learner.learn(&request(), &probes()).await.unwrap();

        assert_eq!(mapping.item_selector, "li.prod-item");
        assert_eq!(
            mapping.field_names(),
            ["name", "url", "image", "price_min", "price_max"]
        );
        for entry in &mapping.entries {
            assert!(entry.locator.score >= crate::pattern::scorer::DEFAULT_THRESHOLD);
        }
        let url_entry = mapping.entries.iter().find(|e| e.field.name == "url").unwrap();
        assert_eq!(url_entry.locator.attribute.as_deref(), Some("href"));
        let min_entry = mapping
            .entries
            .iter()
            .find(|e| e.field.name == "price_min")
            .unwrap();
        assert_eq!(min_entry.locator.selector, "span.price-min");
        assert_eq!(min_entry.locator.pick, Pick::First);
    }

    #[tokio::test]
    async fn test_reports_all_missing_fields_at_once() {
        let learner = PatternLearner::new(Arc::new(seeded_browser()));
        let mut p = probes();
        // No probes for image or price_max: both must be reported together.
        p.0.remove("image");
        p.0.remove("price_max");

        let err = learner.learn(&request(), &p).await.unwrap_err();
        let learn_err = err.downcast_ref::<LearnError>().unwrap();
        match learn_err {
            LearnError::PatternLearningFailed { category, missing } => {
                assert_eq!(category, "https://catalog.example/list?cate=1");
                assert!(missing.contains(&"image".to_string()));
                assert!(missing.contains(&"price_max".to_string()));
                assert_eq!(missing.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_mid_run_sample_failure_keeps_probes_aligned() {
        // Page 2 of 3 never loads. Its probe entries must drop out with
        // it, so pages 1 and 3 still line up with their expected values
        // and the mapping is learned from the two surviving samples.
        let browser = FakeBrowser::new();
        browser.insert_page(
            "https://catalog.example/list?cate=1&page=1",
            &listing_html(&[
                ("Alpha Stroller", "/product/a1", "//img.example/a1.jpg", "1,000", "2,000"),
                ("Beta Stroller", "/product/b1", "//img.example/b1.jpg", "1,500", "2,500"),
            ]),
            serde_json::Value::Null,
        );
        browser.insert_page(
            "https://catalog.example/list?cate=1&page=2",
            "<html></html>",
            serde_json::Value::Null,
        );
        browser.fail_times("https://catalog.example/list?cate=1&page=2", 5);
        browser.insert_page(
            "https://catalog.example/list?cate=1&page=3",
            &listing_html(&[
                ("Gamma Seat", "/product/g1", "//img.example/g1.jpg", "3,000", "4,000"),
                ("Delta Seat", "/product/d1", "//img.example/d1.jpg", "3,500", "4,500"),
            ]),
            serde_json::Value::Null,
        );

        let mut map = HashMap::new();
        map.insert(
            "name".into(),
            vec!["Alpha Stroller".into(), "Lost Page Item".into(), "Gamma Seat".into()],
        );
        map.insert(
            "url".into(),
            vec!["/product/a1".into(), "/product/x9".into(), "/product/g1".into()],
        );
        map.insert(
            "image".into(),
            vec![
                "//img.example/a1.jpg".into(),
                "//img.example/x9.jpg".into(),
                "//img.example/g1.jpg".into(),
            ],
        );
        map.insert("price_min".into(), vec!["1000".into(), "9999".into(), "3000".into()]);
        map.insert("price_max".into(), vec!["2000".into(), "9999".into(), "4000".into()]);

        let learner = PatternLearner::new(Arc::new(browser));
        let mut req = request();
        req.sample_pages = 3;
        let mapping = learner.learn(&req, &FieldProbes(map)).await.unwrap();
        assert_eq!(mapping.item_selector, "li.prod-item");
        assert_eq!(
            mapping.field_names(),
            ["name", "url", "image", "price_min", "price_max"]
        );
    }

    #[tokio::test]
    async fn test_tolerates_one_failed_sample_page() {
        let browser = seeded_browser();
        browser.insert_page(
            "https://catalog.example/list?cate=1&page=3",
            "<html></html>",
            serde_json::Value::Null,
        );
        // Page 3 never loads; pages 1-2 still satisfy the scorer.
        browser.fail_times("https://catalog.example/list?cate=1&page=3", 5);
        let learner = PatternLearner::new(Arc::new(browser));
        let mut req = request();
        req.sample_pages = 3;
        let mapping = learner.learn(&req, &probes()).await.unwrap();
        assert_eq!(mapping.item_selector, "li.prod-item");
    }
}
