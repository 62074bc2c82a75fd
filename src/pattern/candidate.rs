// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Locator candidates: DOM addressing strategies proposed for a field.
//!
//! Candidates form a closed set of strategies — id, attribute-match,
//! class-based, ancestor-qualified, and positional paths — generated by
//! walking outward from a marked anchor element. The scorer then tests each
//! candidate against every sample; generation itself never judges quality
//! beyond a coarse specificity rank used for tie-breaks.

use scraper::ElementRef;
use serde::{Deserialize, Serialize};

/// Which match to take when a selector resolves to several elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pick {
    /// The selector must resolve to exactly one element in scope.
    First,
    /// Take the n-th match (0-based); used for ordinal strategies such as
    /// spec-table cells addressed by position.
    Nth(usize),
}

/// A DOM addressing strategy: selector, optional attribute to read, and a
/// match rule, plus the stability score assigned across samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorCandidate {
    /// CSS selector, evaluated relative to the item container.
    pub selector: String,
    /// Attribute to read; `None` reads normalized text content.
    pub attribute: Option<String>,
    pub pick: Pick,
    /// Stability score in [0, 1]: fraction of samples where this locator
    /// resolves under the pick rule and the extracted value matches.
    pub score: f64,
}

impl LocatorCandidate {
    pub fn new(selector: &str, attribute: Option<&str>, pick: Pick) -> Self {
        Self {
            selector: selector.to_string(),
            attribute: attribute.map(|a| a.to_string()),
            pick,
            score: 0.0,
        }
    }

    /// Coarse robustness rank for tie-breaks among equal-score candidates.
    /// Lower is better: attribute-anchored and short selectors survive
    /// markup drift better than deep positional paths.
    pub fn specificity_rank(&self) -> u32 {
        let base = if self.selector.starts_with('#') {
            0
        } else if self.selector.contains('[') {
            10
        } else if self.selector.contains(":nth-child") {
            50
        } else if self.selector.contains(' ') {
            30
        } else if self.selector.contains('.') {
            20
        } else {
            40
        };
        base + self.selector.len().min(200) as u32
    }
}

/// Attributes considered stable enough to anchor a selector on.
const ANCHOR_ATTRS: &[&str] = &["itemprop", "name", "rel", "role", "data-type", "data-field"];

/// True when `s` is safe to embed in a CSS selector without escaping.
fn css_safe(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn simple_selector(el: &ElementRef) -> Option<String> {
    let v = el.value();
    if let Some(id) = v.id() {
        if css_safe(id) {
            return Some(format!("#{id}"));
        }
    }
    let classes: Vec<&str> = v.classes().filter(|c| css_safe(c)).collect();
    if let Some(first) = classes.first() {
        return Some(format!("{}.{}", v.name(), first));
    }
    None
}

fn parent_element<'a>(el: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.parent().and_then(ElementRef::wrap)
}

/// 1-based position of the element among its element siblings, for
/// `:nth-child` paths.
fn child_position(el: &ElementRef) -> usize {
    let mut pos = 1;
    let mut node = el.prev_sibling();
    while let Some(n) = node {
        if ElementRef::wrap(n).is_some() {
            pos += 1;
        }
        node = n.prev_sibling();
    }
    pos
}

/// Generate candidate locators for a marked anchor element.
///
/// `attr_hints` lists attributes whose value (rather than text content) may
/// hold the field's value — `href`/`src` for URL-shaped fields. One
/// candidate set is emitted per applicable read mode.
pub fn generate_candidates(anchor: &ElementRef, attr_hints: &[&str]) -> Vec<LocatorCandidate> {
    let mut reads: Vec<Option<&str>> = vec![None];
    for hint in attr_hints {
        if anchor.value().attr(hint).is_some() {
            reads.push(Some(hint));
        }
    }

    let mut out = Vec::new();
    for read in reads {
        for selector in selector_strategies(anchor) {
            out.push(LocatorCandidate {
                selector: selector.0,
                attribute: read.map(|a| a.to_string()),
                pick: selector.1,
                score: 0.0,
            });
        }
    }

    // De-duplicate while keeping generation order (stable for determinism).
    let mut seen = std::collections::HashSet::new();
    out.retain(|c| seen.insert((c.selector.clone(), c.attribute.clone(), c.pick)));
    out
}

/// The closed set of selector strategies for one anchor, inner to outer.
fn selector_strategies(anchor: &ElementRef) -> Vec<(String, Pick)> {
    let mut out: Vec<(String, Pick)> = Vec::new();
    let v = anchor.value();
    let tag = v.name().to_string();

    // Strategy: #id
    if let Some(id) = v.id() {
        if css_safe(id) {
            out.push((format!("#{id}"), Pick::First));
        }
    }

    // Strategy: tag[attr="value"]
    for attr in ANCHOR_ATTRS {
        if let Some(val) = v.attr(attr) {
            if css_safe(val) {
                out.push((format!(r#"{tag}[{attr}="{val}"]"#), Pick::First));
            }
        }
    }

    // Strategy: tag.class (single and first pair)
    let classes: Vec<&str> = v.classes().filter(|c| css_safe(c)).collect();
    for class in &classes {
        out.push((format!("{tag}.{class}"), Pick::First));
    }
    if classes.len() >= 2 {
        out.push((format!("{tag}.{}.{}", classes[0], classes[1]), Pick::First));
    }

    // Strategy: ancestor-qualified (one and two levels up)
    let self_simple = simple_selector(anchor).unwrap_or_else(|| tag.clone());
    let mut level = parent_element(anchor);
    for _ in 0..2 {
        let Some(parent) = level else { break };
        if let Some(parent_simple) = simple_selector(&parent) {
            out.push((format!("{parent_simple} {self_simple}"), Pick::First));
        }
        level = parent_element(&parent);
    }

    // Strategy: positional path, anchored at the nearest id/classed ancestor
    // (or three levels up, whichever comes first). Last resort.
    let mut path = format!("{tag}:nth-child({})", child_position(anchor));
    let mut cursor = parent_element(anchor);
    for _ in 0..3 {
        let Some(parent) = cursor else { break };
        if let Some(parent_simple) = simple_selector(&parent) {
            out.push((format!("{parent_simple} > {path}"), Pick::First));
            break;
        }
        path = format!(
            "{}:nth-child({}) > {path}",
            parent.value().name(),
            child_position(&parent)
        );
        cursor = parent_element(&parent);
    }

    // Strategy: bare tag under the anchor's parent, by ordinal. Covers
    // spec-table cells (`td` picked by position).
    if let Some(parent) = parent_element(anchor) {
        let ordinal = parent
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|sib| sib.value().name() == tag)
            .position(|sib| sib.id() == anchor.id());
        if let Some(i) = ordinal {
            out.push((tag.clone(), Pick::Nth(i)));
        }
    }

    out
}
