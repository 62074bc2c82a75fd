// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Locator candidate scoring across sample DOM snapshots.
//!
//! Everything here is **synchronous** because the `scraper` crate's types
//! are `!Send` — async callers wrap scoring in `tokio::task::spawn_blocking`.
//!
//! Score = (# samples where the locator resolves under its pick rule and the
//! extracted value matches the expected value) / N. Matching allows
//! normalized whitespace/punctuation and recognizes the catalog's checkmark
//! glyphs. Ties between equal-score candidates go to the lower specificity
//! rank (shorter, attribute-anchored selectors beat deep positional paths),
//! then to lexicographic selector order, which keeps repeated runs on the
//! same samples byte-for-byte deterministic.

use crate::error::LearnError;
use crate::pattern::candidate::{generate_candidates, LocatorCandidate, Pick};
use crate::pattern::fields::{FieldSpec, ValueShape};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Default acceptance threshold. A tunable parameter, not a constant baked
/// into call sites.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Minimum number of sample pages the scorer accepts.
pub const MIN_SAMPLES: usize = 2;

/// Glyphs the catalog uses as "checked" marks in spec tables.
const CHECK_MARKS: &[&str] = &["○", "O", "o", "●"];

/// One captured sample page: URL plus full DOM snapshot.
#[derive(Debug, Clone)]
pub struct SamplePage {
    pub url: String,
    pub html: String,
}

/// Scores locator candidates for one field across all samples.
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    pub threshold: f64,
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Scorer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Propose and score candidates for `spec`, returning the best candidate
    /// at or above the acceptance threshold.
    ///
    /// `expected` holds the field's known value on each sample, in sample
    /// order. `container` scopes resolution to the item subtree holding the
    /// anchor when the item-container selector is already known; otherwise
    /// the whole document is the scope.
    pub fn score_field(
        &self,
        samples: &[SamplePage],
        expected: &[String],
        spec: &FieldSpec,
        container: Option<&str>,
    ) -> Result<LocatorCandidate, LearnError> {
        if samples.len() < MIN_SAMPLES {
            return Err(LearnError::NotEnoughSamples {
                got: samples.len(),
                need: MIN_SAMPLES,
            });
        }
        if expected.len() != samples.len() {
            return Err(LearnError::ProbeMismatch {
                field: spec.name.clone(),
                got: expected.len(),
                expected: samples.len(),
            });
        }

        let hints = attr_hints(spec.shape);
        let docs: Vec<Html> = samples.iter().map(|s| Html::parse_document(&s.html)).collect();

        // Propose candidates from every sample's anchor, preserving order.
        let mut candidates: Vec<LocatorCandidate> = Vec::new();
        for (doc, exp) in docs.iter().zip(expected) {
            if let Some(anchor) = find_anchor(doc, exp, &hints) {
                candidates.extend(generate_candidates(&anchor, &hints));
            }
        }
        let mut seen = std::collections::HashSet::new();
        candidates.retain(|c| seen.insert((c.selector.clone(), c.attribute.clone(), c.pick)));

        let mut best: Option<LocatorCandidate> = None;
        for mut cand in candidates {
            let mut hits = 0usize;
            for (i, doc) in docs.iter().enumerate() {
                if resolve_matches(doc, &cand, &expected[i], spec.shape, container, &hints) {
                    hits += 1;
                }
            }
            cand.score = hits as f64 / docs.len() as f64;

            let better = match &best {
                None => true,
                Some(b) => {
                    (cand.score, std::cmp::Reverse(cand.specificity_rank()), &cand.selector)
                        > (b.score, std::cmp::Reverse(b.specificity_rank()), &b.selector)
                }
            };
            if better {
                best = Some(cand);
            }
        }

        match best {
            Some(c) if c.score >= self.threshold => Ok(c),
            Some(c) => Err(LearnError::NoStableLocator {
                field: spec.name.clone(),
                best_score: c.score,
                threshold: self.threshold,
            }),
            None => Err(LearnError::NoStableLocator {
                field: spec.name.clone(),
                best_score: 0.0,
                threshold: self.threshold,
            }),
        }
    }
}

/// Learn the item-container selector: the outermost ancestor of the
/// name-field anchor whose selector repeats across the listing in every
/// sample.
///
/// Listing pages carry many item cards, so a genuine container selector
/// matches at least twice per sample and one of its matches holds the
/// anchor. Inner wrappers repeat too, so the outermost repeating ancestor
/// (the card root, which holds every field) wins over the closest one.
pub fn learn_item_selector(samples: &[SamplePage], name_expected: &[String]) -> Option<String> {
    let docs: Vec<Html> = samples.iter().map(|s| Html::parse_document(&s.html)).collect();

    // Candidate container selectors from the first sample's anchor, walking
    // outward, then tested outermost first.
    let first_anchor = find_anchor(docs.first()?, name_expected.first()?, &[])?;
    let mut candidates: Vec<String> = Vec::new();
    let mut cursor = first_anchor.parent().and_then(ElementRef::wrap);
    while let Some(el) = cursor {
        if let Some(sel) = container_selector(&el) {
            if !candidates.contains(&sel) {
                candidates.push(sel);
            }
        }
        cursor = el.parent().and_then(ElementRef::wrap);
    }
    candidates.reverse();

    'candidate: for sel_str in candidates {
        let Ok(sel) = Selector::parse(&sel_str) else { continue };
        for (doc, exp) in docs.iter().zip(name_expected) {
            let matches: Vec<ElementRef> = doc.select(&sel).collect();
            if matches.len() < 2 {
                continue 'candidate;
            }
            let anchored = matches.iter().any(|container| {
                find_anchor_in(container, exp, &[]).is_some()
            });
            if !anchored {
                continue 'candidate;
            }
        }
        return Some(sel_str);
    }
    None
}

fn container_selector(el: &ElementRef) -> Option<String> {
    let v = el.value();
    let class = v.classes().find(|c| {
        !c.is_empty()
            && !c.starts_with(|ch: char| ch.is_ascii_digit())
            && c.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    })?;
    Some(format!("{}.{}", v.name(), class))
}

/// Attributes that may carry the value for a given shape.
fn attr_hints(shape: ValueShape) -> Vec<&'static str> {
    match shape {
        ValueShape::Url => vec!["href", "src", "data-src", "data-origin"],
        _ => Vec::new(),
    }
}

/// Find the marked anchor: the first element whose extracted value matches
/// the expected value.
fn find_anchor<'a>(doc: &'a Html, expected: &str, hints: &[&str]) -> Option<ElementRef<'a>> {
    let root = doc.root_element();
    find_anchor_in(&root, expected, hints)
}

fn find_anchor_in<'a>(
    scope: &ElementRef<'a>,
    expected: &str,
    hints: &[&str],
) -> Option<ElementRef<'a>> {
    let want = normalize_text(expected);
    if want.is_empty() {
        return None;
    }
    let all = Selector::parse("*").ok()?;
    let matches: Vec<ElementRef<'a>> = scope
        .select(&all)
        .filter(|el| {
            let by_attr = hints.iter().any(|hint| {
                el.value()
                    .attr(hint)
                    .map_or(false, |val| normalize_text(val) == want)
            });
            by_attr || normalize_text(&element_text(el)) == want
        })
        .collect();

    // An element's text aggregates its whole subtree, so when the value is
    // an element's entire text every ancestor up to <html> matches too.
    // The marked element is the deepest match: keep only elements with no
    // matching descendant.
    matches
        .iter()
        .find(|el| {
            !matches
                .iter()
                .any(|other| other.id() != el.id() && is_strict_ancestor(el, other))
        })
        .copied()
}

/// True when `ancestor` is a proper ancestor of `el`.
fn is_strict_ancestor(ancestor: &ElementRef, el: &ElementRef) -> bool {
    let mut cursor = el.parent();
    while let Some(node) = cursor {
        if node.id() == ancestor.id() {
            return true;
        }
        cursor = node.parent();
    }
    false
}

/// Resolve a candidate in one sample and check the extracted value.
fn resolve_matches(
    doc: &Html,
    cand: &LocatorCandidate,
    expected: &str,
    shape: ValueShape,
    container: Option<&str>,
    hints: &[&str],
) -> bool {
    let Ok(sel) = Selector::parse(&cand.selector) else {
        return false;
    };

    // Scope: the container subtree holding this sample's anchor, else the
    // whole document.
    let scoped: Vec<ElementRef> = match container.and_then(|c| Selector::parse(c).ok()) {
        Some(container_sel) => {
            let Some(scope) = doc
                .select(&container_sel)
                .find(|el| find_anchor_in(el, expected, hints).is_some())
            else {
                return false;
            };
            scope.select(&sel).collect()
        }
        None => doc.select(&sel).collect(),
    };

    let el = match cand.pick {
        Pick::First => {
            if scoped.len() != 1 {
                return false;
            }
            scoped[0]
        }
        Pick::Nth(i) => match scoped.get(i) {
            Some(el) => *el,
            None => return false,
        },
    };

    let raw = match &cand.attribute {
        Some(attr) => el.value().attr(attr).unwrap_or_default().to_string(),
        None => element_text(&el),
    };

    shape_ok(&raw, shape) && normalize_text(&raw) == normalize_text(expected)
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

/// Best-effort shape check on the raw extracted value.
fn shape_ok(raw: &str, shape: ValueShape) -> bool {
    let t = raw.trim();
    match shape {
        ValueShape::Text | ValueShape::List => !t.is_empty(),
        ValueShape::NumericText => t.chars().any(|c| c.is_ascii_digit()),
        ValueShape::Url => {
            t.starts_with("http://")
                || t.starts_with("https://")
                || t.starts_with("//")
                || t.starts_with('/')
        }
    }
}

/// Compiled once; normalization runs once per candidate per sample inside
/// the scoring loops.
fn paren_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\([^)]*\)").expect("paren regex is valid"))
}

/// Normalize text for comparison: strip catalog boilerplate and
/// parentheticals, unify checkmark glyphs, drop commas, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut t = s.trim().to_string();

    // Trailing boilerplate the catalog appends to spec-table values.
    for marker in ["인증번호", "바로가기"] {
        if let Some(pos) = t.find(marker) {
            t.truncate(pos);
        }
    }

    t = paren_regex().replace_all(&t, "").to_string();
    t = t.replace(',', "");

    let collapsed = t.split_whitespace().collect::<Vec<_>>().join(" ");

    // A bare checkmark cell compares equal regardless of which glyph the
    // template happened to use.
    if CHECK_MARKS.contains(&collapsed.as_str()) {
        return "○".to_string();
    }
    collapsed
}
