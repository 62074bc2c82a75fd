// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Extraction: compile a pattern mapping into a single in-page script and
//! parse its result back into records.
//!
//! One `evaluate()` round-trip per page. The script walks every item
//! container, reads each field through its learned locator, absolutizes
//! URL-shaped values against the page location, and returns one JSON object
//! per item.

use crate::error::TaskError;
use crate::pattern::candidate::Pick;
use crate::pattern::fields::ValueShape;
use crate::pattern::mapping::PatternMapping;
use std::fmt::Write as _;

/// One harvested catalog item.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based listing page number this item came from.
    pub page_index: u32,
    pub page_url: String,
    /// Field values in mapping entry order.
    pub values: Vec<(String, String)>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v.as_str())
    }
}

fn js_str(s: &str) -> String {
    // serde_json string encoding is valid JS.
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Compile the mapping into a self-contained IIFE returning an array of
/// objects, one per item container on the page.
pub fn build_extraction_script(mapping: &PatternMapping) -> String {
    let mut script = String::new();
    script.push_str("(() => {\n");
    script.push_str("  const abs = (v) => { try { return new URL(v, location.href).href; } catch (_) { return v; } };\n");
    script.push_str("  const text = (el) => (el.textContent || '').replace(/\\s+/g, ' ').trim();\n");
    let _ = writeln!(
        script,
        "  const items = document.querySelectorAll({});",
        js_str(&mapping.item_selector)
    );
    script.push_str("  const out = [];\n");
    script.push_str("  for (const item of items) {\n");
    script.push_str("    const rec = {};\n");

    for entry in &mapping.entries {
        let index = match entry.locator.pick {
            Pick::First => 0,
            Pick::Nth(i) => i,
        };
        let read = match &entry.locator.attribute {
            Some(attr) => format!("el.getAttribute({}) || ''", js_str(attr)),
            None => "text(el)".to_string(),
        };
        let fixup = match entry.field.shape {
            ValueShape::Url => "abs(v)",
            _ => "v",
        };
        let _ = writeln!(
            script,
            "    rec[{field}] = (() => {{ const el = item.querySelectorAll({sel})[{index}]; if (!el) return ''; const v = {read}; return {fixup}; }})();",
            field = js_str(&entry.field.name),
            sel = js_str(&entry.locator.selector),
        );
    }

    script.push_str("    out.push(rec);\n");
    script.push_str("  }\n");
    script.push_str("  return out;\n");
    script.push_str("})()");
    script
}

/// Parse the script's JSON result into records, preserving mapping field
/// order.
pub fn parse_records(
    page_index: u32,
    page_url: &str,
    value: &serde_json::Value,
    mapping: &PatternMapping,
) -> Result<Vec<Record>, TaskError> {
    let items = value
        .as_array()
        .ok_or_else(|| TaskError::Script(format!("expected array of items, got {value}")))?;

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let obj = item
            .as_object()
            .ok_or_else(|| TaskError::Script(format!("expected item object, got {item}")))?;
        let values = mapping
            .entries
            .iter()
            .map(|entry| {
                let v = obj
                    .get(&entry.field.name)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                (entry.field.name.clone(), v.to_string())
            })
            .collect();
        records.push(Record {
            page_index,
            page_url: page_url.to_string(),
            values,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::candidate::LocatorCandidate;
    use crate::pattern::fields::{FieldSpec, ValueShape};
    use crate::pattern::mapping::FieldLocator;
    use serde_json::json;

    fn mapping() -> PatternMapping {
        PatternMapping::new(
            "https://catalog.example/list?cate=1",
            "li.prod-item",
            vec![
                FieldLocator {
                    field: FieldSpec::new("name", true, ValueShape::Text),
                    locator: LocatorCandidate::new("p.prod-name", None, Pick::First),
                },
                FieldLocator {
                    field: FieldSpec::new("url", true, ValueShape::Url),
                    locator: LocatorCandidate::new("a.prod-link", Some("href"), Pick::First),
                },
                FieldLocator {
                    field: FieldSpec::new("price_min", true, ValueShape::NumericText),
                    locator: LocatorCandidate::new("span.price", None, Pick::Nth(1)),
                },
            ],
        )
    }

    #[test]
    fn test_script_reads_each_locator() {
        let script = build_extraction_script(&mapping());
        assert!(script.contains(r#"document.querySelectorAll("li.prod-item")"#));
        assert!(script.contains(r#"item.querySelectorAll("p.prod-name")[0]"#));
        assert!(script.contains(r#"el.getAttribute("href")"#));
        // Nth(1) indexes the second match.
        assert!(script.contains(r#"item.querySelectorAll("span.price")[1]"#));
        // URL fields get absolutized in-page; text fields do not.
        assert!(script.contains("abs(v)"));
    }

    #[test]
    fn test_script_escapes_selector_quotes() {
        let mut m = mapping();
        m.item_selector = r#"li[data-kind="prod"]"#.to_string();
        let script = build_extraction_script(&m);
        assert!(script.contains(r#"document.querySelectorAll("li[data-kind=\"prod\"]")"#));
    }

    #[test]
    fn test_parse_records_preserves_field_order() {
        let value = json!([
            {"name": "Alpha", "url": "https://catalog.example/product/a1", "price_min": "1,000"},
            {"name": "Beta", "url": "https://catalog.example/product/b1", "price_min": "1,500"},
        ]);
        let records = parse_records(3, "https://catalog.example/list?cate=1&page=3", &value, &mapping())
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].page_index, 3);
        assert_eq!(
            records[0].values.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            ["name", "url", "price_min"]
        );
        assert_eq!(records[1].get("name"), Some("Beta"));
    }

    #[test]
    fn test_parse_records_missing_field_is_empty() {
        let value = json!([{"name": "Alpha"}]);
        let records = parse_records(1, "u", &value, &mapping()).unwrap();
        assert_eq!(records[0].get("url"), Some(""));
    }

    #[test]
    fn test_parse_records_rejects_non_array() {
        let err = parse_records(1, "u", &json!({"name": "x"}), &mapping()).unwrap_err();
        assert!(matches!(err, TaskError::Script(_)));
    }
}
