// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Logical field specifications for catalog records.
//!
//! The field list is fixed and ordered: it defines both what the learner
//! must find locators for and the column order handed to the record sink.

use serde::{Deserialize, Serialize};

/// Expected shape of an extracted value. Checked during candidate scoring;
/// extraction itself stays best-effort raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    /// Any non-empty text.
    Text,
    /// An absolute, protocol-relative, or root-relative URL.
    Url,
    /// Text containing at least one digit (prices, counts).
    NumericText,
    /// Delimited multi-value text (spec tables, trend series).
    List,
}

/// A logical field the pattern learner must map to a DOM locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, e.g. `price_min`.
    pub name: String,
    /// Required fields fail the whole learning run when unlearnable.
    pub required: bool,
    pub shape: ValueShape,
}

impl FieldSpec {
    pub fn new(name: &str, required: bool, shape: ValueShape) -> Self {
        Self {
            name: name.to_string(),
            required,
            shape,
        }
    }
}

/// The fixed, ordered catalog field list: product name, URL, image URL,
/// lowest price, highest price, price-trend data, detail info.
///
/// `price_trend` and `detail_info` are optional — not every category's
/// template carries a trend chart or a spec table, and rejecting those
/// categories outright would be worse than emitting empty columns.
pub fn catalog_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("name", true, ValueShape::Text),
        FieldSpec::new("url", true, ValueShape::Url),
        FieldSpec::new("image", true, ValueShape::Url),
        FieldSpec::new("price_min", true, ValueShape::NumericText),
        FieldSpec::new("price_max", true, ValueShape::NumericText),
        FieldSpec::new("price_trend", false, ValueShape::List),
        FieldSpec::new("detail_info", false, ValueShape::List),
    ]
}
