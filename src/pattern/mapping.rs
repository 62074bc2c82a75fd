// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pattern mapping document: the portable output of a learning run.
//!
//! Stored as pretty-printed JSON so mappings stay inspectable and
//! hand-patchable between runs. Load verifies the version tag before
//! anything else; a mapping written by an incompatible script generator is
//! rejected with `VersionMismatch`, malformed documents with
//! `CorruptMapping`.

use crate::error::MappingError;
use crate::pattern::candidate::LocatorCandidate;
use crate::pattern::fields::FieldSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Version tag of the mapping document format. Bumped whenever the
/// extraction script generator changes incompatibly.
pub const MAPPING_VERSION: &str = "gleaner/2";

/// One learned field → locator association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLocator {
    pub field: FieldSpec,
    pub locator: LocatorCandidate,
}

/// A learned pattern mapping for one category/template.
///
/// The entry order is the declared record field order handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMapping {
    /// Format/page-structure version tag.
    pub version: String,
    /// The category listing URL this pattern was learned from.
    pub category_url: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Selector addressing one item card on a listing page.
    pub item_selector: String,
    /// Ordered field → locator entries.
    pub entries: Vec<FieldLocator>,
}

impl PatternMapping {
    pub fn new(category_url: &str, item_selector: &str, entries: Vec<FieldLocator>) -> Self {
        Self {
            version: MAPPING_VERSION.to_string(),
            category_url: category_url.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            item_selector: item_selector.to_string(),
            entries,
        }
    }

    /// Ordered field names, i.e. the sink's column order.
    pub fn field_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.field.name.clone()).collect()
    }

    /// Serialize to pretty JSON and write to `path`.
    pub fn save(&self, path: &Path) -> Result<(), MappingError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| MappingError::Corrupt(format!("serialize: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a mapping from `path`, verifying the version tag.
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Parse a mapping from a JSON string, verifying the version tag.
    pub fn from_json(data: &str) -> Result<Self, MappingError> {
        // Peek at the version tag first so an old-format document reports
        // VersionMismatch rather than a generic parse failure.
        let value: serde_json::Value =
            serde_json::from_str(data).map_err(|e| MappingError::Corrupt(format!("{e}")))?;
        let found = value
            .get("version")
            .and_then(|v| v.as_str())
            .ok_or_else(|| MappingError::Corrupt("missing 'version' key".to_string()))?;
        if found != MAPPING_VERSION {
            return Err(MappingError::VersionMismatch {
                found: found.to_string(),
                expected: MAPPING_VERSION.to_string(),
            });
        }

        let mapping: Self = serde_json::from_value(value)
            .map_err(|e| MappingError::Corrupt(format!("{e}")))?;
        if mapping.item_selector.trim().is_empty() {
            return Err(MappingError::Corrupt("empty item_selector".to_string()));
        }
        if mapping.entries.is_empty() {
            return Err(MappingError::Corrupt("no field entries".to_string()));
        }
        Ok(mapping)
    }
}
