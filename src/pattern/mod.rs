// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pattern learning: infer per-field DOM locators from a handful of sample
//! listing pages and persist them as a versioned mapping.

pub mod candidate;
pub mod fields;
pub mod learner;
pub mod mapping;
pub mod scorer;

pub use candidate::{LocatorCandidate, Pick};
pub use fields::{catalog_fields, FieldSpec, ValueShape};
pub use learner::{FieldProbes, LearnRequest, PatternLearner};
pub use mapping::{FieldLocator, PatternMapping, MAPPING_VERSION};
pub use scorer::{SamplePage, Scorer, DEFAULT_THRESHOLD};
