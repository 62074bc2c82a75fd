// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Gleaner — two-pass structured extraction for templated e-commerce
//! catalogs.
//!
//! Pass one (`learn`) drives a handful of sample listing pages through a
//! headless browser and infers a reusable [`pattern::PatternMapping`]: one
//! DOM locator per catalog field, scored across samples for stability.
//! Pass two (`harvest`) replays a saved mapping across many listing pages
//! with a bounded pool of concurrent tabs, streaming records into a
//! [`sink::RecordSink`].

pub mod browser;
pub mod cli;
pub mod error;
pub mod events;
pub mod extract;
pub mod harvest;
pub mod pattern;
pub mod sink;
