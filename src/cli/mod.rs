// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommand implementations for the gleaner binary.

pub mod harvest_cmd;
pub mod learn_cmd;
