// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neurolab-observability
//!
//! Console logging for neurolab binaries and tests, with per-crate debug flag
//! support (`--debug-neurolab-network`, `NEUROLAB_DEBUG=all`).

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known neurolab crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "neurolab",
    "neurolab-neural",
    "neurolab-network",
    "neurolab-config",
    "neurolab-observability",
];
