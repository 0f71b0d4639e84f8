// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for neurolab
//!
//! Installs a single human-readable console layer. A second initialization in
//! the same process is a no-op, so tests and binaries may both call it.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Initialize console logging at `info` with per-crate debug overrides
pub fn init_logging(debug_flags: &CrateDebugFlags) -> Result<()> {
    init_logging_with_level(debug_flags, "info")
}

/// Initialize console logging at `base_level` with per-crate debug overrides
///
/// # Errors
/// Fails when `base_level` is not a valid filter directive.
pub fn init_logging_with_level(debug_flags: &CrateDebugFlags, base_level: &str) -> Result<()> {
    let filter = debug_flags.to_filter_string_with_base(base_level);
    let env_filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("Invalid log filter: {}", filter))?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter);

    // Already installed elsewhere in this process
    let _ = Registry::default().with(console_layer).try_init();

    Ok(())
}
