// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging setup for the simulator binary.
//!
//! All records go to stderr. Stdout is reserved for the JSON report.

use logforth::color::LevelColor;
use logforth::filter::EnvFilter;
use logforth::{Layout, append};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "blockchain_consensus=info,warn";

#[derive(Clone, Copy, Debug)]
struct MinimalLogforthLayout;

impl Layout for MinimalLogforthLayout {
    fn format(
        &self,
        record: &log::Record,
        _: &[Box<dyn logforth::Diagnostic>],
    ) -> anyhow::Result<Vec<u8>> {
        let colors = LevelColor::default();
        let level = colors.colorize_record_level(false, record.level());
        let message = record.args();
        Ok(format!("{level:>5} {message}").into_bytes())
    }
}

/// Installs the compact stderr logger.
///
/// # Panics
///
/// Panics if a global logger was already installed.
pub fn enable_logforth() {
    let filter = EnvFilter::from_default_env_or(DEFAULT_FILTER);
    let stderr = append::Stderr::default().with_layout(MinimalLogforthLayout);
    logforth::builder()
        .dispatch(|d| d.filter(filter).append(stderr))
        .apply();
}
