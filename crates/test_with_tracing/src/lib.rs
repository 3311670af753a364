// Copyright (C) Microsoft Corporation. All rights reserved.

//! Test attribute that routes `tracing` output of the cipher crates into the
//! libtest capture buffer.
//!
//! Use it in place of the built-in attribute:
//!
//! ```ignore
//! use test_with_tracing::test;
//!
//! #[test]
//! fn round_trip() { /* ... */ }
//! ```
//!
//! Without `RUST_LOG`, the `azcipher` and `azcipher_tool` targets log at
//! TRACE and everything else at INFO. Those crates log binding at `debug!`
//! and per-update byte counts at `trace!`, and a failing test prints its
//! captured output, so the whole cipher call sequence shows up next to the
//! assertion that failed. Dependencies stay at INFO to keep it readable.
//!
//! Set `RUST_LOG` (for example `RUST_LOG=azcipher=trace`) to override the
//! default filter.

// This is only used by test code; `expect` is allowed here (but not `unwrap`).
#![allow(clippy::expect_used)]

#[cfg(test)]
extern crate self as test_with_tracing;

pub use test_with_tracing_macro::test;
#[doc(hidden)]
pub use tracing;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

/// Crates whose events are shown at full verbosity when `RUST_LOG` is unset.
const VERBOSE_TARGETS: &[&str] = &["azcipher", "azcipher_tool"];

#[doc(hidden)]
/// Installs the global subscriber. Called by the code the attribute expands to.
pub fn init() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let targets = if let Ok(var) = std::env::var("RUST_LOG") {
            var.parse()
                .expect("Failed to parse RUST_LOG environment variable")
        } else {
            VERBOSE_TARGETS
                .iter()
                .fold(Targets::new().with_default(LevelFilter::INFO), |t, name| {
                    t.with_target(*name, LevelFilter::TRACE)
                })
        };
        tracing_subscriber::fmt()
            .pretty()
            .with_ansi(false) // avoid polluting logs with escape sequences
            .log_internal_errors(true)
            .with_test_writer()
            .with_max_level(LevelFilter::TRACE)
            .with_thread_ids(true)
            .finish()
            .with(targets)
            .init();
    });
}
