//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! This exercises `AgentConfig::parse()` with arbitrary byte sequences to
//! find panics, hangs, or memory issues in the TOML parsing and validation
//! pipeline.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = didsock_config::AgentConfig::parse(s);
    }
});
