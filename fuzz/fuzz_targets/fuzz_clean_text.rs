//! Fuzz target: chat reply cleaning.
//!
//! Cleaning is documented as total — arbitrary input must never panic in
//! any mode.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_core::{clean_text, CleanMode};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    for mode in [CleanMode::Minimal, CleanMode::Medium, CleanMode::Strict, CleanMode::Pretty] {
        let _ = clean_text(&input, mode);
    }
});
