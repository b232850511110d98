//! Fuzz target: catalog extraction over arbitrary HTML.
//!
//! The extractors run on whatever the scraped site serves; malformed
//! markup must never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_upstream::{catalog_items, catalog_pagination, form_token, media_links};

fuzz_target!(|data: &[u8]| {
    let html = String::from_utf8_lossy(data);
    let _ = catalog_items(&html);
    let _ = catalog_pagination(&html, 1);
    let _ = form_token(&html);
    let _ = media_links(&html, "https://example.com");
});
