//! Fuzz target: `Page X of Y` footer parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_upstream::scrape::parse_page_of;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Some((current, total)) = parse_page_of(&text) {
        // Parsed numbers must round-trip through the canonical format.
        let canonical = format!("Page {current} of {total}");
        assert_eq!(parse_page_of(&canonical), Some((current, total)));
    }
});
