//! Description cleansing.
//!
//! The default cleanse is a light HTML tidy shared by every scraper that does
//! not bring its own: script/style blocks go away, whitespace runs collapse.
//! Site-specific quirks (literal `\n` sequences in API payloads) have their
//! own helpers that adapters opt into.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::JobPosting;

fn script_style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap()
    })
}

/// Default post-parse normalization applied to a posting's description.
pub fn default_cleanse(posting: &mut JobPosting) {
    if posting.description.is_empty() {
        return;
    }
    let stripped = script_style_re().replace_all(&posting.description, "");
    posting.description = collapse_whitespace(&stripped);
}

/// Replace literal `\n` sequences with `<br>`. Some boards ship descriptions
/// as JSON-escaped text where newlines survive as two characters.
pub fn literal_newlines_to_br(description: &str) -> String {
    description
        .split("\\n")
        .map(|segment| format!("{segment}<br>"))
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
