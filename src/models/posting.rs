//! Job posting data structure.

use serde::{Deserialize, Serialize};

/// One extracted job listing, keyed by `href`.
///
/// A posting is created partially populated by a site's listing parse,
/// optionally enriched from its description page, cleansed, and persisted
/// once per run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    /// Store-assigned identifier, absent until first persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Canonical absolute URL of the posting. Natural dedup key.
    pub href: String,

    /// Position title
    #[serde(default)]
    pub job_title: String,

    /// Hiring company
    #[serde(default)]
    pub company: String,

    /// Location text as published by the site
    #[serde(default)]
    pub location: String,

    /// Publication date in whatever format the site uses
    #[serde(default)]
    pub date: String,

    /// Tag list joined with ` - `
    #[serde(default)]
    pub tags: String,

    /// Job description, possibly empty, cleansed post-parse
    #[serde(default)]
    pub description: String,

    /// Anything noteworthy that fits no other field
    #[serde(default)]
    pub misc_text: String,

    /// Name of the site kind that produced this posting
    #[serde(default)]
    pub job_site: String,

    /// Display name of the scraper run that produced this posting
    #[serde(default)]
    pub scraper_name: String,

    /// Review status, `"new"` at first insert
    #[serde(default)]
    pub status: String,

    /// When set, the executor skips the per-posting description fetch
    #[serde(default)]
    pub ignore_description_page: bool,
}

impl JobPosting {
    /// Create a posting with only its dedup key set.
    pub fn with_href(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }
}
