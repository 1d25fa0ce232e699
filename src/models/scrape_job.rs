//! Scrape job descriptor.

use serde::{Deserialize, Serialize};

/// Persisted configuration describing one site to scrape.
///
/// Created by the control surface before any scrape is triggered;
/// read-only to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeJob {
    /// Store-assigned identifier. Zero means not yet persisted.
    #[serde(default)]
    pub id: i64,

    /// Display name for this job, used to tag progress events
    #[serde(default)]
    pub name: String,

    /// Site kind tag, resolved against the registry at dispatch time
    pub site: String,

    /// Override for the adapter's default listing URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Adapter-specific keywords (comma separated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,

    /// Adapter-specific location filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ScrapeJob {
    /// Weak equality used for idempotent upserts: two descriptors are the
    /// same job when name and site match. Adapter params do not participate.
    pub fn weak_equals(&self, other: &ScrapeJob) -> bool {
        self.name == other.name && self.site == other.site
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> ScrapeJob {
        ScrapeJob {
            id: 1,
            name: "remote dev jobs".to_string(),
            site: "remote-ok".to_string(),
            base_url: None,
            keywords: None,
            location: None,
        }
    }

    #[test]
    fn weak_equals_ignores_id_and_params() {
        let a = sample_job();
        let mut b = sample_job();
        b.id = 99;
        b.base_url = Some("https://example.com".to_string());
        assert!(a.weak_equals(&b));
    }

    #[test]
    fn weak_equals_differs_on_site() {
        let a = sample_job();
        let mut b = sample_job();
        b.site = "remote-co".to_string();
        assert!(!a.weak_equals(&b));
    }

    #[test]
    fn weak_equals_differs_on_name() {
        let a = sample_job();
        let mut b = sample_job();
        b.name = "other".to_string();
        assert!(!a.weak_equals(&b));
    }
}
