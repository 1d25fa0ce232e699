//! Working Nomads scraper.
//!
//! The site exposes its listings as a JSON API, so the "main page" is one
//! API response and description pages are never fetched. Only the
//! Development category is kept.

use serde_json::Value;
use url::Url;

use crate::error::Result;
use crate::models::{JobPosting, ScrapeJob};
use crate::sites::{SiteKind, SiteScraper, display_name, validate_base_url};

const DEFAULT_URL: &str = "https://www.workingnomads.co/api/exposed_jobs";

pub struct WorkingNomadsScraper {
    job: ScrapeJob,
    exhausted: bool,
}

impl WorkingNomadsScraper {
    pub fn new(job: &ScrapeJob) -> Result<Self> {
        validate_base_url(job)?;
        Ok(Self {
            job: job.clone(),
            exhausted: false,
        })
    }

    fn parse_entry(entry: &Value) -> Option<JobPosting> {
        let href = entry.get("url")?.as_str()?;
        if entry.get("category_name").and_then(Value::as_str) != Some("Development") {
            return None;
        }

        let mut posting = JobPosting::with_href(href);
        posting.ignore_description_page = true;

        posting.job_title = text_field(entry, "title");
        posting.description = text_field(entry, "description");
        posting.company = match entry.get("company_name").and_then(Value::as_str) {
            Some(company) => company.to_string(),
            None => "unknown".to_string(),
        };
        posting.location = text_field(entry, "location");
        posting.date = text_field(entry, "pub_date");

        if let Some(tags) = entry.get("tags").and_then(Value::as_str) {
            posting.tags = tags.split(',').collect::<Vec<_>>().join(" - ");
        }

        Some(posting)
    }
}

fn text_field(entry: &Value, key: &str) -> String {
    entry
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

impl SiteScraper for WorkingNomadsScraper {
    fn job_site(&self) -> SiteKind {
        SiteKind::WorkingNomads
    }

    fn name(&self) -> String {
        display_name(&self.job, SiteKind::WorkingNomads)
    }

    fn next_main_page_uri(&mut self) -> Option<Url> {
        if self.exhausted {
            return None;
        }
        self.exhausted = true;
        let raw = self.job.base_url.as_deref().unwrap_or(DEFAULT_URL);
        Url::parse(raw).ok()
    }

    // One API call is the whole run.
    fn more_results(&self) -> bool {
        false
    }

    fn parse_main_page(&self, body: &str) -> Vec<JobPosting> {
        let Ok(parsed) = serde_json::from_str::<Value>(body) else {
            return Vec::new();
        };
        let Some(entries) = parsed.as_array() else {
            return Vec::new();
        };
        entries.iter().filter_map(Self::parse_entry).collect()
    }
}
