//! Remote.co scraper.
//!
//! The listing page only links to postings; everything of substance lives on
//! the description pages, which are fetched per posting.

use scraper::Html;
use url::Url;

use crate::error::Result;
use crate::models::{JobPosting, ScrapeJob};
use crate::sites::{SiteKind, SiteScraper, display_name, selector, validate_base_url};
use crate::utils::resolve_url;

const DEFAULT_URL: &str = "https://remote.co/remote-jobs/developer";

pub struct RemoteCoScraper {
    job: ScrapeJob,
    base: Url,
    exhausted: bool,
}

impl RemoteCoScraper {
    pub fn new(job: &ScrapeJob) -> Result<Self> {
        validate_base_url(job)?;
        let base = Url::parse(job.base_url.as_deref().unwrap_or(DEFAULT_URL))?;
        Ok(Self {
            job: job.clone(),
            base,
            exhausted: false,
        })
    }
}

impl SiteScraper for RemoteCoScraper {
    fn job_site(&self) -> SiteKind {
        SiteKind::RemoteCo
    }

    fn name(&self) -> String {
        display_name(&self.job, SiteKind::RemoteCo)
    }

    fn next_main_page_uri(&mut self) -> Option<Url> {
        if self.exhausted {
            return None;
        }
        self.exhausted = true;
        Some(self.base.clone())
    }

    fn parse_main_page(&self, body: &str) -> Vec<JobPosting> {
        let document = Html::parse_document(body);
        let Some(anchor_sel) = selector("a[href]") else {
            return Vec::new();
        };

        let mut postings = Vec::new();
        for anchor in document.select(&anchor_sel) {
            let Some(rel) = anchor.value().attr("href") else {
                continue;
            };
            if !rel.starts_with("/job/") {
                continue;
            }

            let mut posting = JobPosting::with_href(resolve_url(&self.base, rel));
            posting.date = selector("date")
                .and_then(|sel| anchor.select(&sel).next())
                .map(|e| e.text().collect::<String>().trim().to_string())
                .unwrap_or_default();
            postings.push(posting);
        }
        postings
    }

    fn parse_description_page(&self, body: &str, posting: &mut JobPosting) {
        let document = Html::parse_document(body);

        let first_text = |sel: &str| {
            selector(sel)
                .and_then(|sel| document.select(&sel).next())
                .map(|e| e.text().collect::<String>().trim().to_string())
                .unwrap_or_default()
        };

        posting.job_title = first_text("h1");
        posting.company = first_text(".company_name");
        posting.location = first_text(".location");
        posting.description = first_text(".job_description");
        posting.tags = selector(".job_tags a")
            .map(|sel| {
                document
                    .select(&sel)
                    .map(|e| e.text().collect::<String>().trim().to_string())
                    .collect::<Vec<_>>()
                    .join(" - ")
            })
            .unwrap_or_default();
    }
}
