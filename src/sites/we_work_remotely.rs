//! We Work Remotely scraper.
//!
//! Listings are grouped into category pages, so the URI iterator walks one
//! listing page per configured category. The job's `keywords` field carries
//! the category slugs, comma separated.

use scraper::Html;
use url::Url;

use crate::error::Result;
use crate::models::{JobPosting, ScrapeJob};
use crate::sites::{SiteKind, SiteScraper, display_name, selector, validate_base_url};
use crate::utils::resolve_url;

const DEFAULT_ORIGIN: &str = "https://weworkremotely.com";
const DEFAULT_CATEGORY: &str = "remote-programming-jobs";

pub struct WeWorkRemotelyScraper {
    job: ScrapeJob,
    origin: Url,
    categories: Vec<String>,
    cursor: usize,
}

impl WeWorkRemotelyScraper {
    pub fn new(job: &ScrapeJob) -> Result<Self> {
        validate_base_url(job)?;
        let origin = Url::parse(job.base_url.as_deref().unwrap_or(DEFAULT_ORIGIN))?;

        let mut categories: Vec<String> = job
            .keywords
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if categories.is_empty() {
            categories.push(DEFAULT_CATEGORY.to_string());
        }

        Ok(Self {
            job: job.clone(),
            origin,
            categories,
            cursor: 0,
        })
    }
}

impl SiteScraper for WeWorkRemotelyScraper {
    fn job_site(&self) -> SiteKind {
        SiteKind::WeWorkRemotely
    }

    fn name(&self) -> String {
        display_name(&self.job, SiteKind::WeWorkRemotely)
    }

    fn next_main_page_uri(&mut self) -> Option<Url> {
        let category = self.categories.get(self.cursor)?;
        self.cursor += 1;
        self.origin.join(&format!("/categories/{category}")).ok()
    }

    fn parse_main_page(&self, body: &str) -> Vec<JobPosting> {
        let document = Html::parse_document(body);
        let Some(anchor_sel) = selector("section.jobs li > a[href]") else {
            return Vec::new();
        };

        let mut postings = Vec::new();
        for anchor in document.select(&anchor_sel) {
            let Some(rel) = anchor.value().attr("href") else {
                continue;
            };
            if !rel.starts_with("/remote-jobs/") {
                continue;
            }

            let mut posting = JobPosting::with_href(resolve_url(&self.origin, rel));

            let first_text = |sel: &str| {
                selector(sel)
                    .and_then(|sel| anchor.select(&sel).next())
                    .map(|e| e.text().collect::<String>().trim().to_string())
                    .unwrap_or_default()
            };

            posting.job_title = first_text("span.title");
            posting.company = first_text("span.company");
            posting.location = first_text("span.region");
            posting.date = selector("time[datetime]")
                .and_then(|sel| anchor.select(&sel).next())
                .and_then(|e| e.value().attr("datetime"))
                .unwrap_or("")
                .to_string();

            postings.push(posting);
        }
        postings
    }

    fn parse_description_page(&self, body: &str, posting: &mut JobPosting) {
        let document = Html::parse_document(body);

        if let Some(container) = selector("div.listing-container")
            .and_then(|sel| document.select(&sel).next())
        {
            posting.description = container.text().collect::<String>().trim().to_string();
        }

        let tags: Vec<String> = selector("span.listing-tag")
            .map(|sel| {
                document
                    .select(&sel)
                    .map(|e| e.text().collect::<String>().trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        if !tags.is_empty() {
            posting.tags = tags.join(" - ");
        }
    }
}
