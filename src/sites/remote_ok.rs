//! RemoteOK scraper.
//!
//! The listing page is a single table where each posting spans two rows
//! sharing a `data-id`: one carries the summary cells, the other an expanded
//! description block. Everything needed lives on the listing page, so the
//! per-posting description fetch is skipped.

use std::collections::HashMap;

use scraper::{ElementRef, Html};
use url::Url;

use crate::error::Result;
use crate::models::{JobPosting, ScrapeJob};
use crate::sites::{SiteKind, SiteScraper, cleanse, display_name, selector, validate_base_url};

const DEFAULT_URL: &str = "https://remoteok.io/remote-dev-jobs";
const ORIGIN: &str = "https://remoteok.io";

pub struct RemoteOkScraper {
    job: ScrapeJob,
    exhausted: bool,
}

impl RemoteOkScraper {
    pub fn new(job: &ScrapeJob) -> Result<Self> {
        validate_base_url(job)?;
        Ok(Self {
            job: job.clone(),
            exhausted: false,
        })
    }

    fn parse_row(&self, row: ElementRef<'_>, details: Option<ElementRef<'_>>) -> Option<JobPosting> {
        // No href, no posting.
        let href = row
            .select(&selector("[itemprop=url]")?)
            .next()
            .and_then(|e| e.value().attr("href"))
            .map(|rel| format!("{ORIGIN}{rel}"))?;

        let mut posting = JobPosting::with_href(href);
        posting.ignore_description_page = true;

        posting.company = row.value().attr("data-company").unwrap_or("").to_string();

        posting.job_title = selector("[itemprop=title]")
            .and_then(|sel| row.select(&sel).next())
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        posting.location = selector(".location")
            .and_then(|sel| row.select(&sel).next())
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        posting.date = selector("time[datetime]")
            .and_then(|sel| row.select(&sel).next())
            .and_then(|e| e.value().attr("datetime"))
            .unwrap_or("")
            .to_string();

        posting.tags = selector("td.tags div.tag > h3")
            .map(|sel| {
                row.select(&sel)
                    .map(|e| e.text().collect::<String>().trim().to_string())
                    .collect::<Vec<_>>()
                    .join(" - ")
            })
            .unwrap_or_default();

        if let Some(details) = details {
            posting.description = selector("div[itemprop=description] > div.markdown")
                .and_then(|sel| details.select(&sel).next())
                .map(|e| e.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            if let Some(stats) = selector("div.expandContents > span")
                .and_then(|sel| details.select(&sel).next())
            {
                let text = stats.text().collect::<String>().trim().to_string();
                if text.contains("applied") || text.contains("viewed") {
                    posting.misc_text = text;
                }
            }
        }

        Some(posting)
    }
}

impl SiteScraper for RemoteOkScraper {
    fn job_site(&self) -> SiteKind {
        SiteKind::RemoteOk
    }

    fn name(&self) -> String {
        display_name(&self.job, SiteKind::RemoteOk)
    }

    fn next_main_page_uri(&mut self) -> Option<Url> {
        if self.exhausted {
            return None;
        }
        self.exhausted = true;
        let raw = self.job.base_url.as_deref().unwrap_or(DEFAULT_URL);
        Url::parse(raw).ok()
    }

    fn parse_main_page(&self, body: &str) -> Vec<JobPosting> {
        let document = Html::parse_document(body);
        let Some(row_sel) = selector("table#jobsboard tr") else {
            return Vec::new();
        };

        let mut job_rows = Vec::new();
        let mut detail_rows: HashMap<String, ElementRef<'_>> = HashMap::new();

        for row in document.select(&row_sel) {
            let data_id = row.value().attr("data-id").unwrap_or("");
            if data_id.is_empty() {
                continue;
            }
            let data_url = row.value().attr("data-url").unwrap_or("");
            if data_url.contains("/remote-jobs/") {
                job_rows.push((data_id.to_string(), row));
            } else if data_url.is_empty() {
                detail_rows.insert(data_id.to_string(), row);
            }
        }

        job_rows
            .into_iter()
            .filter_map(|(id, row)| self.parse_row(row, detail_rows.get(&id).copied()))
            .collect()
    }

    fn cleanse_description(&self, posting: &mut JobPosting) {
        posting.description = cleanse::literal_newlines_to_br(&posting.description);
    }
}
