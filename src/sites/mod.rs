// src/sites/mod.rs

//! Site adapters and the registry mapping site kinds to scrapers.
//!
//! Each supported job board gets one [`SiteScraper`] implementation and one
//! [`SiteKind`] variant. Adding a site means adding a module, a variant, and
//! an arm in [`SiteKind::scraper`]; nothing else changes.

pub mod cleanse;
mod remote_co;
mod remote_ok;
mod we_work_remotely;
mod working_nomads;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{JobPosting, ScrapeJob};
use crate::storage::JobStore;

pub use remote_co::RemoteCoScraper;
pub use remote_ok::RemoteOkScraper;
pub use we_work_remotely::WeWorkRemotelyScraper;
pub use working_nomads::WorkingNomadsScraper;

/// Closed enumeration of supported job boards.
///
/// Doubles as the concurrency key: at most one executor runs per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteKind {
    RemoteOk,
    WorkingNomads,
    RemoteCo,
    WeWorkRemotely,
}

impl SiteKind {
    /// Every supported kind, in registry order.
    pub fn all() -> &'static [SiteKind] {
        &[
            SiteKind::RemoteOk,
            SiteKind::WorkingNomads,
            SiteKind::RemoteCo,
            SiteKind::WeWorkRemotely,
        ]
    }

    /// Stable string form, also used as `JobPosting::job_site`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteKind::RemoteOk => "remote-ok",
            SiteKind::WorkingNomads => "working-nomads",
            SiteKind::RemoteCo => "remote-co",
            SiteKind::WeWorkRemotely => "we-work-remotely",
        }
    }

    /// Construct the scraper for this kind, configured from the job.
    pub fn scraper(&self, job: &ScrapeJob) -> Result<Box<dyn SiteScraper>> {
        Ok(match self {
            SiteKind::RemoteOk => Box::new(RemoteOkScraper::new(job)?),
            SiteKind::WorkingNomads => Box::new(WorkingNomadsScraper::new(job)?),
            SiteKind::RemoteCo => Box::new(RemoteCoScraper::new(job)?),
            SiteKind::WeWorkRemotely => Box::new(WeWorkRemotelyScraper::new(job)?),
        })
    }
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "remote-ok" | "remoteok" => Ok(SiteKind::RemoteOk),
            "working-nomads" | "workingnomads" => Ok(SiteKind::WorkingNomads),
            "remote-co" | "remoteco" => Ok(SiteKind::RemoteCo),
            "we-work-remotely" | "weworkremotely" => Ok(SiteKind::WeWorkRemotely),
            _ => Err(AppError::validation(format!("unknown site kind: {s}"))),
        }
    }
}

/// Per-site scraping capability set.
///
/// Scrapers are stateful only for pagination: `next_main_page_uri` is an
/// iterator over listing pages and returns `None` when exhausted. Parsers
/// never fail — malformed input yields an empty list.
#[async_trait]
pub trait SiteScraper: Send + Sync {
    /// The kind this scraper belongs to.
    fn job_site(&self) -> SiteKind;

    /// Display name used to tag events: the scrape job's name, falling back
    /// to the site kind name.
    fn name(&self) -> String;

    /// Next listing page to fetch, or `None` when pagination is exhausted.
    fn next_main_page_uri(&mut self) -> Option<Url>;

    /// Secondary stop hint, checked after a successful page. Scrapers that
    /// stop via the URI iterator leave this always-continue.
    fn more_results(&self) -> bool {
        true
    }

    /// Extract partially populated postings from one listing page.
    fn parse_main_page(&self, body: &str) -> Vec<JobPosting>;

    /// Enrich a posting from its description page. No-op for scrapers whose
    /// listings already carry everything.
    fn parse_description_page(&self, _body: &str, _posting: &mut JobPosting) {}

    /// Post-parse normalization of the description.
    fn cleanse_description(&self, posting: &mut JobPosting) {
        cleanse::default_cleanse(posting);
    }

    /// Filter out postings whose href the store already knows.
    async fn remove_known_postings(
        &self,
        postings: Vec<JobPosting>,
        store: &dyn JobStore,
    ) -> Result<Vec<JobPosting>> {
        let mut fresh = Vec::with_capacity(postings.len());
        for posting in postings {
            if store.postings_by_href(&posting.href).await?.is_empty() {
                fresh.push(posting);
            }
        }
        Ok(fresh)
    }
}

/// Display name for a job: its own name, or the kind name when unset.
pub(crate) fn display_name(job: &ScrapeJob, kind: SiteKind) -> String {
    if job.name.trim().is_empty() {
        kind.as_str().to_string()
    } else {
        job.name.clone()
    }
}

/// Compile a static CSS selector, or `None` when it is malformed. Parsers
/// treat a bad selector like a page with no matches.
pub(crate) fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

/// Validate an optional base-URL override at construction time.
pub(crate) fn validate_base_url(job: &ScrapeJob) -> Result<()> {
    if let Some(base) = &job.base_url {
        Url::parse(base)?;
    }
    Ok(())
}
