//! Per-run scrape executor.
//!
//! One executor drives one scrape to completion: paginated listing fetch,
//! listing parse, href dedup against the store, per-posting description
//! fetch, cleanse, persist. Progress goes out through the notifier; a
//! cooperative stop flag ends the run at the next checkpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::Result;
use crate::fetch::PageFetcher;
use crate::models::JobPosting;
use crate::notify::Notifier;
use crate::sites::{SiteKind, SiteScraper};
use crate::storage::JobStore;

const STOP_MESSAGE: &str = "Received signal to stop";

/// How a run ended, short of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Pagination exhausted or a listing page failed
    Completed,
    /// The stop flag was observed at a checkpoint
    Stopped,
}

/// Handle for requesting cooperative cancellation of a running executor.
///
/// `stop` is non-blocking and idempotent. The executor observes the flag at
/// the top of the page loop and before each posting; in-flight fetches and
/// parses run to completion first.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Drives one scrape run for one site.
pub struct ScrapeExecutor {
    scraper: Box<dyn SiteScraper>,
    store: Arc<dyn JobStore>,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Notifier,
    kind: SiteKind,
    name: String,
    stopped: Arc<AtomicBool>,
    pause_max_secs: u64,
}

impl ScrapeExecutor {
    /// Bind an executor to its collaborators. Everything is injected here;
    /// there is no partially constructed state.
    pub fn new(
        scraper: Box<dyn SiteScraper>,
        store: Arc<dyn JobStore>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Notifier,
        pause_max_secs: u64,
    ) -> Self {
        let kind = scraper.job_site();
        let name = scraper.name();
        Self {
            scraper,
            store,
            fetcher,
            notifier,
            kind,
            name,
            stopped: Arc::new(AtomicBool::new(false)),
            pause_max_secs,
        }
    }

    /// Display name used to tag this run's events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle for stopping this run from outside.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stopped),
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Pause for a uniformly random 1..=pause_max seconds. Zero disables
    /// pacing.
    async fn pause(&self) {
        if self.pause_max_secs == 0 {
            return;
        }
        let seconds = fastrand::u64(1..=self.pause_max_secs);
        self.notifier.sleeping(seconds, &self.name);
        tokio::time::sleep(Duration::from_secs(seconds)).await;
    }

    /// Run the scrape until pagination is exhausted, a listing page fails,
    /// the store rejects a write, or the stop flag is observed.
    pub async fn scrape(&mut self) -> Result<RunOutcome> {
        loop {
            if self.is_stopped() {
                self.notifier.send(STOP_MESSAGE, &self.name);
                return Ok(RunOutcome::Stopped);
            }

            self.pause().await;

            let Some(uri) = self.scraper.next_main_page_uri() else {
                return Ok(RunOutcome::Completed);
            };
            let uri = uri.to_string();

            self.notifier.scraping_main_page(&uri, &self.name);
            let Some(body) = self.fetcher.fetch(&uri).await else {
                // Pagination stops on the first page-level failure.
                self.notifier.fail_main_page_scrape(&uri, &self.name);
                return Ok(RunOutcome::Completed);
            };
            self.notifier.successful_main_page_scrape(&uri, &self.name);

            let postings = self.scraper.parse_main_page(&body);
            self.notifier.found_postings(postings.len(), &self.name, &uri);

            let fresh = self
                .scraper
                .remove_known_postings(postings, self.store.as_ref())
                .await?;
            self.notifier.send(
                &format!("Found {} non duplicate postings", fresh.len()),
                &self.name,
            );

            for posting in fresh {
                if self.is_stopped() {
                    self.notifier.send(STOP_MESSAGE, &self.name);
                    return Ok(RunOutcome::Stopped);
                }
                if posting.href.is_empty() {
                    continue;
                }
                self.process_posting(posting).await?;
            }

            if !self.scraper.more_results() {
                return Ok(RunOutcome::Completed);
            }
        }
    }

    /// Enrich, cleanse, stamp, and persist one posting. A description-page
    /// failure skips the posting; a store failure propagates and ends the
    /// run.
    async fn process_posting(&mut self, mut posting: JobPosting) -> Result<()> {
        if !posting.ignore_description_page {
            self.pause().await;
            self.notifier.scraping_desc_page(&posting.href, &self.name);

            match self.fetcher.fetch(&posting.href).await {
                Some(body) if !body.trim().is_empty() => {
                    self.scraper.parse_description_page(&body, &mut posting);
                    self.notifier.successful_desc_page_scrape(&posting, &self.name);
                }
                _ => {
                    self.notifier.failed_desc_page_scrape(&posting.href, &self.name);
                    return Ok(());
                }
            }
        } else {
            self.notifier.successful_desc_page_scrape(&posting, &self.name);
        }

        self.scraper.cleanse_description(&mut posting);

        posting.job_site = self.kind.as_str().to_string();
        posting.scraper_name = self.name.clone();
        posting.status = "new".to_string();

        self.store.store_posting(posting).await?;
        Ok(())
    }
}
