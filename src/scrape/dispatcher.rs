//! Scrape dispatch.
//!
//! The dispatcher owns job bookkeeping and run admission: at most one live
//! run per site kind, executors scheduled on a bounded worker pool, stop
//! handles tracked so callers can cancel runs by job id.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::error::AppError;
use crate::fetch::PageFetcher;
use crate::models::ScrapeJob;
use crate::notify::Notifier;
use crate::scrape::executor::{RunOutcome, ScrapeExecutor, StopHandle};
use crate::sites::SiteKind;
use crate::storage::JobStore;
use crate::utils::lock;

/// Why a scrape request was refused.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no scrape job with that id")]
    JobNotFound,
    #[error("the job's site is not a valid site")]
    JobSiteNotValid,
    #[error("no executor is available for that site")]
    ExecutorNotAvailable,
    #[error("a scrape for that site is already executing")]
    AlreadyExecuting,
    #[error(transparent)]
    Store(#[from] AppError),
}

impl DispatchError {
    /// Stable machine-readable code for API and CLI surfaces.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::JobNotFound => "JOB_NOT_FOUND",
            DispatchError::JobSiteNotValid => "JOB_SITE_NOT_VALID",
            DispatchError::ExecutorNotAvailable => "EXECUTOR_NOT_AVAILABLE",
            DispatchError::AlreadyExecuting => "ALREADY_EXECUTING",
            DispatchError::Store(_) => "STORE_ERROR",
        }
    }
}

/// Admits scrape requests and runs executors on a bounded pool.
pub struct ScrapeDispatcher {
    store: Arc<dyn JobStore>,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Notifier,
    workers: Arc<Semaphore>,
    pause_max_secs: u64,
    in_progress: Arc<Mutex<HashSet<SiteKind>>>,
    stop_handles: Arc<Mutex<HashMap<SiteKind, StopHandle>>>,
}

impl ScrapeDispatcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Notifier,
        max_workers: usize,
        pause_max_secs: u64,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            workers: Arc::new(Semaphore::new(max_workers)),
            pause_max_secs,
            in_progress: Arc::new(Mutex::new(HashSet::new())),
            stop_handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The notifier whose streams carry this dispatcher's run events.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Persist a job, reusing an existing one that weakly equals it.
    pub async fn create_scrape_job(&self, job: ScrapeJob) -> crate::error::Result<ScrapeJob> {
        let existing = self.store.all_scrape_jobs().await?;
        if let Some(found) = existing.iter().find(|j| j.weak_equals(&job)) {
            return Ok(found.clone());
        }
        self.store.store_scrape_job(job).await
    }

    /// Persist a batch of jobs, applying the same weak-equality reuse per
    /// item.
    pub async fn create_scrape_jobs(
        &self,
        jobs: Vec<ScrapeJob>,
    ) -> crate::error::Result<Vec<ScrapeJob>> {
        let mut out = Vec::with_capacity(jobs.len());
        for job in jobs {
            out.push(self.create_scrape_job(job).await?);
        }
        Ok(out)
    }

    pub async fn all_scrape_jobs(&self) -> crate::error::Result<Vec<ScrapeJob>> {
        self.store.all_scrape_jobs().await
    }

    /// Site kinds this build can scrape.
    pub fn supported_sites(&self) -> Vec<SiteKind> {
        SiteKind::all().to_vec()
    }

    /// Start scraping the job with the given id.
    ///
    /// Admission is atomic on the site kind: between the reservation here and
    /// the release in the spawned task, no second run for the same kind can
    /// be admitted. Workers beyond the pool size queue on the semaphore while
    /// already counting as in progress.
    pub async fn start_scrape(&self, id: i64) -> Result<(), DispatchError> {
        let job = self
            .store
            .scrape_job_by_id(id)
            .await?
            .ok_or(DispatchError::JobNotFound)?;

        let kind: SiteKind = job.site.parse().map_err(|_| DispatchError::JobSiteNotValid)?;
        let scraper = kind
            .scraper(&job)
            .map_err(|_| DispatchError::ExecutorNotAvailable)?;

        {
            let mut in_progress = lock(&self.in_progress);
            if !in_progress.insert(kind) {
                return Err(DispatchError::AlreadyExecuting);
            }
        }

        let mut executor = ScrapeExecutor::new(
            scraper,
            Arc::clone(&self.store),
            Arc::clone(&self.fetcher),
            self.notifier.clone(),
            self.pause_max_secs,
        );
        lock(&self.stop_handles).insert(kind, executor.stop_handle());

        let name = executor.name().to_string();
        let workers = Arc::clone(&self.workers);
        let in_progress = Arc::clone(&self.in_progress);
        let stop_handles = Arc::clone(&self.stop_handles);
        let notifier = self.notifier.clone();

        tokio::spawn(async move {
            // Queue here if the pool is full. The site stays reserved while
            // waiting so a duplicate request is still refused.
            let permit = match workers.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("worker pool closed before '{name}' could run");
                    lock(&in_progress).remove(&kind);
                    lock(&stop_handles).remove(&kind);
                    return;
                }
            };

            info!("starting scrape run '{name}'");
            match executor.scrape().await {
                Ok(RunOutcome::Completed) => info!("scrape run '{name}' completed"),
                Ok(RunOutcome::Stopped) => info!("scrape run '{name}' stopped"),
                Err(e) => {
                    error!("scrape run '{name}' failed: {e}");
                    notifier.error(&e.to_string(), &name);
                }
            }

            drop(permit);
            lock(&in_progress).remove(&kind);
            lock(&stop_handles).remove(&kind);
            notifier.cleanup();
        });

        Ok(())
    }

    /// Whether the job with the given id is currently being scraped.
    /// Unknown or invalid ids simply read as not scraping.
    pub async fn is_currently_scraping(&self, id: i64) -> bool {
        let Ok(Some(job)) = self.store.scrape_job_by_id(id).await else {
            return false;
        };
        let Ok(kind) = job.site.parse::<SiteKind>() else {
            return false;
        };
        lock(&self.in_progress).contains(&kind)
    }

    /// Request cancellation of the run for the given job id. Returns whether
    /// a live run was found to signal.
    pub async fn stop_scraping(&self, id: i64) -> bool {
        let Ok(Some(job)) = self.store.scrape_job_by_id(id).await else {
            return false;
        };
        let Ok(kind) = job.site.parse::<SiteKind>() else {
            return false;
        };
        match lock(&self.stop_handles).get(&kind) {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    /// Signal every live run to stop.
    pub fn stop_all(&self) {
        for handle in lock(&self.stop_handles).values() {
            handle.stop();
        }
    }

    /// Site kinds with a live run right now.
    pub fn active_sites(&self) -> Vec<SiteKind> {
        lock(&self.in_progress).iter().copied().collect()
    }

    /// Stop every run and wait for the pool to drain.
    pub async fn shutdown(&self) {
        self.stop_all();
        while !lock(&self.in_progress).is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::models::JobPosting;
    use crate::notify::ScrapeEvent;
    use crate::storage::MemoryStore;

    struct NoopFetcher;

    #[async_trait]
    impl PageFetcher for NoopFetcher {
        async fn fetch(&self, _url: &str) -> Option<String> {
            None
        }
    }

    /// Fetcher that blocks until released, then reports failure.
    struct GatedFetcher {
        gate: Semaphore,
        calls: AtomicUsize,
    }

    impl GatedFetcher {
        fn new() -> Self {
            Self {
                gate: Semaphore::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for GatedFetcher {
        async fn fetch(&self, _url: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _permit = self.gate.acquire().await.ok()?;
            None
        }
    }

    /// Fetcher serving a fixed body for every URL.
    struct FixedFetcher(String);

    #[async_trait]
    impl PageFetcher for FixedFetcher {
        async fn fetch(&self, _url: &str) -> Option<String> {
            Some(self.0.clone())
        }
    }

    /// Store whose posting writes always fail.
    struct FailingStore(MemoryStore);

    #[async_trait]
    impl JobStore for FailingStore {
        async fn store_scrape_job(&self, job: ScrapeJob) -> crate::error::Result<ScrapeJob> {
            self.0.store_scrape_job(job).await
        }
        async fn scrape_job_by_id(&self, id: i64) -> crate::error::Result<Option<ScrapeJob>> {
            self.0.scrape_job_by_id(id).await
        }
        async fn all_scrape_jobs(&self) -> crate::error::Result<Vec<ScrapeJob>> {
            self.0.all_scrape_jobs().await
        }
        async fn store_posting(&self, _posting: JobPosting) -> crate::error::Result<JobPosting> {
            Err(AppError::storage("disk full"))
        }
        async fn update_posting(&self, posting: JobPosting) -> crate::error::Result<JobPosting> {
            self.0.update_posting(posting).await
        }
        async fn postings_by_href(&self, href: &str) -> crate::error::Result<Vec<JobPosting>> {
            self.0.postings_by_href(href).await
        }
        async fn all_postings(&self) -> crate::error::Result<Vec<JobPosting>> {
            self.0.all_postings().await
        }
    }

    fn job(site: &str) -> ScrapeJob {
        ScrapeJob {
            name: format!("{site} batch"),
            site: site.to_string(),
            ..ScrapeJob::default()
        }
    }

    fn dispatcher(fetcher: Arc<dyn PageFetcher>) -> ScrapeDispatcher {
        ScrapeDispatcher::new(
            Arc::new(MemoryStore::new()),
            fetcher,
            Notifier::new(),
            10,
            0,
        )
    }

    async fn wait_until<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn unknown_job_id_is_refused() {
        let d = dispatcher(Arc::new(NoopFetcher));
        let err = d.start_scrape(42).await.unwrap_err();
        assert!(matches!(err, DispatchError::JobNotFound));
        assert_eq!(err.code(), "JOB_NOT_FOUND");
    }

    #[tokio::test]
    async fn unrecognized_site_is_refused() {
        let d = dispatcher(Arc::new(NoopFetcher));
        let stored = d.create_scrape_job(job("monster-dot-com")).await.unwrap();
        let err = d.start_scrape(stored.id).await.unwrap_err();
        assert!(matches!(err, DispatchError::JobSiteNotValid));
    }

    #[tokio::test]
    async fn bad_base_url_means_no_executor() {
        let d = dispatcher(Arc::new(NoopFetcher));
        let mut j = job("remote-ok");
        j.base_url = Some("not a url".to_string());
        let stored = d.create_scrape_job(j).await.unwrap();
        let err = d.start_scrape(stored.id).await.unwrap_err();
        assert!(matches!(err, DispatchError::ExecutorNotAvailable));
    }

    #[tokio::test]
    async fn second_request_for_same_site_is_refused() {
        let fetcher = Arc::new(GatedFetcher::new());
        let d = dispatcher(fetcher.clone());
        let stored = d.create_scrape_job(job("remote-ok")).await.unwrap();

        d.start_scrape(stored.id).await.unwrap();
        wait_until(|| fetcher.calls.load(Ordering::SeqCst) > 0).await;
        assert!(d.is_currently_scraping(stored.id).await);

        let err = d.start_scrape(stored.id).await.unwrap_err();
        assert!(matches!(err, DispatchError::AlreadyExecuting));

        // Release the gated fetch; the run fails its main page and ends.
        fetcher.gate.add_permits(1);
        wait_until(|| d.active_sites().is_empty()).await;
        assert!(!d.is_currently_scraping(stored.id).await);

        // The site is free again.
        d.start_scrape(stored.id).await.unwrap();
        wait_until(|| d.active_sites().is_empty()).await;
    }

    #[tokio::test]
    async fn different_sites_run_concurrently() {
        let fetcher = Arc::new(GatedFetcher::new());
        let d = dispatcher(fetcher.clone());
        let a = d.create_scrape_job(job("remote-ok")).await.unwrap();
        let b = d.create_scrape_job(job("remote-co")).await.unwrap();

        d.start_scrape(a.id).await.unwrap();
        d.start_scrape(b.id).await.unwrap();
        wait_until(|| fetcher.calls.load(Ordering::SeqCst) == 2).await;
        assert_eq!(d.active_sites().len(), 2);

        fetcher.gate.add_permits(2);
        wait_until(|| d.active_sites().is_empty()).await;
    }

    #[tokio::test]
    async fn failed_run_emits_error_and_clears_site() {
        let body = r#"[{
            "url": "https://www.workingnomads.co/jobs/x",
            "category_name": "Development",
            "title": "Dev"
        }]"#;
        let store = Arc::new(FailingStore(MemoryStore::new()));
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe_all();
        let d = ScrapeDispatcher::new(
            store,
            Arc::new(FixedFetcher(body.to_string())),
            notifier,
            10,
            0,
        );

        let stored = d.create_scrape_job(job("working-nomads")).await.unwrap();
        d.start_scrape(stored.id).await.unwrap();
        wait_until(|| d.active_sites().is_empty()).await;

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ScrapeEvent::Error { .. }) {
                saw_error = true;
            }
        }
        assert!(saw_error);
        assert!(!d.is_currently_scraping(stored.id).await);
    }

    #[tokio::test]
    async fn stop_scraping_signals_live_run() {
        let fetcher = Arc::new(GatedFetcher::new());
        let d = dispatcher(fetcher.clone());
        let stored = d.create_scrape_job(job("we-work-remotely")).await.unwrap();

        assert!(!d.stop_scraping(stored.id).await);

        d.start_scrape(stored.id).await.unwrap();
        wait_until(|| fetcher.calls.load(Ordering::SeqCst) > 0).await;
        assert!(d.stop_scraping(stored.id).await);

        fetcher.gate.add_permits(1);
        wait_until(|| d.active_sites().is_empty()).await;
    }

    #[tokio::test]
    async fn stop_scraping_unknown_id_is_false() {
        let d = dispatcher(Arc::new(NoopFetcher));
        assert!(!d.stop_scraping(999).await);
    }

    #[tokio::test]
    async fn create_scrape_job_reuses_weak_equal() {
        let d = dispatcher(Arc::new(NoopFetcher));
        let first = d.create_scrape_job(job("remote-ok")).await.unwrap();
        let second = d.create_scrape_job(job("remote-ok")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(d.all_scrape_jobs().await.unwrap().len(), 1);

        // Same name on a different site is a distinct job.
        let mut other = job("remote-ok");
        other.name = "different batch".to_string();
        let third = d.create_scrape_job(other).await.unwrap();
        assert_ne!(first.id, third.id);
    }

    #[tokio::test]
    async fn create_scrape_jobs_batch() {
        let d = dispatcher(Arc::new(NoopFetcher));
        let jobs = vec![job("remote-ok"), job("remote-co"), job("remote-ok")];
        let stored = d.create_scrape_jobs(jobs).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].id, stored[2].id);
        assert_eq!(d.all_scrape_jobs().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn shutdown_drains_live_runs() {
        let fetcher = Arc::new(GatedFetcher::new());
        let d = dispatcher(fetcher.clone());
        let stored = d.create_scrape_job(job("remote-ok")).await.unwrap();
        d.start_scrape(stored.id).await.unwrap();
        wait_until(|| fetcher.calls.load(Ordering::SeqCst) > 0).await;

        fetcher.gate.add_permits(1);
        d.shutdown().await;
        assert!(d.active_sites().is_empty());
    }

    #[tokio::test]
    async fn is_currently_scraping_unknown_id_is_false() {
        let d = dispatcher(Arc::new(NoopFetcher));
        assert!(!d.is_currently_scraping(7).await);
    }
}
