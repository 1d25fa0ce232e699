//! Storage abstractions for scrape jobs and postings.
//!
//! The store is the sole source of truth for persisted postings. The engine
//! writes during a run and reads back only for href-based dedup; everything
//! else is control-surface traffic. Backends must keep per-href operations
//! linearizable: once `store_posting` returns, a subsequent
//! `postings_by_href` observes the write.

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{JobPosting, ScrapeJob};

pub use local::LocalStore;
pub use memory::MemoryStore;

/// Trait for scrape-job and posting persistence backends.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a scrape job, assigning an id when it has none.
    async fn store_scrape_job(&self, job: ScrapeJob) -> Result<ScrapeJob>;

    /// Look up a scrape job by id.
    async fn scrape_job_by_id(&self, id: i64) -> Result<Option<ScrapeJob>>;

    /// All persisted scrape jobs.
    async fn all_scrape_jobs(&self) -> Result<Vec<ScrapeJob>>;

    /// Persist a freshly extracted posting, assigning an id.
    async fn store_posting(&self, posting: JobPosting) -> Result<JobPosting>;

    /// Update an existing posting in place, matched by id.
    async fn update_posting(&self, posting: JobPosting) -> Result<JobPosting>;

    /// All postings whose href matches exactly. Dedup lookup.
    async fn postings_by_href(&self, href: &str) -> Result<Vec<JobPosting>>;

    /// All persisted postings.
    async fn all_postings(&self) -> Result<Vec<JobPosting>>;
}
