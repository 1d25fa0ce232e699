//! In-memory store.
//!
//! Backs tests and one-shot CLI runs that have no reason to touch disk.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{JobPosting, ScrapeJob};
use crate::storage::JobStore;

#[derive(Default)]
struct Inner {
    jobs: Vec<ScrapeJob>,
    postings: Vec<JobPosting>,
    next_job_id: i64,
    next_posting_id: i64,
}

/// Mutex-backed in-memory storage.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of postings written so far. Test helper.
    pub fn posting_count(&self) -> usize {
        self.inner.lock().unwrap().postings.len()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn store_scrape_job(&self, mut job: ScrapeJob) -> Result<ScrapeJob> {
        let mut inner = self.inner.lock().unwrap();
        if job.id == 0 {
            inner.next_job_id += 1;
            job.id = inner.next_job_id;
        }
        inner.jobs.retain(|j| j.id != job.id);
        inner.jobs.push(job.clone());
        Ok(job)
    }

    async fn scrape_job_by_id(&self, id: i64) -> Result<Option<ScrapeJob>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn all_scrape_jobs(&self) -> Result<Vec<ScrapeJob>> {
        Ok(self.inner.lock().unwrap().jobs.clone())
    }

    async fn store_posting(&self, mut posting: JobPosting) -> Result<JobPosting> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_posting_id += 1;
        posting.id = Some(inner.next_posting_id);
        inner.postings.push(posting.clone());
        Ok(posting)
    }

    async fn update_posting(&self, posting: JobPosting) -> Result<JobPosting> {
        let mut inner = self.inner.lock().unwrap();
        let id = posting
            .id
            .ok_or_else(|| AppError::storage("cannot update a posting without an id"))?;
        let slot = inner
            .postings
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| AppError::storage(format!("no posting with id {}", id)))?;
        *slot = posting.clone();
        Ok(posting)
    }

    async fn postings_by_href(&self, href: &str) -> Result<Vec<JobPosting>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .postings
            .iter()
            .filter(|p| p.href == href)
            .cloned()
            .collect())
    }

    async fn all_postings(&self) -> Result<Vec<JobPosting>> {
        Ok(self.inner.lock().unwrap().postings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn assigns_job_ids() {
        let store = MemoryStore::new();
        let job = store
            .store_scrape_job(ScrapeJob {
                name: "a".into(),
                site: "remote-ok".into(),
                ..ScrapeJob::default()
            })
            .await
            .unwrap();
        assert_eq!(job.id, 1);
        assert_eq!(store.scrape_job_by_id(1).await.unwrap().unwrap().name, "a");
    }

    #[tokio::test]
    async fn store_with_existing_id_replaces() {
        let store = MemoryStore::new();
        let mut job = store
            .store_scrape_job(ScrapeJob {
                name: "a".into(),
                site: "remote-ok".into(),
                ..ScrapeJob::default()
            })
            .await
            .unwrap();
        job.name = "b".into();
        store.store_scrape_job(job).await.unwrap();
        assert_eq!(store.all_scrape_jobs().await.unwrap().len(), 1);
        assert_eq!(store.scrape_job_by_id(1).await.unwrap().unwrap().name, "b");
    }

    #[tokio::test]
    async fn href_lookup_observes_prior_write() {
        let store = MemoryStore::new();
        let posting = store
            .store_posting(JobPosting::with_href("https://example.com/job/1"))
            .await
            .unwrap();
        assert!(posting.id.is_some());

        let found = store
            .postings_by_href("https://example.com/job/1")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(
            store
                .postings_by_href("https://example.com/job/2")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn update_requires_known_id() {
        let store = MemoryStore::new();
        let err = store
            .update_posting(JobPosting::with_href("https://example.com/job/1"))
            .await;
        assert!(err.is_err());

        let mut posting = store
            .store_posting(JobPosting::with_href("https://example.com/job/1"))
            .await
            .unwrap();
        posting.status = "applied".into();
        let updated = store.update_posting(posting).await.unwrap();
        assert_eq!(updated.status, "applied");
        assert_eq!(store.posting_count(), 1);
    }
}
