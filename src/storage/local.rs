//! Local filesystem store.
//!
//! Two JSON collections under a root directory:
//!
//! ```text
//! {root}/
//! ├── scrape_jobs.json
//! └── postings.json
//! ```
//!
//! Writes go through a temp file and rename, so readers never observe a
//! half-written collection. A process-wide lock serializes mutations, which
//! is what gives the per-href read-after-write guarantee.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{JobPosting, ScrapeJob};
use crate::storage::JobStore;

const JOBS_KEY: &str = "scrape_jobs.json";
const POSTINGS_KEY: &str = "postings.json";

/// On-disk envelope for a collection.
#[derive(Debug, Serialize, Deserialize)]
struct Collection<T> {
    updated_at: DateTime<Utc>,
    count: usize,
    items: Vec<T>,
}

impl<T> Collection<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: items.len(),
            items,
        }
    }
}

/// Local filesystem storage backend.
pub struct LocalStore {
    root_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => {
                let collection: Collection<T> = serde_json::from_slice(&bytes)?;
                Ok(collection.items)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn write_collection<T: Serialize>(&self, key: &str, items: Vec<T>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&Collection::new(items))?;
        self.write_bytes(key, &bytes).await
    }
}

#[async_trait]
impl JobStore for LocalStore {
    async fn store_scrape_job(&self, mut job: ScrapeJob) -> Result<ScrapeJob> {
        let _guard = self.write_lock.lock().await;
        let mut jobs: Vec<ScrapeJob> = self.read_collection(JOBS_KEY).await?;
        if job.id == 0 {
            job.id = jobs.iter().map(|j| j.id).max().unwrap_or(0) + 1;
        }
        jobs.retain(|j| j.id != job.id);
        jobs.push(job.clone());
        self.write_collection(JOBS_KEY, jobs).await?;
        Ok(job)
    }

    async fn scrape_job_by_id(&self, id: i64) -> Result<Option<ScrapeJob>> {
        let jobs: Vec<ScrapeJob> = self.read_collection(JOBS_KEY).await?;
        Ok(jobs.into_iter().find(|j| j.id == id))
    }

    async fn all_scrape_jobs(&self) -> Result<Vec<ScrapeJob>> {
        self.read_collection(JOBS_KEY).await
    }

    async fn store_posting(&self, mut posting: JobPosting) -> Result<JobPosting> {
        let _guard = self.write_lock.lock().await;
        let mut postings: Vec<JobPosting> = self.read_collection(POSTINGS_KEY).await?;
        let next_id = postings.iter().filter_map(|p| p.id).max().unwrap_or(0) + 1;
        posting.id = Some(next_id);
        postings.push(posting.clone());
        self.write_collection(POSTINGS_KEY, postings).await?;
        Ok(posting)
    }

    async fn update_posting(&self, posting: JobPosting) -> Result<JobPosting> {
        let _guard = self.write_lock.lock().await;
        let id = posting
            .id
            .ok_or_else(|| AppError::storage("cannot update a posting without an id"))?;
        let mut postings: Vec<JobPosting> = self.read_collection(POSTINGS_KEY).await?;
        let slot = postings
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| AppError::storage(format!("no posting with id {}", id)))?;
        *slot = posting.clone();
        self.write_collection(POSTINGS_KEY, postings).await?;
        Ok(posting)
    }

    async fn postings_by_href(&self, href: &str) -> Result<Vec<JobPosting>> {
        let postings: Vec<JobPosting> = self.read_collection(POSTINGS_KEY).await?;
        Ok(postings.into_iter().filter(|p| p.href == href).collect())
    }

    async fn all_postings(&self) -> Result<Vec<JobPosting>> {
        self.read_collection(POSTINGS_KEY).await
    }
}
