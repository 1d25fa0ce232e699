// src/models/mod.rs

//! Domain models for the scraper application.

mod posting;
mod scrape_job;

pub use posting::JobPosting;
pub use scrape_job::ScrapeJob;
