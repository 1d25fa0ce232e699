// src/scrape/mod.rs

//! The scrape dispatch and execution engine.
//!
//! - [`ScrapeExecutor`] drives one scrape run end-to-end
//! - [`ScrapeDispatcher`] admits scrape requests, enforces one run per site
//!   kind, and schedules executors on a bounded worker pool

pub mod dispatcher;
pub mod executor;

pub use dispatcher::{DispatchError, ScrapeDispatcher};
pub use executor::{RunOutcome, ScrapeExecutor, StopHandle};
