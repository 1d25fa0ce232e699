// src/lib.rs

//! jobbatch - batch scraper for remote-work job boards

pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod notify;
pub mod scrape;
pub mod sites;
pub mod storage;
pub mod utils;
