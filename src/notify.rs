// src/notify.rs

//! Progress event publishing.
//!
//! Executors report progress through a [`Notifier`]: an in-process pub/sub
//! hub with one broadcast topic per scraper display name plus a firehose
//! carrying everything. Publishing is fire-and-forget; a send with no
//! subscribers is a no-op and a slow subscriber only loses its own backlog,
//! it can never stall an executor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::JobPosting;
use crate::utils::lock;

/// Default per-topic channel capacity.
const DEFAULT_CAPACITY: usize = 256;

/// A named progress event, tagged with the display name of the executor
/// that produced it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ScrapeEvent {
    Sleeping { seconds: u64, name: String },
    ScrapingMainPage { uri: String, name: String },
    SuccessfulMainPageScrape { uri: String, name: String },
    FailMainPageScrape { uri: String, name: String },
    FoundPostings { count: usize, name: String, uri: String },
    ScrapingDescPage { href: String, name: String },
    SuccessfulDescPageScrape { posting: Box<JobPosting>, name: String },
    FailedDescPageScrape { href: String, name: String },
    Error { cause: String, name: String },
    Message { text: String, name: String },
}

impl ScrapeEvent {
    /// The display name this event is tagged with.
    pub fn name(&self) -> &str {
        match self {
            ScrapeEvent::Sleeping { name, .. }
            | ScrapeEvent::ScrapingMainPage { name, .. }
            | ScrapeEvent::SuccessfulMainPageScrape { name, .. }
            | ScrapeEvent::FailMainPageScrape { name, .. }
            | ScrapeEvent::FoundPostings { name, .. }
            | ScrapeEvent::ScrapingDescPage { name, .. }
            | ScrapeEvent::SuccessfulDescPageScrape { name, .. }
            | ScrapeEvent::FailedDescPageScrape { name, .. }
            | ScrapeEvent::Error { name, .. }
            | ScrapeEvent::Message { name, .. } => name,
        }
    }
}

/// In-process pub/sub hub for scrape progress events.
///
/// Thread-safe and cloneable; clones share the same topics.
#[derive(Clone)]
pub struct Notifier {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<ScrapeEvent>>>>,
    firehose: broadcast::Sender<ScrapeEvent>,
    capacity: usize,
}

impl Notifier {
    /// Create a notifier with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a notifier with the given per-topic channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (firehose, _) = broadcast::channel(capacity);
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            firehose,
            capacity,
        }
    }

    /// Subscribe to events for one display name. Creates the topic if it
    /// does not exist yet.
    pub fn subscribe(&self, name: &str) -> broadcast::Receiver<ScrapeEvent> {
        let mut topics = lock(&self.topics);
        topics
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe to every event regardless of name.
    pub fn subscribe_all(&self) -> broadcast::Receiver<ScrapeEvent> {
        self.firehose.subscribe()
    }

    /// Publish an event. Send errors (no receivers) are ignored.
    pub fn publish(&self, event: ScrapeEvent) {
        let _ = self.firehose.send(event.clone());
        let topics = lock(&self.topics);
        if let Some(tx) = topics.get(event.name()) {
            let _ = tx.send(event);
        }
    }

    /// Drop topics with no remaining subscribers.
    pub fn cleanup(&self) {
        let mut topics = lock(&self.topics);
        topics.retain(|_, tx| tx.receiver_count() > 0);
    }

    // Named emitters mirroring the event vocabulary.

    pub fn sleeping(&self, seconds: u64, name: &str) {
        self.publish(ScrapeEvent::Sleeping {
            seconds,
            name: name.to_string(),
        });
    }

    pub fn scraping_main_page(&self, uri: &str, name: &str) {
        self.publish(ScrapeEvent::ScrapingMainPage {
            uri: uri.to_string(),
            name: name.to_string(),
        });
    }

    pub fn successful_main_page_scrape(&self, uri: &str, name: &str) {
        self.publish(ScrapeEvent::SuccessfulMainPageScrape {
            uri: uri.to_string(),
            name: name.to_string(),
        });
    }

    pub fn fail_main_page_scrape(&self, uri: &str, name: &str) {
        self.publish(ScrapeEvent::FailMainPageScrape {
            uri: uri.to_string(),
            name: name.to_string(),
        });
    }

    pub fn found_postings(&self, count: usize, name: &str, uri: &str) {
        self.publish(ScrapeEvent::FoundPostings {
            count,
            name: name.to_string(),
            uri: uri.to_string(),
        });
    }

    pub fn scraping_desc_page(&self, href: &str, name: &str) {
        self.publish(ScrapeEvent::ScrapingDescPage {
            href: href.to_string(),
            name: name.to_string(),
        });
    }

    pub fn successful_desc_page_scrape(&self, posting: &JobPosting, name: &str) {
        self.publish(ScrapeEvent::SuccessfulDescPageScrape {
            posting: Box::new(posting.clone()),
            name: name.to_string(),
        });
    }

    pub fn failed_desc_page_scrape(&self, href: &str, name: &str) {
        self.publish(ScrapeEvent::FailedDescPageScrape {
            href: href.to_string(),
            name: name.to_string(),
        });
    }

    pub fn error(&self, cause: &str, name: &str) {
        self.publish(ScrapeEvent::Error {
            cause: cause.to_string(),
            name: name.to_string(),
        });
    }

    pub fn send(&self, text: &str, name: &str) {
        self.publish(ScrapeEvent::Message {
            text: text.to_string(),
            name: name.to_string(),
        });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_subscribe_roundtrip() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe("remote-ok");

        notifier.sleeping(3, "remote-ok");

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            ScrapeEvent::Sleeping {
                seconds: 3,
                name: "remote-ok".to_string()
            }
        );
    }

    #[tokio::test]
    async fn topics_are_isolated_by_name() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe("remote-ok");

        notifier.send("other run", "remote-co");
        notifier.send("my run", "remote-ok");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "remote-ok");
    }

    #[tokio::test]
    async fn firehose_sees_all_names() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe_all();

        notifier.send("a", "remote-ok");
        notifier.send("b", "remote-co");

        assert_eq!(rx.recv().await.unwrap().name(), "remote-ok");
        assert_eq!(rx.recv().await.unwrap().name(), "remote-co");
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let notifier = Notifier::new();
        // Must not panic or block.
        notifier.error("boom", "remote-ok");
    }

    #[test]
    fn publish_survives_poisoned_topics() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe("remote-ok");

        // Poison the topic map the way a panicking subscriber thread would.
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = notifier.topics.lock().unwrap();
            panic!("subscriber blew up");
        }));
        assert!(notifier.topics.lock().is_err());

        notifier.send("still delivering", "remote-ok");
        assert_eq!(rx.try_recv().unwrap().name(), "remote-ok");
    }

    #[test]
    fn cleanup_drops_dead_topics() {
        let notifier = Notifier::new();
        drop(notifier.subscribe("remote-ok"));
        notifier.cleanup();
        assert!(notifier.topics.lock().unwrap().is_empty());
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = ScrapeEvent::FoundPostings {
            count: 2,
            name: "remote-ok".to_string(),
            uri: "https://remoteok.io/remote-dev-jobs".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"foundPostings\""));
        assert!(json.contains("\"count\":2"));
    }
}
