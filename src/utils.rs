// src/utils.rs

//! Utility functions and helpers.

use std::sync::{Mutex, MutexGuard};

use url::Url;

/// Lock a mutex, recovering the guard when a panicking holder poisoned it.
/// The guarded structures stay consistent across a panic, so the poison flag
/// carries no information here.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}
