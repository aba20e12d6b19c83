//! Debounced membership directory lookup.
//!
//! Each call to [`DirectorySearch::set_query`] supersedes the previous one:
//! the pending task is aborted and the request id moves on, so a lookup
//! that completes after being superseded can no longer publish.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use tally_types::User;

use crate::SharedLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub debounce: Duration,
    /// Counted in `char`s.
    pub min_query_chars: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            min_query_chars: 2,
        }
    }
}

/// The most recently applied lookup. `request == 0` means nothing applied yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub request: u64,
    pub query: String,
    pub users: Vec<User>,
}

pub struct DirectorySearch {
    ledger: SharedLedger,
    settings: SearchSettings,
    latest: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    results: watch::Sender<SearchResults>,
}

impl DirectorySearch {
    #[must_use]
    pub fn new(ledger: SharedLedger, settings: SearchSettings) -> Self {
        let (results, _) = watch::channel(SearchResults::default());
        Self {
            ledger,
            settings,
            latest: Arc::new(AtomicU64::new(0)),
            pending: None,
            results,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.results.subscribe()
    }

    #[must_use]
    pub fn results(&self) -> SearchResults {
        self.results.borrow().clone()
    }

    /// Schedule a lookup for `query` once the debounce window passes quietly.
    ///
    /// Must be called from within a Tokio runtime. Returns the request id.
    pub fn set_query(&mut self, query: impl Into<String>) -> u64 {
        let query = query.into();
        let request = self.invalidate();

        let ledger = Arc::clone(&self.ledger);
        let latest = Arc::clone(&self.latest);
        let results = self.results.clone();
        let settings = self.settings;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(settings.debounce).await;
            if latest.load(Ordering::SeqCst) != request {
                return;
            }

            let users = if query.chars().count() < settings.min_query_chars {
                Vec::new()
            } else {
                match ledger.search_users(&query).await {
                    Ok(users) => users,
                    Err(e) => {
                        tracing::warn!(request, error = %e, "Directory lookup failed");
                        Vec::new()
                    }
                }
            };

            if latest.load(Ordering::SeqCst) != request {
                tracing::debug!(request, "Discarding superseded directory lookup");
                return;
            }
            results.send_replace(SearchResults {
                request,
                query,
                users,
            });
        }));

        request
    }

    /// Drop any pending lookup and publish an empty result set immediately.
    pub fn clear(&mut self) {
        let request = self.invalidate();
        self.results.send_replace(SearchResults {
            request,
            ..SearchResults::default()
        });
    }

    fn invalidate(&mut self) -> u64 {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Drop for DirectorySearch {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
