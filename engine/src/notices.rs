//! The single transient message line shared by a screen's components.
//!
//! A notice either persists until replaced or cleared, or carries a deadline
//! after which it reads as absent. Posting always replaces the previous
//! notice, so an old deadline can never hide a newer message.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use tally_types::Notice;

/// How long each kind of success notice stays visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticeTimings {
    pub settled: Duration,
    pub reminder: Duration,
    pub expense_added: Duration,
}

impl Default for NoticeTimings {
    fn default() -> Self {
        Self {
            settled: Duration::from_secs(5),
            reminder: Duration::from_secs(3),
            expense_added: Duration::from_secs(3),
        }
    }
}

#[derive(Debug)]
struct ActiveNotice {
    notice: Notice,
    expires_at: Option<Instant>,
}

impl ActiveNotice {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Cloneable handle; all clones see the same notice.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    slot: Arc<Mutex<Option<ActiveNotice>>>,
}

impl NoticeBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current notice. `ttl = None` keeps it until replaced.
    pub fn post(&self, notice: Notice, ttl: Option<Duration>) {
        tracing::debug!(kind = ?notice.kind(), text = notice.text(), ?ttl, "Notice posted");
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        *self.lock() = Some(ActiveNotice { notice, expires_at });
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// The visible notice, if any. Expired notices are dropped on read.
    #[must_use]
    pub fn current(&self) -> Option<Notice> {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|active| !active.is_live(Instant::now())) {
            *slot = None;
        }
        slot.as_ref().map(|active| active.notice.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ActiveNotice>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
