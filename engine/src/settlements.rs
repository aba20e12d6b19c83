//! Settlement view for one group at a time, with single-flight confirmation.
//!
//! The transaction list is a projection owned by the ledger. It is never
//! edited locally: a confirmed transaction disappears only because the
//! re-fetch that follows no longer contains it.
//!
//! Every fetch carries a sequence number. Switching groups or starting a
//! newer fetch moves the sequence on, and a fetch that completes with an
//! outdated number is dropped, so two groups' lists never mix.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tally_client::LedgerError;
use tally_types::{
    BoardStatus, ConfirmState, ConfirmTicket, Group, GroupId, Notice, RowStatus, SETTLE_FALLBACK,
    SettlementTransaction,
};

use crate::SharedLedger;
use crate::notices::{NoticeBoard, NoticeTimings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The ledger accepted the settlement; the list has been re-fetched.
    Settled,
    /// The ledger refused; the transaction stays pending.
    Failed,
    /// The ledger accepted the settlement but the re-fetch failed. The old
    /// list is withdrawn until the next successful refresh.
    SettledRefreshFailed,
    /// Another confirmation or a fetch is in flight. Nothing was sent.
    Busy,
    NoSuchTransaction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardRow {
    pub transaction: SettlementTransaction,
    pub status: RowStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub groups: Vec<Group>,
    pub selected: Option<GroupId>,
    pub status: BoardStatus,
    pub rows: Vec<BoardRow>,
    pub notice: Option<Notice>,
}

#[derive(Debug, Default)]
struct BoardState {
    groups: Vec<Group>,
    selected: Option<GroupId>,
    transactions: Vec<SettlementTransaction>,
    loading: bool,
    /// The selected group's list has been fetched at least once.
    loaded: bool,
    fetch_seq: u64,
    confirm: ConfirmState,
    /// Group the in-flight confirmation belongs to.
    confirming_in: Option<GroupId>,
}

impl BoardState {
    fn row_status(&self, row: usize) -> RowStatus {
        if self.confirming_in.is_some() && self.confirming_in == self.selected {
            self.confirm.row_status(row)
        } else {
            RowStatus::Pending
        }
    }

    fn status(&self) -> BoardStatus {
        if self.selected.is_none() {
            BoardStatus::NoGroup
        } else if self.loading {
            BoardStatus::Loading
        } else if !self.loaded {
            BoardStatus::Unavailable
        } else if self.transactions.is_empty() {
            BoardStatus::Settled
        } else {
            BoardStatus::Outstanding(self.transactions.len())
        }
    }

    /// Point the view at `group`, dropping the old list and outdating any
    /// fetch still in flight for it.
    fn select(&mut self, group: GroupId) {
        self.selected = Some(group);
        self.transactions.clear();
        self.loading = true;
        self.loaded = false;
        self.fetch_seq += 1;
    }
}

struct Inner {
    ledger: SharedLedger,
    notices: NoticeBoard,
    currency: String,
    timings: NoticeTimings,
    state: Mutex<BoardState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the confirmation slot when the attempt ends, including when
/// the confirming future is dropped mid-flight.
struct ConfirmGuard<'a> {
    inner: &'a Inner,
    ticket: Option<ConfirmTicket>,
}

impl Drop for ConfirmGuard<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            let mut state = self.inner.lock();
            state.confirm.finish(ticket);
            state.confirming_in = None;
        }
    }
}

/// Cloneable handle; clones drive the same view.
#[derive(Clone)]
pub struct SettlementBoard {
    inner: Arc<Inner>,
}

impl SettlementBoard {
    #[must_use]
    pub fn new(
        ledger: SharedLedger,
        notices: NoticeBoard,
        currency: impl Into<String>,
        timings: NoticeTimings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                ledger,
                notices,
                currency: currency.into(),
                timings,
                state: Mutex::new(BoardState::default()),
            }),
        }
    }

    /// Load the group list and show `preferred` if it is one of them,
    /// otherwise the first group.
    pub async fn open(&self, preferred: Option<&GroupId>) -> Result<(), LedgerError> {
        let groups = self.inner.ledger.list_groups().await.inspect_err(|e| {
            tracing::warn!(error = %e, "Failed to load groups for settlements");
        })?;

        let target = preferred
            .filter(|id| groups.iter().any(|g| &g.id == *id))
            .cloned()
            .or_else(|| groups.first().map(|g| g.id.clone()));

        {
            let mut state = self.inner.lock();
            state.groups = groups;
            match target {
                Some(id) => state.select(id),
                None => {
                    state.selected = None;
                    state.transactions.clear();
                    state.loading = false;
                    state.loaded = false;
                    return Ok(());
                }
            }
        }
        self.refresh().await
    }

    /// Show another group. The previous list is discarded immediately.
    /// Returns `false` for a group the board does not know.
    pub async fn switch_group(&self, id: &GroupId) -> Result<bool, LedgerError> {
        {
            let mut state = self.inner.lock();
            if !state.groups.iter().any(|g| &g.id == id) {
                return Ok(false);
            }
            state.select(id.clone());
        }
        self.refresh().await.map(|()| true)
    }

    /// Re-fetch the selected group's transactions.
    ///
    /// On failure the current list stays on screen and the error is returned
    /// after being logged. A group whose first fetch fails reports
    /// [`BoardStatus::Unavailable`].
    pub async fn refresh(&self) -> Result<(), LedgerError> {
        let (seq, group) = {
            let mut state = self.inner.lock();
            let Some(group) = state.selected.clone() else {
                return Ok(());
            };
            state.fetch_seq += 1;
            state.loading = true;
            (state.fetch_seq, group)
        };

        let fetched = self.inner.ledger.settlements(&group).await;

        let mut state = self.inner.lock();
        if state.fetch_seq != seq {
            tracing::debug!(group = %group, seq, "Discarding stale settlement fetch");
            return Ok(());
        }
        state.loading = false;
        match fetched {
            Ok(transactions) => {
                tracing::debug!(group = %group, count = transactions.len(), "Settlements loaded");
                state.transactions = transactions;
                state.loaded = true;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(group = %group, error = %e, "Failed to fetch settlements");
                Err(e)
            }
        }
    }

    /// Confirm the transaction at `index` with the ledger.
    ///
    /// Only one confirmation may be in flight, and the slot stays taken
    /// until the re-fetch that follows a success has landed. A call while
    /// the slot is taken, or while the list is being fetched, returns
    /// [`ConfirmOutcome::Busy`] without contacting the ledger.
    pub async fn confirm(&self, index: usize) -> ConfirmOutcome {
        let (guard, group, tx) = {
            let mut state = self.inner.lock();
            if state.confirm.is_busy() || state.loading {
                return ConfirmOutcome::Busy;
            }
            let Some(group) = state.selected.clone() else {
                return ConfirmOutcome::NoSuchTransaction;
            };
            let Some(tx) = state.transactions.get(index).cloned() else {
                return ConfirmOutcome::NoSuchTransaction;
            };
            let Ok(ticket) = state.confirm.begin(index, &tx) else {
                return ConfirmOutcome::Busy;
            };
            state.confirming_in = Some(group.clone());
            let guard = ConfirmGuard {
                inner: &self.inner,
                ticket: Some(ticket),
            };
            (guard, group, tx)
        };

        self.inner.notices.clear();
        let result = self.inner.ledger.settle(&group, &tx).await;

        match result {
            Ok(()) => {
                tracing::info!(
                    group = %group,
                    from = %tx.from_id,
                    to = %tx.to_id,
                    amount = tx.amount,
                    "Settlement confirmed"
                );
                self.inner.notices.post(
                    Notice::settled(&self.inner.currency, &tx),
                    Some(self.inner.timings.settled),
                );
                // The ledger has recomputed; show whatever it now says.
                let refreshed = self.refresh().await;
                let outcome = if refreshed.is_ok() {
                    ConfirmOutcome::Settled
                } else {
                    // The list on screen still holds the settled transaction.
                    let mut state = self.inner.lock();
                    if state.selected.as_ref() == Some(&group) {
                        state.transactions.clear();
                        state.loaded = false;
                    }
                    ConfirmOutcome::SettledRefreshFailed
                };
                drop(guard);
                outcome
            }
            Err(e) => {
                drop(guard);
                tracing::warn!(group = %group, error = %e, "Settlement confirmation failed");
                let message = e.user_message(SETTLE_FALLBACK);
                self.inner.notices.post(Notice::error(message), None);
                ConfirmOutcome::Failed
            }
        }
    }

    /// Acknowledge a reminder locally. Nothing is sent to the debtor.
    /// Refused while a confirmation is in flight.
    pub fn remind(&self, index: usize) -> bool {
        let tx = {
            let state = self.inner.lock();
            if state.confirm.is_busy() {
                return false;
            }
            state.transactions.get(index).cloned()
        };
        let Some(tx) = tx else {
            return false;
        };
        tracing::info!(from = %tx.from_id, "Reminder acknowledged locally");
        self.inner
            .notices
            .post(Notice::reminder(&tx), Some(self.inner.timings.reminder));
        true
    }

    #[must_use]
    pub fn status(&self) -> BoardStatus {
        self.inner.lock().status()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.lock().confirm.is_busy()
    }

    #[must_use]
    pub fn selected_group(&self) -> Option<GroupId> {
        self.inner.lock().selected.clone()
    }

    #[must_use]
    pub fn transactions(&self) -> Vec<SettlementTransaction> {
        self.inner.lock().transactions.clone()
    }

    #[must_use]
    pub fn row_status(&self, index: usize) -> RowStatus {
        self.inner.lock().row_status(index)
    }

    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        self.inner.notices.current()
    }

    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        let state = self.inner.lock();
        let rows = state
            .transactions
            .iter()
            .enumerate()
            .map(|(i, tx)| BoardRow {
                transaction: tx.clone(),
                status: state.row_status(i),
            })
            .collect();
        BoardSnapshot {
            groups: state.groups.clone(),
            selected: state.selected.clone(),
            status: state.status(),
            rows,
            notice: self.inner.notices.current(),
        }
    }
}
