//! Confirmation state for a group's settlement view.
//!
//! At most one transaction per view may be confirming. The state is an
//! explicit enum rather than a flag so that "which row is in flight" and
//! "is anything in flight" can never disagree.
//!
//! Transitions:
//!
//! ```text
//! Idle --begin(i)--> Confirming{i} --finish--> Idle
//!                    Confirming{i} --begin(j)--> Busy (state unchanged)
//! ```

use crate::ids::UserId;
use crate::model::SettlementTransaction;

/// Identifies a transaction by its endpoints. Amounts change as the ledger
/// recomputes, endpoints do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    pub from: UserId,
    pub to: UserId,
}

impl From<&SettlementTransaction> for TransactionKey {
    fn from(tx: &SettlementTransaction) -> Self {
        Self {
            from: tx.from_id.clone(),
            to: tx.to_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfirmState {
    #[default]
    Idle,
    Confirming {
        index: usize,
        key: TransactionKey,
    },
}

/// Proof that a confirmation slot was acquired.
///
/// Only [`ConfirmState::begin`] constructs one, and [`ConfirmState::finish`]
/// consumes it, so a slot cannot be released twice.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a ticket must be passed back to `finish`"]
pub struct ConfirmTicket {
    index: usize,
    key: TransactionKey,
}

impl ConfirmTicket {
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn key(&self) -> &TransactionKey {
        &self.key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Busy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Pending,
    Confirming,
}

impl ConfirmState {
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, ConfirmState::Confirming { .. })
    }

    pub fn begin(&mut self, index: usize, tx: &SettlementTransaction) -> Result<ConfirmTicket, Busy> {
        if self.is_busy() {
            return Err(Busy);
        }
        let key = TransactionKey::from(tx);
        *self = ConfirmState::Confirming {
            index,
            key: key.clone(),
        };
        Ok(ConfirmTicket { index, key })
    }

    /// Release the slot held by `ticket`. Returns to `Idle` whether the
    /// confirmation succeeded or failed.
    pub fn finish(&mut self, ticket: ConfirmTicket) {
        let held = matches!(
            self,
            ConfirmState::Confirming { index, key } if *index == ticket.index && *key == ticket.key
        );
        if held {
            *self = ConfirmState::Idle;
        }
    }

    #[must_use]
    pub fn row_status(&self, row: usize) -> RowStatus {
        match self {
            ConfirmState::Confirming { index, .. } if *index == row => RowStatus::Confirming,
            _ => RowStatus::Pending,
        }
    }
}

/// What the settlement view is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardStatus {
    /// The user belongs to no group yet.
    NoGroup,
    Loading,
    /// Zero outstanding transactions: the group is fully settled.
    Settled,
    Outstanding(usize),
    /// The selected group's list could not be fetched. Nothing is known
    /// about what it owes.
    Unavailable,
}
