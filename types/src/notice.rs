//! User-facing status notices.
//!
//! Notices are the only channel through which failures reach the user; none
//! of the flows here are allowed to crash the view.

use crate::model::SettlementTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    kind: NoticeKind,
    text: String,
}

pub const SETTLE_FALLBACK: &str = "Failed to confirm settlement";
pub const EXPENSE_FALLBACK: &str = "Error adding expense";

impl Notice {
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn settled(currency: &str, tx: &SettlementTransaction) -> Self {
        Self::success(format!(
            "Successfully settled {currency}{} between {} and {}",
            tx.amount, tx.from, tx.to
        ))
    }

    /// Local acknowledgement only. Nothing is delivered to the debtor.
    #[must_use]
    pub fn reminder(tx: &SettlementTransaction) -> Self {
        Self::success(format!("Reminder sent to {}!", tx.from))
    }

    #[must_use]
    pub fn expense_added() -> Self {
        Self::success("Expense added. The group balances have been updated.")
    }

    #[must_use]
    pub fn kind(&self) -> NoticeKind {
        self.kind
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}
