//! Core domain types for Tally.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application: the HTTP client
//! serialises these types, the engine drives its state machines with them.

mod error;
mod ids;
mod model;
mod notice;
mod proofs;
mod selection;
mod settlement;
mod split;
mod summary;

pub use error::ValidationError;
pub use ids::{ExpenseId, GroupId, UserId};
pub use model::{
    Expense, Group, GroupRef, GroupSummary, NewExpense, NewShare, SettlementTransaction, Share,
    User, UserRef,
};
pub use notice::{EXPENSE_FALLBACK, Notice, NoticeKind, SETTLE_FALLBACK};
pub use proofs::{Amount, AmountError, EmptyStringError, NonEmptyString};
pub use selection::ParticipantSelection;
pub use settlement::{BoardStatus, Busy, ConfirmState, ConfirmTicket, RowStatus, TransactionKey};
pub use split::{SplitPlan, format_money};
pub use summary::{
    DashboardSummary, ExpenseCategory, SETTLEMENT_DESCRIPTION, search_by_description,
    split_caption,
};
