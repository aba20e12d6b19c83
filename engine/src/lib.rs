//! Client-side engine for Tally: directory search, group roster, expense
//! form and the settlement board.
//!
//! Nothing here renders anything. Front ends drive these state machines and
//! read their state back; all remote work goes through [`LedgerApi`].

use std::sync::Arc;

use tally_client::{LedgerApi, LedgerError};
use tally_types::{Expense, UserId};

mod config;
mod directory;
mod expense;
mod notices;
mod roster;
mod settlements;

#[cfg(test)]
mod test_support;

pub use config::{
    BASE_URL_ENV, ConfigError, DEFAULT_CURRENCY, LedgerSection, SessionSection, TOKEN_ENV,
    TallyConfig, UiSection, config_path, expand_env_vars,
};
pub use directory::{DirectorySearch, SearchResults, SearchSettings};
pub use expense::{ExpenseError, ExpenseForm};
pub use notices::{NoticeBoard, NoticeTimings};
pub use roster::{DeletionConfirmed, MemberPicker, Roster, RosterError};
pub use settlements::{BoardRow, BoardSnapshot, ConfirmOutcome, SettlementBoard};

/// The ledger as the engine holds it.
pub type SharedLedger = Arc<dyn LedgerApi>;

/// One signed-in session: the components of every screen share its ledger
/// handle and its notice line.
pub struct Tally {
    ledger: SharedLedger,
    current_user: UserId,
    notices: NoticeBoard,
    search: SearchSettings,
    timings: NoticeTimings,
    currency: String,
}

impl Tally {
    #[must_use]
    pub fn new(ledger: SharedLedger, current_user: UserId) -> Self {
        Self {
            ledger,
            current_user,
            notices: NoticeBoard::new(),
            search: SearchSettings::default(),
            timings: NoticeTimings::default(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Apply the `[ui]` settings from `config`.
    #[must_use]
    pub fn configured(mut self, config: &TallyConfig) -> Self {
        self.search = config.search_settings();
        self.timings = config.notice_timings();
        self.currency = config.currency().to_string();
        self
    }

    #[must_use]
    pub fn current_user(&self) -> &UserId {
        &self.current_user
    }

    #[must_use]
    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    #[must_use]
    pub fn roster(&self) -> Roster {
        Roster::new(Arc::clone(&self.ledger), self.current_user.clone())
    }

    #[must_use]
    pub fn directory(&self) -> DirectorySearch {
        DirectorySearch::new(Arc::clone(&self.ledger), self.search)
    }

    #[must_use]
    pub fn expense_form(&self) -> ExpenseForm {
        ExpenseForm::new(
            Arc::clone(&self.ledger),
            self.notices.clone(),
            self.timings.expense_added,
            self.current_user.clone(),
        )
    }

    #[must_use]
    pub fn settlement_board(&self) -> SettlementBoard {
        SettlementBoard::new(
            Arc::clone(&self.ledger),
            self.notices.clone(),
            self.currency.clone(),
            self.timings,
        )
    }

    /// Every expense visible to the caller, newest first as the ledger sends them.
    pub async fn expenses(&self) -> Result<Vec<Expense>, LedgerError> {
        self.ledger.list_expenses().await
    }
}
