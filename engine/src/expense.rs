//! The add-expense form: group choice, participant selection and submission.
//!
//! The acting user always pays and always participates. `split_with` only
//! ever holds the *other* members of the selected group.

use std::time::Duration;

use thiserror::Error;

use tally_client::LedgerError;
use tally_types::{
    Amount, EXPENSE_FALLBACK, Expense, Group, GroupId, NewExpense, NonEmptyString, Notice,
    ParticipantSelection, SplitPlan, UserId, ValidationError,
};

use crate::SharedLedger;
use crate::notices::NoticeBoard;

#[derive(Debug, Error)]
pub enum ExpenseError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ExpenseError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(e) => e.to_string(),
            Self::Ledger(e) => e.user_message(EXPENSE_FALLBACK),
        }
    }
}

pub struct ExpenseForm {
    ledger: SharedLedger,
    notices: NoticeBoard,
    added_ttl: Duration,
    current_user: UserId,
    groups: Vec<Group>,
    group: Option<GroupId>,
    amount: String,
    description: String,
    split_with: ParticipantSelection,
}

impl ExpenseForm {
    #[must_use]
    pub fn new(
        ledger: SharedLedger,
        notices: NoticeBoard,
        added_ttl: Duration,
        current_user: UserId,
    ) -> Self {
        Self {
            ledger,
            notices,
            added_ttl,
            current_user,
            groups: Vec::new(),
            group: None,
            amount: String::new(),
            description: String::new(),
            split_with: ParticipantSelection::new(),
        }
    }

    /// Replace the known groups and select the first one.
    pub fn load_groups(&mut self, groups: Vec<Group>) {
        self.groups = groups;
        self.select_first_group();
    }

    /// Fetch the caller's groups from the ledger and select the first one.
    pub async fn refresh_groups(&mut self) -> Result<(), LedgerError> {
        let groups = self.ledger.list_groups().await?;
        self.load_groups(groups);
        Ok(())
    }

    /// Select `id`. The selection is reset to every other member of the new
    /// group, discarding whatever was picked before. Unknown ids are ignored.
    pub fn switch_group(&mut self, id: &GroupId) -> bool {
        let Some(group) = self.groups.iter().find(|g| &g.id == id) else {
            return false;
        };
        self.split_with = ParticipantSelection::everyone_but(group, &self.current_user);
        self.group = Some(group.id.clone());
        true
    }

    /// Flip one member in or out of the split. Non-members and the acting
    /// user are ignored.
    pub fn toggle_member(&mut self, id: &UserId) {
        if *id == self.current_user {
            return;
        }
        if self.selected_group().is_some_and(|g| g.has_member(id)) {
            self.split_with.toggle(id.clone());
        }
    }

    pub fn select_all(&mut self) {
        let everyone = self
            .selected_group()
            .map(|group| ParticipantSelection::everyone_but(group, &self.current_user));
        if let Some(everyone) = everyone {
            self.split_with = everyone;
        }
    }

    pub fn set_amount(&mut self, amount: impl Into<String>) {
        self.amount = amount.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    #[must_use]
    pub fn selected_group(&self) -> Option<&Group> {
        let id = self.group.as_ref()?;
        self.groups.iter().find(|g| &g.id == id)
    }

    #[must_use]
    pub fn split_with(&self) -> &ParticipantSelection {
        &self.split_with
    }

    #[must_use]
    pub fn amount(&self) -> &str {
        &self.amount
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The acting user first, then the selection.
    #[must_use]
    pub fn participants(&self) -> Vec<UserId> {
        self.split_with.participants_with(&self.current_user)
    }

    /// Per-person share as it will be submitted, e.g. `"33.33"`.
    #[must_use]
    pub fn preview_share(&self) -> Option<String> {
        let amount: Amount = self.amount.parse().ok()?;
        let plan = SplitPlan::equal(amount, self.current_user.clone(), self.participants()).ok()?;
        Some(plan.share_preview())
    }

    /// Validate the form and build the ledger draft.
    pub fn draft(&self) -> Result<NewExpense, ValidationError> {
        let group = self.selected_group().ok_or(ValidationError::NoGroupSelected)?;
        let amount: Amount = self.amount.parse()?;
        let description = NonEmptyString::new(self.description.trim())
            .map_err(|_| ValidationError::EmptyDescription)?;
        let plan = SplitPlan::equal(amount, self.current_user.clone(), self.participants())?;
        Ok(plan.into_expense(group.id.clone(), description))
    }

    /// Submit the draft. On success the form starts over on the first group;
    /// on failure it is left as it was.
    pub async fn submit(&mut self) -> Result<Expense, ExpenseError> {
        let draft = match self.draft() {
            Ok(draft) => draft,
            Err(e) => {
                self.notices.post(Notice::error(e.to_string()), None);
                return Err(e.into());
            }
        };

        match self.ledger.create_expense(&draft).await {
            Ok(expense) => {
                tracing::info!(
                    group = %draft.group,
                    amount = draft.amount,
                    participants = draft.split_between.len(),
                    "Expense added"
                );
                self.reset();
                self.notices.post(Notice::expense_added(), Some(self.added_ttl));
                Ok(expense)
            }
            Err(e) => {
                tracing::warn!(group = %draft.group, error = %e, "Failed to add expense");
                let message = e.user_message(EXPENSE_FALLBACK);
                self.notices.post(Notice::error(message), None);
                Err(e.into())
            }
        }
    }

    pub fn reset(&mut self) {
        self.amount.clear();
        self.description.clear();
        self.select_first_group();
    }

    fn select_first_group(&mut self) {
        match self.groups.first() {
            Some(first) => {
                self.split_with = ParticipantSelection::everyone_but(first, &self.current_user);
                self.group = Some(first.id.clone());
            }
            None => {
                self.split_with = ParticipantSelection::new();
                self.group = None;
            }
        }
    }
}
