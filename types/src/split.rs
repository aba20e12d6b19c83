//! Equal-split computation for a single expense.
//!
//! Every participant owes `amount / participant_count`. Shares are plain
//! floating-point quotients; no remainder cent is redistributed, so the sum of
//! shares can differ from the amount by sub-cent drift when the division is
//! inexact.

use crate::error::ValidationError;
use crate::ids::{GroupId, UserId};
use crate::model::{NewExpense, NewShare};
use crate::proofs::{Amount, NonEmptyString};

/// A validated equal split, ready to be turned into a ledger draft.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPlan {
    amount: Amount,
    payer: UserId,
    participants: Vec<UserId>,
}

impl SplitPlan {
    /// Build a plan over `participants`, which must already include the payer
    /// and be deduplicated (see `ParticipantSelection::participants_with`).
    pub fn equal(
        amount: Amount,
        payer: UserId,
        participants: Vec<UserId>,
    ) -> Result<Self, ValidationError> {
        if participants.is_empty() {
            return Err(ValidationError::NoParticipants);
        }
        Ok(Self {
            amount,
            payer,
            participants,
        })
    }

    #[must_use]
    pub fn amount(&self) -> Amount {
        self.amount
    }

    #[must_use]
    pub fn payer(&self) -> &UserId {
        &self.payer
    }

    #[must_use]
    pub fn participants(&self) -> &[UserId] {
        &self.participants
    }

    #[must_use]
    pub fn share(&self) -> f64 {
        self.amount.value() / self.participants.len() as f64
    }

    /// Per-person preview as shown next to the amount field.
    #[must_use]
    pub fn share_preview(&self) -> String {
        format_money(self.share())
    }

    #[must_use]
    pub fn shares(&self) -> Vec<NewShare> {
        let share = self.share();
        self.participants
            .iter()
            .map(|user| NewShare {
                user: user.clone(),
                share,
            })
            .collect()
    }

    #[must_use]
    pub fn into_expense(self, group: GroupId, description: NonEmptyString) -> NewExpense {
        let split_between = self.shares();
        NewExpense {
            group,
            description: description.into_inner(),
            amount: self.amount.value(),
            paid_by: self.payer,
            split_between,
        }
    }
}

/// Two-decimal rendering used for previews and averages.
#[must_use]
pub fn format_money(value: f64) -> String {
    format!("{value:.2}")
}
