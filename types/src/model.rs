//! Ledger documents as the client sees them.
//!
//! Field names follow the ledger's JSON (`_id`, camelCase). References that
//! the ledger may or may not populate are modelled as [`UserRef`] / [`GroupRef`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ExpenseId, GroupId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub members: Vec<User>,
    /// Aggregate owned by the ledger; never computed client-side.
    #[serde(default)]
    pub total_balance: f64,
}

impl Group {
    #[must_use]
    pub fn has_member(&self, user: &UserId) -> bool {
        self.members.iter().any(|m| &m.id == user)
    }

    /// Member ids in ledger order, excluding `user`.
    pub fn member_ids_except<'a>(&'a self, user: &'a UserId) -> impl Iterator<Item = &'a UserId> {
        self.members
            .iter()
            .map(|m| &m.id)
            .filter(move |id| *id != user)
    }

    #[must_use]
    pub fn member_count_label(&self) -> String {
        match self.members.len() {
            1 => "1 member".to_string(),
            n => format!("{n} members"),
        }
    }
}

/// A user reference that is either a bare id or a populated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(UserId),
    Populated(User),
}

impl UserRef {
    #[must_use]
    pub fn id(&self) -> &UserId {
        match self {
            UserRef::Id(id) => id,
            UserRef::Populated(user) => &user.id,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            UserRef::Id(_) => None,
            UserRef::Populated(user) => Some(&user.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    #[serde(rename = "_id")]
    pub id: GroupId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupRef {
    Id(GroupId),
    Populated(GroupSummary),
}

impl GroupRef {
    #[must_use]
    pub fn id(&self) -> &GroupId {
        match self {
            GroupRef::Id(id) => id,
            GroupRef::Populated(group) => &group.id,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            GroupRef::Id(_) => None,
            GroupRef::Populated(group) => Some(&group.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub user: UserRef,
    pub share: f64,
}

/// A persisted expense. Immutable once the ledger has accepted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: ExpenseId,
    pub group: GroupRef,
    pub description: String,
    pub amount: f64,
    pub paid_by: UserRef,
    #[serde(default)]
    pub split_between: Vec<Share>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewShare {
    pub user: UserId,
    pub share: f64,
}

/// Expense draft as submitted to `POST /expenses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub group: GroupId,
    pub description: String,
    pub amount: f64,
    pub paid_by: UserId,
    pub split_between: Vec<NewShare>,
}

impl NewExpense {
    #[must_use]
    pub fn share_total(&self) -> f64 {
        self.split_between.iter().map(|s| s.share).sum()
    }
}

/// One simplified debt edge of a group's settlement projection.
///
/// Computed by the ledger on every fetch and never stored client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementTransaction {
    pub from_id: UserId,
    pub from: String,
    pub to_id: UserId,
    pub to: String,
    pub amount: f64,
}
