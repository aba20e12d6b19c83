//! Group membership: create, grow, rename and delete groups.
//!
//! Validation happens locally before any call; the ledger is the source of
//! truth for everything else and its answer replaces the caller's copy.

use std::collections::BTreeMap;

use thiserror::Error;

use tally_client::LedgerError;
use tally_types::{Group, GroupId, NonEmptyString, User, UserId, ValidationError};

use crate::SharedLedger;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// Caught locally; the ledger was not contacted.
    #[error("{name} is already a member of this group")]
    AlreadyMember { user: UserId, name: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl RosterError {
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::AlreadyMember { .. } => true,
            Self::Ledger(e) => e.is_conflict(),
            Self::Invalid(_) => false,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Ledger(e) if e.is_not_found())
    }

    /// Text for the roster's error line.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Ledger(e) => e.user_message(fallback),
            other => other.to_string(),
        }
    }
}

/// Candidate members picked while creating a group. Set semantics keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemberPicker {
    picked: BTreeMap<UserId, User>,
}

impl MemberPicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `user`, or deselect them if already picked.
    pub fn toggle(&mut self, user: &User) {
        if self.picked.remove(&user.id).is_none() {
            self.picked.insert(user.id.clone(), user.clone());
        }
    }

    #[must_use]
    pub fn contains(&self, id: &UserId) -> bool {
        self.picked.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &UserId> {
        self.picked.keys()
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.picked.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.picked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.picked.is_empty()
    }

    pub fn clear(&mut self) {
        self.picked.clear();
    }
}

/// Proof that the user confirmed deleting one specific group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct DeletionConfirmed {
    group: GroupId,
}

impl DeletionConfirmed {
    /// Call only after the user answered yes to [`DeletionConfirmed::prompt`].
    pub fn for_group(group: &Group) -> Self {
        Self {
            group: group.id.clone(),
        }
    }

    #[must_use]
    pub fn prompt(group: &Group) -> String {
        format!(
            "Are you sure you want to delete \"{}\"? This will also delete all associated expenses.",
            group.name
        )
    }

    #[must_use]
    pub fn group(&self) -> &GroupId {
        &self.group
    }
}

pub struct Roster {
    ledger: SharedLedger,
    current_user: UserId,
}

impl Roster {
    #[must_use]
    pub fn new(ledger: SharedLedger, current_user: UserId) -> Self {
        Self {
            ledger,
            current_user,
        }
    }

    #[must_use]
    pub fn current_user(&self) -> &UserId {
        &self.current_user
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, RosterError> {
        Ok(self.ledger.list_groups().await?)
    }

    /// The creator is never sent; the ledger adds them itself.
    pub async fn create_group(
        &self,
        name: &str,
        picker: &MemberPicker,
    ) -> Result<Group, RosterError> {
        let name = NonEmptyString::new(name.trim()).map_err(|_| ValidationError::EmptyGroupName)?;
        let members: Vec<UserId> = picker
            .ids()
            .filter(|id| **id != self.current_user)
            .cloned()
            .collect();

        let group = self.ledger.create_group(&name, &members).await?;
        tracing::info!(group = %group.id, members = members.len(), "Group created");
        Ok(group)
    }

    pub async fn add_member(&self, group: &Group, user: &UserId) -> Result<Group, RosterError> {
        if let Some(existing) = group.members.iter().find(|m| &m.id == user) {
            return Err(RosterError::AlreadyMember {
                user: user.clone(),
                name: existing.name.clone(),
            });
        }

        let updated = self.ledger.add_member(&group.id, user).await?;
        tracing::info!(group = %group.id, user = %user, "Member added");
        Ok(updated)
    }

    /// Blank or unchanged names leave the group as it is.
    pub async fn rename_group(&self, group: &Group, new_name: &str) -> Result<Group, RosterError> {
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == group.name {
            return Ok(group.clone());
        }

        let renamed = self.ledger.rename_group(&group.id, new_name).await?;
        tracing::info!(group = %group.id, "Group renamed");
        Ok(renamed)
    }

    /// Irreversible; the ledger also deletes every expense of the group.
    pub async fn delete_group(
        &self,
        group: &Group,
        confirmation: DeletionConfirmed,
    ) -> Result<(), RosterError> {
        if confirmation.group != group.id {
            return Err(ValidationError::ConfirmationMismatch.into());
        }

        self.ledger.delete_group(&group.id).await?;
        tracing::info!(group = %group.id, "Group deleted");
        Ok(())
    }
}
