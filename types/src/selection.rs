//! Participant selection for the add-expense form.
//!
//! `splitWith` holds only *other* members; the acting user is always an
//! implicit participant and is never stored here.

use std::collections::BTreeSet;

use crate::ids::UserId;
use crate::model::Group;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantSelection {
    ids: BTreeSet<UserId>,
}

impl ParticipantSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every member of `group` except `current_user`.
    #[must_use]
    pub fn everyone_but(group: &Group, current_user: &UserId) -> Self {
        Self {
            ids: group.member_ids_except(current_user).cloned().collect(),
        }
    }

    /// Flip membership of one id. Applying twice restores the original set.
    pub fn toggle(&mut self, id: UserId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    #[must_use]
    pub fn contains(&self, id: &UserId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.ids.iter()
    }

    /// The deduplicated participant list: `payer` first, then the selection.
    #[must_use]
    pub fn participants_with(&self, payer: &UserId) -> Vec<UserId> {
        std::iter::once(payer)
            .chain(self.ids.iter().filter(|id| *id != payer))
            .cloned()
            .collect()
    }
}

impl FromIterator<UserId> for ParticipantSelection {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
