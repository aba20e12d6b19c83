use thiserror::Error;

use crate::proofs::AmountError;

/// Local validation failures. These block a submission before any network
/// call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("group name must not be empty")]
    EmptyGroupName,
    #[error("select a group first")]
    NoGroupSelected,
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
    #[error("description must not be empty")]
    EmptyDescription,
    #[error("select at least one participant")]
    NoParticipants,
    #[error("deletion was confirmed for a different group")]
    ConfirmationMismatch,
}
