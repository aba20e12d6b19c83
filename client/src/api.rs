use async_trait::async_trait;
use tally_types::{
    Expense, Group, GroupId, NewExpense, NonEmptyString, SettlementTransaction, User, UserId,
};

use crate::error::LedgerError;

/// The remote ledger/directory service, as the engine depends on it.
///
/// [`crate::LedgerClient`] is the HTTP implementation; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// `GET /auth/users?email={prefix}`
    async fn search_users(&self, email_prefix: &str) -> Result<Vec<User>, LedgerError>;

    /// `GET /groups`
    async fn list_groups(&self) -> Result<Vec<Group>, LedgerError>;

    /// `POST /groups`. `members` excludes the creator; the ledger adds them.
    async fn create_group(
        &self,
        name: &NonEmptyString,
        members: &[UserId],
    ) -> Result<Group, LedgerError>;

    /// `PATCH /groups/{id}`
    async fn rename_group(&self, group: &GroupId, name: &str) -> Result<Group, LedgerError>;

    /// `PATCH /groups/{id}/members`
    async fn add_member(&self, group: &GroupId, user: &UserId) -> Result<Group, LedgerError>;

    /// `DELETE /groups/{id}`. The ledger cascades to the group's expenses.
    async fn delete_group(&self, group: &GroupId) -> Result<(), LedgerError>;

    /// `POST /expenses`
    async fn create_expense(&self, expense: &NewExpense) -> Result<Expense, LedgerError>;

    /// `GET /expenses`
    async fn list_expenses(&self) -> Result<Vec<Expense>, LedgerError>;

    /// `GET /settlements/{groupId}`
    async fn settlements(&self, group: &GroupId)
    -> Result<Vec<SettlementTransaction>, LedgerError>;

    /// `POST /settlements/settle`
    async fn settle(&self, group: &GroupId, tx: &SettlementTransaction)
    -> Result<(), LedgerError>;
}
