//! In-memory ledger for engine tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tally_client::{LedgerApi, LedgerError};
use tally_types::{
    Expense, ExpenseId, Group, GroupId, GroupRef, NewExpense, NonEmptyString,
    SettlementTransaction, Share, User, UserId, UserRef,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Search,
    ListGroups,
    CreateGroup,
    RenameGroup,
    AddMember,
    DeleteGroup,
    CreateExpense,
    ListExpenses,
    Settlements,
    Settle,
}

pub(crate) fn user(id: &str, name: &str) -> User {
    User {
        id: UserId::from(id),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_ascii_lowercase()),
    }
}

pub(crate) fn group(id: &str, name: &str, members: &[&User]) -> Group {
    Group {
        id: GroupId::from(id),
        name: name.to_string(),
        members: members.iter().map(|m| (*m).clone()).collect(),
        total_balance: 0.0,
    }
}

pub(crate) fn transaction(from: &User, to: &User, amount: f64) -> SettlementTransaction {
    SettlementTransaction {
        from_id: from.id.clone(),
        from: from.name.clone(),
        to_id: to.id.clone(),
        to: to.name.clone(),
        amount,
    }
}

fn ledger_error(status: u16, message: Option<String>) -> LedgerError {
    match status {
        409 => LedgerError::Conflict { message },
        404 => LedgerError::NotFound { message },
        401 | 403 => LedgerError::Unauthorized { message },
        status => LedgerError::Server { status, message },
    }
}

#[derive(Default)]
struct FakeState {
    me: Option<User>,
    directory: Vec<User>,
    groups: Vec<Group>,
    expenses: Vec<Expense>,
    submitted: Vec<NewExpense>,
    settlements: HashMap<GroupId, Vec<SettlementTransaction>>,
    calls: Vec<(Op, String)>,
    failures: HashMap<Op, (u16, Option<String>)>,
    delays: HashMap<(Op, String), Duration>,
    next_id: u64,
}

#[derive(Default)]
pub(crate) struct FakeLedger {
    state: Mutex<FakeState>,
}

impl FakeLedger {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The caller; added to every group it creates.
    pub(crate) fn sign_in(&self, me: &User) {
        let mut state = self.lock();
        state.me = Some(me.clone());
        state.directory.push(me.clone());
    }

    pub(crate) fn add_directory_user(&self, user: User) {
        self.lock().directory.push(user);
    }

    pub(crate) fn add_group(&self, group: Group) {
        let mut state = self.lock();
        for member in &group.members {
            if !state.directory.iter().any(|u| u.id == member.id) {
                state.directory.push(member.clone());
            }
        }
        state.groups.push(group);
    }

    pub(crate) fn set_settlements(&self, group: &str, txs: Vec<SettlementTransaction>) {
        self.lock().settlements.insert(GroupId::from(group), txs);
    }

    /// Make the next call of `op` fail with `status`.
    pub(crate) fn fail_next(&self, op: Op, status: u16, message: Option<&str>) {
        self.lock()
            .failures
            .insert(op, (status, message.map(str::to_string)));
    }

    /// Delay calls of `op` whose subject (query, group id) equals `subject`.
    pub(crate) fn delay(&self, op: Op, subject: &str, delay: Duration) {
        self.lock().delays.insert((op, subject.to_string()), delay);
    }

    pub(crate) fn delay_search(&self, query: &str, delay: Duration) {
        self.delay(Op::Search, query, delay);
    }

    pub(crate) fn calls(&self, op: Op) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, subject)| subject.clone())
            .collect()
    }

    pub(crate) fn call_count(&self, op: Op) -> usize {
        self.calls(op).len()
    }

    pub(crate) fn search_calls(&self) -> Vec<String> {
        self.calls(Op::Search)
    }

    pub(crate) fn submitted(&self) -> Vec<NewExpense> {
        self.lock().submitted.clone()
    }

    pub(crate) fn groups(&self) -> Vec<Group> {
        self.lock().groups.clone()
    }

    /// Record the call, then apply any configured delay and failure.
    async fn enter(&self, op: Op, subject: &str) -> Result<(), LedgerError> {
        let (delay, failure) = {
            let mut state = self.lock();
            state.calls.push((op, subject.to_string()));
            let delay = state.delays.get(&(op, subject.to_string())).copied();
            (delay, state.failures.remove(&op))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some((status, message)) => Err(ledger_error(status, message)),
            None => Ok(()),
        }
    }

    fn next_id(state: &mut FakeState, prefix: &str) -> String {
        state.next_id += 1;
        format!("{prefix}{}", state.next_id)
    }
}

#[async_trait]
impl LedgerApi for FakeLedger {
    async fn search_users(&self, email_prefix: &str) -> Result<Vec<User>, LedgerError> {
        self.enter(Op::Search, email_prefix).await?;
        let needle = email_prefix.to_ascii_lowercase();
        Ok(self
            .lock()
            .directory
            .iter()
            .filter(|u| u.email.to_ascii_lowercase().starts_with(&needle))
            .cloned()
            .collect())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, LedgerError> {
        self.enter(Op::ListGroups, "").await?;
        Ok(self.lock().groups.clone())
    }

    async fn create_group(
        &self,
        name: &NonEmptyString,
        members: &[UserId],
    ) -> Result<Group, LedgerError> {
        let subject = members
            .iter()
            .map(UserId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        self.enter(Op::CreateGroup, &subject).await?;

        let mut state = self.lock();
        let mut resolved: Vec<User> = state.me.iter().cloned().collect();
        for id in members {
            let user = state
                .directory
                .iter()
                .find(|u| &u.id == id)
                .cloned()
                .ok_or_else(|| ledger_error(404, Some("User not found".into())))?;
            resolved.push(user);
        }
        let id = Self::next_id(&mut state, "g");
        let group = Group {
            id: GroupId::new(id),
            name: name.to_string(),
            members: resolved,
            total_balance: 0.0,
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn rename_group(&self, group: &GroupId, name: &str) -> Result<Group, LedgerError> {
        self.enter(Op::RenameGroup, group.as_str()).await?;
        let mut state = self.lock();
        let found = state
            .groups
            .iter_mut()
            .find(|g| &g.id == group)
            .ok_or_else(|| ledger_error(404, Some("Group not found".into())))?;
        found.name = name.to_string();
        Ok(found.clone())
    }

    async fn add_member(&self, group: &GroupId, user: &UserId) -> Result<Group, LedgerError> {
        self.enter(Op::AddMember, user.as_str()).await?;
        let mut state = self.lock();
        let member = state
            .directory
            .iter()
            .find(|u| &u.id == user)
            .cloned()
            .ok_or_else(|| ledger_error(404, Some("User not found".into())))?;
        let found = state
            .groups
            .iter_mut()
            .find(|g| &g.id == group)
            .ok_or_else(|| ledger_error(404, Some("Group not found".into())))?;
        if found.has_member(user) {
            return Err(ledger_error(409, Some("User already in group".into())));
        }
        found.members.push(member);
        Ok(found.clone())
    }

    async fn delete_group(&self, group: &GroupId) -> Result<(), LedgerError> {
        self.enter(Op::DeleteGroup, group.as_str()).await?;
        let mut state = self.lock();
        let before = state.groups.len();
        state.groups.retain(|g| &g.id != group);
        if state.groups.len() == before {
            return Err(ledger_error(404, Some("Group not found".into())));
        }
        state.expenses.retain(|e| e.group.id() != group);
        Ok(())
    }

    async fn create_expense(&self, expense: &NewExpense) -> Result<Expense, LedgerError> {
        self.enter(Op::CreateExpense, expense.group.as_str()).await?;
        let mut state = self.lock();
        state.submitted.push(expense.clone());
        let id = Self::next_id(&mut state, "e");
        let created = Expense {
            id: ExpenseId::new(id),
            group: GroupRef::Id(expense.group.clone()),
            description: expense.description.clone(),
            amount: expense.amount,
            paid_by: UserRef::Id(expense.paid_by.clone()),
            split_between: expense
                .split_between
                .iter()
                .map(|s| Share {
                    user: UserRef::Id(s.user.clone()),
                    share: s.share,
                })
                .collect(),
            date: None,
        };
        state.expenses.insert(0, created.clone());
        Ok(created)
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>, LedgerError> {
        self.enter(Op::ListExpenses, "").await?;
        Ok(self.lock().expenses.clone())
    }

    async fn settlements(
        &self,
        group: &GroupId,
    ) -> Result<Vec<SettlementTransaction>, LedgerError> {
        self.enter(Op::Settlements, group.as_str()).await?;
        Ok(self
            .lock()
            .settlements
            .get(group)
            .cloned()
            .unwrap_or_default())
    }

    async fn settle(
        &self,
        group: &GroupId,
        tx: &SettlementTransaction,
    ) -> Result<(), LedgerError> {
        let subject = format!("{}:{}->{}", group, tx.from_id, tx.to_id);
        self.enter(Op::Settle, &subject).await?;
        if let Some(txs) = self.lock().settlements.get_mut(group) {
            txs.retain(|t| !(t.from_id == tx.from_id && t.to_id == tx.to_id));
        }
        Ok(())
    }
}
