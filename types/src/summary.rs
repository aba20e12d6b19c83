//! Read-only projections over the expense history: dashboard totals,
//! description search and category tagging.

use crate::model::Expense;
use crate::split::format_money;

/// Description the ledger writes on expenses it records for confirmed
/// settlements. These are bookkeeping, not spending.
pub const SETTLEMENT_DESCRIPTION: &str = "Settlement Payment";

const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary<'a> {
    pub total_spent: f64,
    pub expense_count: usize,
    pub active_groups: usize,
    pub largest: Option<&'a Expense>,
    pub recent: &'a [Expense],
}

impl<'a> DashboardSummary<'a> {
    #[must_use]
    pub fn new(expenses: &'a [Expense], active_groups: usize) -> Self {
        let spending: Vec<&Expense> = expenses
            .iter()
            .filter(|e| e.description != SETTLEMENT_DESCRIPTION)
            .collect();

        let total_spent = spending.iter().map(|e| e.amount).sum();
        // First of equal maxima wins, matching a stable descending sort.
        let largest = spending.iter().copied().fold(None, |best: Option<&Expense>, e| match best {
            Some(b) if b.amount >= e.amount => Some(b),
            _ => Some(e),
        });

        Self {
            total_spent,
            expense_count: spending.len(),
            active_groups,
            largest,
            recent: &expenses[..expenses.len().min(RECENT_LIMIT)],
        }
    }

    /// Average per real expense, two decimals; `"0"` when there are none.
    #[must_use]
    pub fn average_display(&self) -> String {
        if self.expense_count == 0 {
            return "0".to_string();
        }
        format_money(self.total_spent / self.expense_count as f64)
    }
}

/// Case-insensitive substring search on the description.
pub fn search_by_description<'a>(
    expenses: &'a [Expense],
    query: &str,
) -> impl Iterator<Item = &'a Expense> {
    let needle = query.to_lowercase();
    expenses
        .iter()
        .filter(move |e| e.description.to_lowercase().contains(&needle))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseCategory {
    Settlement,
    Food,
    Coffee,
    Home,
    Transport,
    Shopping,
    Other,
}

const CATEGORY_KEYWORDS: &[(ExpenseCategory, &[&str])] = &[
    (ExpenseCategory::Settlement, &["settlement"]),
    (ExpenseCategory::Food, &["food", "dinner", "lunch"]),
    (ExpenseCategory::Coffee, &["coffee", "starbucks"]),
    (ExpenseCategory::Home, &["rent", "utility"]),
    (ExpenseCategory::Transport, &["uber", "taxi", "car"]),
    (ExpenseCategory::Shopping, &["grocery", "shop"]),
];

impl ExpenseCategory {
    /// First matching keyword group wins, in table order.
    #[must_use]
    pub fn classify(description: &str) -> Self {
        let lower = description.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(category, _)| *category)
            .unwrap_or(ExpenseCategory::Other)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ExpenseCategory::Settlement => "settlement",
            ExpenseCategory::Food => "food",
            ExpenseCategory::Coffee => "coffee",
            ExpenseCategory::Home => "home",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Shopping => "shopping",
            ExpenseCategory::Other => "other",
        }
    }
}

/// One-line caption for a history row.
#[must_use]
pub fn split_caption(expense: &Expense) -> String {
    if expense.description.contains("Settlement") {
        "Debt Settlement".to_string()
    } else {
        format!("Split with {} members", expense.split_between.len())
    }
}
