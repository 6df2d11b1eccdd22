// 🏦 Budget - the server's side of the shared ledger
//
// The server is the only place totals are computed. Each recorded expense
// yields the push messages every connected client must receive:
//
//   1. always:  Expense { Data, TotalExpenses = Σ amount, CategoryTotals = Σ per category }
//   2. if TotalExpenses > threshold × amount:  Notification "Budget threshold of 80% exceeded!"

use crate::config::ServerConfig;
use crate::expense::{category_totals, total_amount, Expense};
use crate::protocol::{ExpenseUpdate, PushMessage};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Budget {
    pub name: String,
    /// Amount available for the period
    pub total_amount: f64,
    pub threshold: f64,
    expenses: Vec<Expense>,
}

/// Read-only summary served at `/api/budget`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub name: String,
    pub total_amount: f64,
    pub total_expenses: f64,
    pub expenses: Vec<Expense>,
}

impl Budget {
    pub fn new(name: impl Into<String>, total_amount: f64, threshold: f64) -> Self {
        Budget {
            name: name.into(),
            total_amount,
            threshold,
            expenses: Vec::new(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Budget::new(config.budget_name.clone(), config.budget_amount, config.threshold)
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn total_expenses(&self) -> f64 {
        total_amount(&self.expenses)
    }

    pub fn is_over_threshold(&self) -> bool {
        self.total_expenses() > self.threshold * self.total_amount
    }

    pub fn threshold_message(&self) -> String {
        format!("Budget threshold of {:.0}% exceeded!", self.threshold * 100.0)
    }

    /// Record an expense and return the messages to broadcast, in order.
    pub fn record(&mut self, expense: Expense) -> Vec<PushMessage> {
        self.expenses.push(expense.clone());

        let mut messages = vec![PushMessage::Expense(ExpenseUpdate {
            expense,
            total_expenses: self.total_expenses(),
            category_totals: category_totals(&self.expenses),
        })];

        if self.is_over_threshold() {
            messages.push(PushMessage::notification(self.threshold_message()));
        }

        messages
    }

    pub fn summary(&self) -> BudgetSummary {
        BudgetSummary {
            name: self.name.clone(),
            total_amount: self.total_amount,
            total_expenses: self.total_expenses(),
            expenses: self.expenses.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_emits_expense_with_recomputed_totals() {
        let mut budget = Budget::from_config(&ServerConfig::default());

        budget.record(Expense::new("Ana", "Coffee", 3.5, "Food"));
        let messages = budget.record(Expense::new("Ben", "Bus", 2.0, "Transport"));

        assert_eq!(messages.len(), 1);
        match &messages[0] {
            PushMessage::Expense(update) => {
                assert_eq!(update.expense.submitter, "Ben");
                assert_eq!(update.total_expenses, 5.5);
                assert_eq!(update.category_totals["Food"], 3.5);
                assert_eq!(update.category_totals["Transport"], 2.0);
            }
            other => panic!("expected expense message, got {:?}", other),
        }
    }

    #[test]
    fn test_threshold_notification() {
        let mut budget = Budget::new("Test", 100.0, 0.8);

        assert_eq!(budget.record(Expense::new("Ana", "Rent", 80.0, "Home")).len(), 1);

        // 80.0 is not > 80.0; 80.01 is
        let messages = budget.record(Expense::new("Ana", "Gum", 0.01, "Food"));
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[1],
            PushMessage::notification("Budget threshold of 80% exceeded!")
        );

        // Keeps warning on every later expense
        assert_eq!(budget.record(Expense::new("Ben", "Tea", 1.0, "Food")).len(), 2);
    }

    #[test]
    fn test_summary() {
        let mut budget = Budget::from_config(&ServerConfig::default());
        budget.record(Expense::new("Ana", "Coffee", 3.5, "Food"));

        let summary = budget.summary();
        assert_eq!(summary.name, "Monthly Shared Budget");
        assert_eq!(summary.total_amount, 1000.0);
        assert_eq!(summary.total_expenses, 3.5);
        assert_eq!(summary.expenses.len(), 1);
    }
}
