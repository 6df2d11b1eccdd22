// 💸 Expense - the single immutable record the ledger is made of
//
// Wire shape (both inbound `Data` and outbound submission body):
//   { "User": "Ana", "Description": "Coffee", "Amount": 3.5, "Category": "Food" }

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category name → total, exactly as last sent by the server.
///
/// Ordered by name so renderers get stable slice order (the server encodes
/// its map with sorted keys too).
pub type CategoryTotals = BTreeMap<String, f64>;

// ============================================================================
// EXPENSE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Who recorded the expense (non-empty)
    #[serde(rename = "User")]
    pub submitter: String,

    #[serde(rename = "Description")]
    pub description: String,

    /// Expected >= 0, not enforced here - the server is trusted
    #[serde(rename = "Amount")]
    pub amount: f64,

    /// Category label (non-empty)
    #[serde(rename = "Category")]
    pub category: String,
}

impl Expense {
    pub fn new(
        submitter: impl Into<String>,
        description: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
    ) -> Self {
        Expense {
            submitter: submitter.into(),
            description: description.into(),
            amount,
            category: category.into(),
        }
    }

    /// List line used by every renderer:
    /// `Ana: Coffee - $3.50 (Food)`
    pub fn display_line(&self) -> String {
        format!(
            "{}: {} - ${} ({})",
            self.submitter,
            self.description,
            format_amount(self.amount),
            self.category
        )
    }
}

/// Two-decimal money formatting (`12.5` → `"12.50"`)
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Sum of `amount` over a slice, per category. Used server-side only - the
/// client never derives totals itself.
pub fn category_totals(expenses: &[Expense]) -> CategoryTotals {
    let mut totals = CategoryTotals::new();
    for expense in expenses {
        *totals.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
    }
    totals
}

pub fn total_amount(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let expense = Expense::new("Ana", "Coffee", 3.5, "Food");
        let json = serde_json::to_value(&expense).unwrap();

        assert_eq!(json["User"], "Ana");
        assert_eq!(json["Description"], "Coffee");
        assert_eq!(json["Amount"], 3.5);
        assert_eq!(json["Category"], "Food");
    }

    #[test]
    fn test_format_amount_two_decimals() {
        assert_eq!(format_amount(12.5), "12.50");
        assert_eq!(format_amount(3.0), "3.00");
        assert_eq!(format_amount(7.456), "7.46");
    }

    #[test]
    fn test_display_line() {
        let expense = Expense::new("Ana", "Coffee", 3.5, "Food");
        assert_eq!(expense.display_line(), "Ana: Coffee - $3.50 (Food)");
    }

    #[test]
    fn test_category_totals_and_sum() {
        let expenses = vec![
            Expense::new("Ana", "Coffee", 3.5, "Food"),
            Expense::new("Ben", "Bus", 2.0, "Transport"),
            Expense::new("Ana", "Lunch", 10.0, "Food"),
        ];

        let totals = category_totals(&expenses);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals["Food"], 13.5);
        assert_eq!(totals["Transport"], 2.0);
        assert_eq!(total_amount(&expenses), 15.5);

        // Sorted by name
        let names: Vec<&String> = totals.keys().collect();
        assert_eq!(names, vec!["Food", "Transport"]);
    }
}
