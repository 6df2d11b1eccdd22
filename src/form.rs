// 📝 Expense form - local input before it becomes a submission
//
// Keeps raw text exactly as typed. On submit the fields are validated into an
// `Expense`; the form is cleared only when the server accepts it, so a
// rejected submission can be corrected and retried.
//
// The form never touches the ledger store: an accepted expense shows up
// locally only when the server echoes it on the push channel.

use crate::error::{FormError, SubmissionError};
use crate::expense::Expense;

pub const REJECTION_ALERT: &str = "Failed to add expense";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    User,
    Description,
    Amount,
    Category,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::User,
        FormField::Description,
        FormField::Amount,
        FormField::Category,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::User => "user",
            FormField::Description => "description",
            FormField::Amount => "amount",
            FormField::Category => "category",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FormField::User => FormField::Description,
            FormField::Description => FormField::Amount,
            FormField::Amount => FormField::Category,
            FormField::Category => FormField::User,
        }
    }
}

/// What the user should see after a submission settles
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Accepted,
    Rejected { alert: String, error: SubmissionError },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseForm {
    pub user: String,
    pub description: String,
    pub amount: String,
    pub category: String,
}

impl ExpenseForm {
    pub fn new() -> Self {
        ExpenseForm::default()
    }

    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::User => &self.user,
            FormField::Description => &self.description,
            FormField::Amount => &self.amount,
            FormField::Category => &self.category,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::User => &mut self.user,
            FormField::Description => &mut self.description,
            FormField::Amount => &mut self.amount,
            FormField::Category => &mut self.category,
        }
    }

    pub fn is_empty(&self) -> bool {
        FormField::ALL.iter().all(|f| self.field(*f).is_empty())
    }

    /// Validate the raw fields into the submission payload.
    ///
    /// User and category are required; description may be blank; amount must
    /// parse as a finite number (sign is left to the server).
    pub fn to_submission(&self) -> Result<Expense, FormError> {
        let user = self.user.trim();
        if user.is_empty() {
            return Err(FormError::MissingField("user"));
        }

        let category = self.category.trim();
        if category.is_empty() {
            return Err(FormError::MissingField("category"));
        }

        let raw_amount = self.amount.trim();
        if raw_amount.is_empty() {
            return Err(FormError::MissingField("amount"));
        }
        let amount: f64 = raw_amount
            .parse()
            .map_err(|_| FormError::InvalidAmount(raw_amount.to_string()))?;
        if !amount.is_finite() {
            return Err(FormError::InvalidAmount(raw_amount.to_string()));
        }

        Ok(Expense::new(user, self.description.trim(), amount, category))
    }

    /// Apply the server's verdict: clear on acceptance, keep on rejection.
    pub fn settle(&mut self, result: Result<(), SubmissionError>) -> SubmissionOutcome {
        match result {
            Ok(()) => {
                *self = ExpenseForm::default();
                SubmissionOutcome::Accepted
            }
            Err(error) => SubmissionOutcome::Rejected {
                alert: REJECTION_ALERT.to_string(),
                error,
            },
        }
    }
}
