// 📡 Push protocol - messages on the server → client channel
//
// Every frame is one JSON object discriminated by "Type":
//
//   { "Type": "Expense", "Data": {..}, "TotalExpenses": n, "CategoryTotals": {..} }
//   { "Type": "Notification", "Message": "..." }
//
// Decoding is strict about the fields each type requires and lenient about
// extra fields. A frame that decodes but names another type comes back as
// `InboundMessage::Unrecognized` so the dispatcher can report it separately
// from garbage.

use crate::error::ProtocolError;
use crate::expense::{CategoryTotals, Expense};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TYPE_FIELD: &str = "Type";
pub const EXPENSE_TYPE: &str = "Expense";
pub const NOTIFICATION_TYPE: &str = "Notification";

// ============================================================================
// PAYLOADS
// ============================================================================

/// Body of an `"Expense"` push: the new expense plus the server's
/// replacement aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    #[serde(rename = "Data")]
    pub expense: Expense,

    #[serde(rename = "TotalExpenses")]
    pub total_expenses: f64,

    #[serde(rename = "CategoryTotals")]
    pub category_totals: CategoryTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "Message")]
    pub message: String,
}

// ============================================================================
// OUTBOUND (server side)
// ============================================================================

/// What a server broadcasts. Serializes with the `"Type"` tag inline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Type")]
pub enum PushMessage {
    Expense(ExpenseUpdate),
    Notification(Notification),
}

impl PushMessage {
    pub fn notification(message: impl Into<String>) -> Self {
        PushMessage::Notification(Notification {
            message: message.into(),
        })
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// INBOUND (client side)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Expense(ExpenseUpdate),
    Notification(Notification),
    /// Well-formed frame with a `Type` this client doesn't handle
    Unrecognized(String),
}

impl InboundMessage {
    /// Discriminator as it appeared on the wire
    pub fn type_name(&self) -> &str {
        match self {
            InboundMessage::Expense(_) => EXPENSE_TYPE,
            InboundMessage::Notification(_) => NOTIFICATION_TYPE,
            InboundMessage::Unrecognized(kind) => kind,
        }
    }
}

impl From<PushMessage> for InboundMessage {
    fn from(message: PushMessage) -> Self {
        match message {
            PushMessage::Expense(update) => InboundMessage::Expense(update),
            PushMessage::Notification(notification) => InboundMessage::Notification(notification),
        }
    }
}

/// Decode one raw frame.
///
/// Errors:
/// - not JSON / not an object / no string `Type` / required field missing
///   or mistyped → `ProtocolError::Malformed`
/// - empty `User` or `Category` → `ProtocolError::InvalidField`
///
/// An unknown `Type` is NOT an error at this layer.
pub fn decode(raw: &str) -> Result<InboundMessage, ProtocolError> {
    let value: Value = serde_json::from_str(raw)?;

    let kind = match value.get(TYPE_FIELD) {
        Some(Value::String(kind)) => kind.clone(),
        Some(_) => {
            return Err(ProtocolError::Malformed(format!(
                "`{}` must be a string",
                TYPE_FIELD
            )))
        }
        None if value.is_object() => {
            return Err(ProtocolError::Malformed(format!("missing `{}`", TYPE_FIELD)))
        }
        None => return Err(ProtocolError::Malformed("expected a JSON object".to_string())),
    };

    match kind.as_str() {
        EXPENSE_TYPE => {
            let update: ExpenseUpdate = serde_json::from_value(value)?;
            validate_expense(&update.expense)?;
            Ok(InboundMessage::Expense(update))
        }
        NOTIFICATION_TYPE => {
            let notification: Notification = serde_json::from_value(value)?;
            Ok(InboundMessage::Notification(notification))
        }
        _ => Ok(InboundMessage::Unrecognized(kind)),
    }
}

fn validate_expense(expense: &Expense) -> Result<(), ProtocolError> {
    if expense.submitter.trim().is_empty() {
        return Err(ProtocolError::InvalidField {
            field: "User",
            reason: "must not be empty".to_string(),
        });
    }
    if expense.category.trim().is_empty() {
        return Err(ProtocolError::InvalidField {
            field: "Category",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPENSE_FRAME: &str = r#"{
        "Type": "Expense",
        "Data": { "User": "Ana", "Description": "Coffee", "Amount": 3.5, "Category": "Food" },
        "TotalExpenses": 3.5,
        "CategoryTotals": { "Food": 3.5 }
    }"#;

    #[test]
    fn test_decode_expense() {
        let message = decode(EXPENSE_FRAME).unwrap();

        match message {
            InboundMessage::Expense(update) => {
                assert_eq!(update.expense, Expense::new("Ana", "Coffee", 3.5, "Food"));
                assert_eq!(update.total_expenses, 3.5);
                assert_eq!(update.category_totals["Food"], 3.5);
            }
            other => panic!("expected expense, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_notification() {
        let message = decode(r#"{"Type":"Notification","Message":"Budget threshold of 80% exceeded!"}"#).unwrap();

        assert_eq!(
            message,
            InboundMessage::Notification(Notification {
                message: "Budget threshold of 80% exceeded!".to_string()
            })
        );
        assert_eq!(message.type_name(), "Notification");
    }

    #[test]
    fn test_decode_unknown_type_is_unrecognized() {
        let message = decode(r#"{"Type":"Unknown","Whatever":1}"#).unwrap();
        assert_eq!(message, InboundMessage::Unrecognized("Unknown".to_string()));
    }

    #[test]
    fn test_decode_garbage_is_malformed() {
        assert!(matches!(decode("not json"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode("[1,2,3]"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode(r#"{"Message":"hi"}"#), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode(r#"{"Type":7}"#), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_decode_missing_fields_is_malformed() {
        // No CategoryTotals
        let raw = r#"{"Type":"Expense","Data":{"User":"Ana","Description":"x","Amount":1,"Category":"A"},"TotalExpenses":1}"#;
        assert!(matches!(decode(raw), Err(ProtocolError::Malformed(_))));

        // Amount as string
        let raw = r#"{"Type":"Expense","Data":{"User":"Ana","Description":"x","Amount":"1","Category":"A"},"TotalExpenses":1,"CategoryTotals":{}}"#;
        assert!(matches!(decode(raw), Err(ProtocolError::Malformed(_))));

        // Notification without Message
        assert!(matches!(decode(r#"{"Type":"Notification"}"#), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_decode_empty_category_is_invalid() {
        let raw = r#"{"Type":"Expense","Data":{"User":"Ana","Description":"x","Amount":1,"Category":""},"TotalExpenses":1,"CategoryTotals":{}}"#;
        assert!(matches!(
            decode(raw),
            Err(ProtocolError::InvalidField { field: "Category", .. })
        ));

        let raw = r#"{"Type":"Expense","Data":{"User":" ","Description":"x","Amount":1,"Category":"A"},"TotalExpenses":1,"CategoryTotals":{}}"#;
        assert!(matches!(
            decode(raw),
            Err(ProtocolError::InvalidField { field: "User", .. })
        ));
    }

    #[test]
    fn test_push_message_encoding_decodes_back() {
        let message = PushMessage::Expense(ExpenseUpdate {
            expense: Expense::new("Ana", "Coffee", 3.5, "Food"),
            total_expenses: 3.5,
            category_totals: [("Food".to_string(), 3.5)].into_iter().collect(),
        });

        let raw = message.encode().unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["Type"], "Expense");
        assert_eq!(json["Data"]["User"], "Ana");

        assert_eq!(decode(&raw).unwrap(), InboundMessage::from(message));
    }

    #[test]
    fn test_notification_encoding() {
        let raw = PushMessage::notification("hello").encode().unwrap();
        assert_eq!(raw, r#"{"Type":"Notification","Message":"hello"}"#);
    }
}
