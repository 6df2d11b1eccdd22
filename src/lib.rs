// Shared Ledger - Core Library
// Keeps a local view of a shared expense ledger in sync with a push server.
// Exposes the reconciliation core for the CLI client, the TUI, the reference
// server, and tests.

pub mod budget;     // Server side: totals + threshold warnings
pub mod config;
pub mod dispatcher; // Push message routing
pub mod error;
pub mod expense;
pub mod form;       // Local submission form
pub mod protocol;   // Push wire format
pub mod render;     // Render / notification collaborators
pub mod store;      // Ledger State Store

#[cfg(feature = "client")]
pub mod transport;

// Re-export commonly used types
pub use budget::{Budget, BudgetSummary};
pub use config::{ClientConfig, ServerConfig};
pub use dispatcher::{DispatchOutcome, DispatchStats, EventDispatcher, MessageHandler};
pub use error::{ConfigError, FormError, ProtocolError, SubmissionError, TransportError};
pub use expense::{format_amount, CategoryTotals, Expense};
pub use form::{ExpenseForm, FormField, SubmissionOutcome};
pub use protocol::{decode, ExpenseUpdate, InboundMessage, Notification, PushMessage};
pub use render::{
    ChartDirective, ChartState, ConsoleNotifier, ConsoleRenderer, NotificationSink, RenderSink,
};
pub use store::{LedgerState, LedgerStore, Snapshot};

#[cfg(feature = "client")]
pub use transport::{HandlerRegistration, PushChannel, SessionEnd, SubmissionClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
