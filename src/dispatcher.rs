// 🔀 Event Dispatcher - routes push messages to the store or the notifier
//
//   raw frame ──decode──► Expense       → store.apply_expense_update → renderer
//                         Notification  → notifier (store untouched)
//                         Unrecognized  → dropped (protocol error)
//               ✗ decode               → dropped (protocol error)
//
// A dropped message never stops the stream: the next frame is handled as if
// nothing happened. The only state held here besides the store borrow is the
// chart flag and a few counters.

use crate::error::ProtocolError;
use crate::protocol::{decode, InboundMessage};
use crate::render::{ChartDirective, ChartState, NotificationSink, RenderSink};
use crate::store::{LedgerStore, Snapshot};
use tracing::{debug, warn};

/// Entry point a transport calls once per inbound frame, in arrival order.
pub trait MessageHandler {
    fn on_message(&mut self, raw: &str);
}

// ============================================================================
// DISPATCH OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Expense applied; renderer was handed `snapshot` with `directive`
    Applied {
        snapshot: Snapshot,
        directive: ChartDirective,
    },
    /// Notification forwarded
    Notified,
    /// Protocol error - message discarded
    Dropped(ProtocolError),
}

impl DispatchOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, DispatchOutcome::Dropped(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub applied: u64,
    pub notified: u64,
    pub malformed: u64,
    pub unknown_type: u64,
    pub invalid_field: u64,
}

impl DispatchStats {
    pub fn dropped(&self) -> u64 {
        self.malformed + self.unknown_type + self.invalid_field
    }

    pub fn total(&self) -> u64 {
        self.applied + self.notified + self.dropped()
    }

    fn record_drop(&mut self, error: &ProtocolError) {
        match error {
            ProtocolError::Malformed(_) => self.malformed += 1,
            ProtocolError::UnknownType(_) => self.unknown_type += 1,
            ProtocolError::InvalidField { .. } => self.invalid_field += 1,
        }
    }
}

// ============================================================================
// DISPATCHER
// ============================================================================

pub struct EventDispatcher<'s, R, N> {
    store: &'s mut LedgerStore,
    renderer: R,
    notifier: N,
    chart: ChartState,
    stats: DispatchStats,
}

impl<'s, R: RenderSink, N: NotificationSink> EventDispatcher<'s, R, N> {
    pub fn new(store: &'s mut LedgerStore, renderer: R, notifier: N) -> Self {
        EventDispatcher {
            store,
            renderer,
            notifier,
            chart: ChartState::default(),
            stats: DispatchStats::default(),
        }
    }

    /// Decode and handle one raw frame.
    pub fn handle_raw(&mut self, raw: &str) -> DispatchOutcome {
        match decode(raw) {
            Ok(message) => self.dispatch(message),
            Err(error) => self.drop_message(error),
        }
    }

    /// Handle one already-decoded message.
    pub fn dispatch(&mut self, message: InboundMessage) -> DispatchOutcome {
        match message {
            InboundMessage::Expense(update) => {
                let snapshot = self.store.apply_expense_update(
                    update.expense,
                    update.total_expenses,
                    update.category_totals,
                );
                let directive = self.chart.advance();
                self.renderer.render(&snapshot, directive);
                self.stats.applied += 1;

                debug!(?directive, entries = snapshot.len(), "expense applied");
                DispatchOutcome::Applied {
                    snapshot,
                    directive,
                }
            }
            InboundMessage::Notification(notification) => {
                self.notifier.notify(&notification.message);
                self.stats.notified += 1;
                DispatchOutcome::Notified
            }
            InboundMessage::Unrecognized(kind) => {
                self.drop_message(ProtocolError::UnknownType(kind))
            }
        }
    }

    fn drop_message(&mut self, error: ProtocolError) -> DispatchOutcome {
        warn!(kind = error.kind(), error = %error, "dropping push message");
        self.stats.record_drop(&error);
        DispatchOutcome::Dropped(error)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn chart_state(&self) -> ChartState {
        self.chart
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Tear down: release the store borrow and hand back the collaborators.
    pub fn finish(self) -> (R, N, DispatchStats) {
        (self.renderer, self.notifier, self.stats)
    }
}

impl<'s, R: RenderSink, N: NotificationSink> MessageHandler for EventDispatcher<'s, R, N> {
    fn on_message(&mut self, raw: &str) {
        self.handle_raw(raw);
    }
}
