// 📒 Ledger State Store - the local copy of the shared ledger
//
// Holds three things, all owned here and nowhere else:
//   entries          append-only, arrival order
//   running_total    replaced wholesale by each server update
//   category_totals  replaced wholesale by each server update
//
// The store never sums anything itself: totals are authoritative from the
// server. One update = one atomic (append, replace, replace) triple.
//
// Lifecycle: create (`LedgerStore::new`) → run (lent to the dispatcher) →
// dispose (`LedgerStore::dispose`).

use crate::expense::{CategoryTotals, Expense};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// LEDGER STATE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerState {
    pub entries: Vec<Expense>,
    pub running_total: f64,
    pub category_totals: CategoryTotals,
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Immutable view of `LedgerState` at one point in time.
///
/// Cloning is a reference-count bump, so handing snapshots to renderers is
/// O(1) regardless of ledger size. Later updates never change a snapshot
/// already handed out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    state: Arc<LedgerState>,
}

impl Snapshot {
    pub fn entries(&self) -> &[Expense] {
        &self.state.entries
    }

    pub fn running_total(&self) -> f64 {
        self.state.running_total
    }

    pub fn category_totals(&self) -> &CategoryTotals {
        &self.state.category_totals
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }

    /// Most recently appended expense
    pub fn latest(&self) -> Option<&Expense> {
        self.state.entries.last()
    }

    /// Entries appended after the first `seen` ones - the delta a list
    /// renderer needs when it already painted `seen` rows.
    pub fn entries_since(&self, seen: usize) -> &[Expense] {
        let start = seen.min(self.state.entries.len());
        &self.state.entries[start..]
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }
}

// ============================================================================
// LEDGER STORE
// ============================================================================

#[derive(Debug, Default)]
pub struct LedgerStore {
    current: Snapshot,
}

impl LedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        LedgerStore::default()
    }

    /// Append `expense` and replace both aggregates in one step.
    ///
    /// `new_category_totals` replaces the previous mapping entirely: a
    /// category it omits is gone afterwards.
    pub fn apply_expense_update(
        &mut self,
        expense: Expense,
        new_total: f64,
        new_category_totals: CategoryTotals,
    ) -> Snapshot {
        // Copy-on-write: only clones if a renderer still holds the old snapshot
        let state = Arc::make_mut(&mut self.current.state);
        state.entries.push(expense);
        state.running_total = new_total;
        state.category_totals = new_category_totals;

        debug!(
            entries = state.entries.len(),
            running_total = state.running_total,
            categories = state.category_totals.len(),
            "ledger updated"
        );

        self.current.clone()
    }

    /// Current read-only view; O(1)
    pub fn snapshot(&self) -> Snapshot {
        self.current.clone()
    }

    /// End of lifecycle: hand back the final state
    pub fn dispose(self) -> LedgerState {
        Arc::try_unwrap(self.current.state).unwrap_or_else(|shared| (*shared).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(pairs: &[(&str, f64)]) -> CategoryTotals {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = LedgerStore::new();
        let snapshot = store.snapshot();

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.running_total(), 0.0);
        assert!(snapshot.category_totals().is_empty());
        assert!(snapshot.latest().is_none());
    }

    #[test]
    fn test_apply_appends_and_replaces() {
        let mut store = LedgerStore::new();

        let snapshot = store.apply_expense_update(
            Expense::new("Ana", "Coffee", 3.5, "Food"),
            3.5,
            totals(&[("Food", 3.5)]),
        );

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.running_total(), 3.5);
        assert_eq!(snapshot.category_totals(), &totals(&[("Food", 3.5)]));
        assert_eq!(snapshot.latest().unwrap().submitter, "Ana");
    }

    #[test]
    fn test_category_totals_replaced_wholesale() {
        let mut store = LedgerStore::new();

        store.apply_expense_update(Expense::new("Ana", "a", 10.0, "A"), 10.0, totals(&[("A", 10.0)]));
        let snapshot =
            store.apply_expense_update(Expense::new("Ben", "b", 5.0, "B"), 15.0, totals(&[("B", 5.0)]));

        assert_eq!(snapshot.category_totals(), &totals(&[("B", 5.0)]));
        assert!(!snapshot.category_totals().contains_key("A"));
    }

    #[test]
    fn test_running_total_not_derived_locally() {
        let mut store = LedgerStore::new();

        // Server says 100 even though the entry is 1 - server wins
        let snapshot =
            store.apply_expense_update(Expense::new("Ana", "x", 1.0, "Misc"), 100.0, totals(&[("Misc", 100.0)]));

        assert_eq!(snapshot.running_total(), 100.0);
    }

    #[test]
    fn test_old_snapshots_are_immutable() {
        let mut store = LedgerStore::new();

        let first =
            store.apply_expense_update(Expense::new("Ana", "a", 1.0, "A"), 1.0, totals(&[("A", 1.0)]));
        let second =
            store.apply_expense_update(Expense::new("Ben", "b", 2.0, "B"), 3.0, totals(&[("A", 1.0), ("B", 2.0)]));

        assert_eq!(first.len(), 1);
        assert_eq!(first.running_total(), 1.0);
        assert_eq!(second.len(), 2);
        assert_eq!(second.entries_since(1)[0].submitter, "Ben");
        assert!(second.entries_since(5).is_empty());
    }

    #[test]
    fn test_dispose_returns_final_state() {
        let mut store = LedgerStore::new();
        let held = store.apply_expense_update(Expense::new("Ana", "a", 1.0, "A"), 1.0, totals(&[("A", 1.0)]));

        let state = store.dispose();
        assert_eq!(state.entries.len(), 1);
        assert_eq!(&state, held.state());
    }
}
