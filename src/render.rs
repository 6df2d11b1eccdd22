// 🎨 Render collaborators - where snapshots and notifications leave the core
//
// The dispatcher only knows these two traits. What "painting" means is up to
// the implementor: console lines, a ratatui dashboard, or a recorder in tests.

use crate::expense::format_amount;
use crate::store::Snapshot;
use std::io::Write;

// ============================================================================
// CHART STATE MACHINE
// ============================================================================

/// What the renderer must do with its category chart for this snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartDirective {
    /// No chart exists yet - build one from `category_totals`
    Construct,
    /// Chart exists - swap labels and values in place
    Update,
}

/// One-way: `Uninitialized` → `Initialized`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartState {
    #[default]
    Uninitialized,
    Initialized,
}

impl ChartState {
    /// Directive for the next snapshot; moves the state forward.
    pub fn advance(&mut self) -> ChartDirective {
        match self {
            ChartState::Uninitialized => {
                *self = ChartState::Initialized;
                ChartDirective::Construct
            }
            ChartState::Initialized => ChartDirective::Update,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self, ChartState::Initialized)
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

pub trait RenderSink {
    /// Called once per applied expense message, in arrival order
    fn render(&mut self, snapshot: &Snapshot, directive: ChartDirective);
}

pub trait NotificationSink {
    fn notify(&mut self, message: &str);
}

impl<T: RenderSink + ?Sized> RenderSink for &mut T {
    fn render(&mut self, snapshot: &Snapshot, directive: ChartDirective) {
        (**self).render(snapshot, directive)
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for &mut T {
    fn notify(&mut self, message: &str) {
        (**self).notify(message)
    }
}

// ============================================================================
// CONSOLE RENDERER
// ============================================================================

/// Line-oriented renderer: prints only the new rows of each snapshot, the
/// total, and the category chart (full on construct, changed values on update).
pub struct ConsoleRenderer<W: Write> {
    out: W,
    rows_painted: usize,
    /// Labels + values as currently "drawn"
    chart: Vec<(String, f64)>,
}

impl ConsoleRenderer<std::io::Stdout> {
    pub fn stdout() -> Self {
        ConsoleRenderer::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        ConsoleRenderer {
            out,
            rows_painted: 0,
            chart: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&mut self, snapshot: &Snapshot, directive: ChartDirective) -> std::io::Result<()> {
        for expense in snapshot.entries_since(self.rows_painted) {
            writeln!(self.out, "➕ {}", expense.display_line())?;
        }
        self.rows_painted = snapshot.len();

        writeln!(
            self.out,
            "💰 Total expenses: ${}",
            format_amount(snapshot.running_total())
        )?;

        let slices: Vec<(String, f64)> = snapshot
            .category_totals()
            .iter()
            .map(|(name, total)| (name.clone(), *total))
            .collect();

        match directive {
            ChartDirective::Construct => {
                writeln!(self.out, "📊 Expenses by category")?;
                for (name, total) in &slices {
                    writeln!(self.out, "   {:<20} ${:>10}", name, format_amount(*total))?;
                }
            }
            ChartDirective::Update => {
                // Only print slices whose label or value moved
                for (name, total) in &slices {
                    let unchanged = self
                        .chart
                        .iter()
                        .any(|(old_name, old_total)| old_name == name && old_total == total);
                    if !unchanged {
                        writeln!(self.out, "   {:<20} ${:>10}", name, format_amount(*total))?;
                    }
                }
                // Totals are replaced wholesale; labels can disappear
                for (old_name, _) in &self.chart {
                    if !slices.iter().any(|(name, _)| name == old_name) {
                        writeln!(self.out, "   {:<20} (removed)", old_name)?;
                    }
                }
            }
        }
        self.chart = slices;

        self.out.flush()
    }
}

impl<W: Write> RenderSink for ConsoleRenderer<W> {
    fn render(&mut self, snapshot: &Snapshot, directive: ChartDirective) {
        if let Err(e) = self.paint(snapshot, directive) {
            tracing::warn!(error = %e, "console render failed");
        }
    }
}

/// Prints each notification on its own line, nothing retained.
pub struct ConsoleNotifier<W: Write> {
    out: W,
}

impl ConsoleNotifier<std::io::Stdout> {
    pub fn stdout() -> Self {
        ConsoleNotifier::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleNotifier<W> {
    pub fn new(out: W) -> Self {
        ConsoleNotifier { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> NotificationSink for ConsoleNotifier<W> {
    fn notify(&mut self, message: &str) {
        if let Err(e) = writeln!(self.out, "🔔 {}", message).and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "console notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::{CategoryTotals, Expense};
    use crate::store::LedgerStore;

    fn totals(pairs: &[(&str, f64)]) -> CategoryTotals {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_chart_state_is_one_way() {
        let mut state = ChartState::default();
        assert!(!state.is_initialized());

        assert_eq!(state.advance(), ChartDirective::Construct);
        assert!(state.is_initialized());

        for _ in 0..5 {
            assert_eq!(state.advance(), ChartDirective::Update);
        }
        assert_eq!(state, ChartState::Initialized);
    }

    #[test]
    fn test_console_renderer_paints_delta_only() {
        let mut store = LedgerStore::new();
        let mut renderer = ConsoleRenderer::new(Vec::new());

        let first = store.apply_expense_update(
            Expense::new("Ana", "Coffee", 3.5, "Food"),
            3.5,
            totals(&[("Food", 3.5)]),
        );
        renderer.render(&first, ChartDirective::Construct);

        let second = store.apply_expense_update(
            Expense::new("Ben", "Bus", 12.5, "Transport"),
            16.0,
            totals(&[("Food", 3.5), ("Transport", 12.5)]),
        );
        renderer.render(&second, ChartDirective::Update);

        let output = String::from_utf8(renderer.into_inner()).unwrap();

        assert_eq!(output.matches("Ana: Coffee - $3.50 (Food)").count(), 1);
        assert!(output.contains("Ben: Bus - $12.50 (Transport)"));
        assert!(output.contains("Total expenses: $16.00"));
        assert_eq!(output.matches("Expenses by category").count(), 1);

        // Food slice unchanged on update - drawn only once
        let food_slice = format!("   {:<20} ${:>10}", "Food", "3.50");
        assert_eq!(output.matches(food_slice.as_str()).count(), 1);
    }

    #[test]
    fn test_console_renderer_reports_removed_slices() {
        let mut store = LedgerStore::new();
        let mut renderer = ConsoleRenderer::new(Vec::new());

        let first = store.apply_expense_update(
            Expense::new("Ana", "Rent", 10.0, "A"),
            10.0,
            totals(&[("A", 10.0)]),
        );
        renderer.render(&first, ChartDirective::Construct);

        let second = store.apply_expense_update(
            Expense::new("Ben", "Bus", 5.0, "B"),
            15.0,
            totals(&[("B", 5.0)]),
        );
        renderer.render(&second, ChartDirective::Update);

        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(output.contains(&format!("   {:<20} ${:>10}", "B", "5.00")));
        assert!(output.contains(&format!("   {:<20} (removed)", "A")));
        assert!(!output.contains(&format!("   {:<20} (removed)", "B")));
    }

    #[test]
    fn test_console_notifier() {
        let mut notifier = ConsoleNotifier::new(Vec::new());
        notifier.notify("Budget threshold of 80% exceeded!");
        notifier.notify("Budget threshold of 80% exceeded!");

        let output = String::from_utf8(notifier.into_inner()).unwrap();
        // No dedup
        assert_eq!(output.matches("🔔 Budget threshold of 80% exceeded!").count(), 2);
    }
}
