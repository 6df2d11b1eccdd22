use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use shared_ledger::{
    format_amount, CategoryTotals, ChartDirective, ClientConfig, EventDispatcher, ExpenseForm,
    FormField, LedgerStore, NotificationSink, PushChannel, RenderSink, SessionEnd, Snapshot,
    SubmissionClient, SubmissionError, SubmissionOutcome,
};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

const TICK: Duration = Duration::from_millis(100);
const MAX_NOTIFICATIONS: usize = 50;

/// Everything that reaches the UI thread from the network side
#[derive(Debug)]
pub enum UiEvent {
    Render(Snapshot, ChartDirective),
    Notify(String),
    Submitted(Result<(), SubmissionError>),
    Disconnected(String),
}

// ============================================================================
// CHANNEL SINKS - dispatcher side of the UI
// ============================================================================

#[derive(Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<UiEvent>,
}

impl RenderSink for ChannelSink {
    fn render(&mut self, snapshot: &Snapshot, directive: ChartDirective) {
        // UI gone means we are shutting down
        let _ = self.tx.send(UiEvent::Render(snapshot.clone(), directive));
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&mut self, message: &str) {
        let _ = self.tx.send(UiEvent::Notify(message.to_string()));
    }
}

// ============================================================================
// CATEGORY CHART
// ============================================================================

/// Bar chart model: built once, then relabelled in place.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryChart {
    pub labels: Vec<String>,
    /// Cents, since bars are integer-valued
    pub values: Vec<u64>,
    pub updates: usize,
}

impl CategoryChart {
    pub fn construct(totals: &CategoryTotals) -> Self {
        let mut chart = CategoryChart {
            labels: Vec::new(),
            values: Vec::new(),
            updates: 0,
        };
        chart.fill(totals);
        chart
    }

    pub fn update(&mut self, totals: &CategoryTotals) {
        self.fill(totals);
        self.updates += 1;
    }

    fn fill(&mut self, totals: &CategoryTotals) {
        self.labels.clear();
        self.values.clear();
        for (name, total) in totals {
            self.labels.push(name.clone());
            self.values.push(to_cents(*total));
        }
    }
}

fn to_cents(amount: f64) -> u64 {
    if amount.is_finite() && amount > 0.0 {
        (amount * 100.0).round() as u64
    } else {
        0
    }
}

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    pub snapshot: Snapshot,
    pub chart: Option<CategoryChart>,
    pub notifications: Vec<(DateTime<Local>, String)>,
    pub form: ExpenseForm,
    pub focus: FormField,
    pub state: TableState,
    pub status: Option<String>,
    pub connected: bool,
    pub submitting: bool,
}

impl App {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::default(),
            chart: None,
            notifications: Vec::new(),
            form: ExpenseForm::new(),
            focus: FormField::User,
            state: TableState::default(),
            status: None,
            connected: true,
            submitting: false,
        }
    }

    pub fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Render(snapshot, directive) => {
                match (directive, self.chart.as_mut()) {
                    (ChartDirective::Update, Some(chart)) => chart.update(snapshot.category_totals()),
                    _ => self.chart = Some(CategoryChart::construct(snapshot.category_totals())),
                }

                // Follow the newest row
                if !snapshot.is_empty() {
                    self.state.select(Some(snapshot.len() - 1));
                }
                self.snapshot = snapshot;
            }
            UiEvent::Notify(message) => {
                self.notifications.push((Local::now(), message));
                if self.notifications.len() > MAX_NOTIFICATIONS {
                    self.notifications.remove(0);
                }
            }
            UiEvent::Submitted(result) => {
                self.submitting = false;
                self.status = match self.form.settle(result) {
                    SubmissionOutcome::Accepted => Some("✓ Expense added".to_string()),
                    SubmissionOutcome::Rejected { alert, error } => Some(format!("{}: {}", alert, error)),
                };
            }
            UiEvent::Disconnected(reason) => {
                self.connected = false;
                self.status = Some(format!("Disconnected: {}", reason));
            }
        }
    }

    pub fn next_field(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn type_char(&mut self, c: char) {
        self.form.field_mut(self.focus).push(c);
    }

    pub fn backspace(&mut self) {
        self.form.field_mut(self.focus).pop();
    }

    pub fn next(&mut self) {
        let len = self.snapshot.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.snapshot.is_empty() {
            return;
        }
        let i = self.state.selected().map(|i| i.saturating_sub(1)).unwrap_or(0);
        self.state.select(Some(i));
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// RUN
// ============================================================================

pub async fn run_dashboard(config: &ClientConfig) -> Result<()> {
    let push_url = config.push_url()?;
    let submitter = SubmissionClient::from_config(config)?;

    let (channel, registration) = PushChannel::connect(&push_url)
        .await
        .with_context(|| format!("connecting to {}", push_url))?;

    let (tx, rx) = unbounded_channel();
    let session = tokio::spawn(run_session(channel, tx.clone()));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let mut app = App::new();
    let res = run_app(&mut terminal, &mut app, rx, tx, submitter);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    registration.cancel();
    let _ = session.await;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

/// Network side: store + dispatcher live here for the whole session.
async fn run_session(channel: PushChannel, tx: UnboundedSender<UiEvent>) {
    let mut store = LedgerStore::new();
    let sink = ChannelSink { tx: tx.clone() };
    let mut dispatcher = EventDispatcher::new(&mut store, sink.clone(), sink);

    let reason = match channel.run(&mut dispatcher).await {
        Ok(SessionEnd::Deregistered) => return,
        Ok(SessionEnd::ClosedByServer) => "server closed the connection".to_string(),
        Err(e) => e.to_string(),
    };
    let _ = tx.send(UiEvent::Disconnected(reason));
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut rx: UnboundedReceiver<UiEvent>,
    tx: UnboundedSender<UiEvent>,
    submitter: SubmissionClient,
) -> io::Result<()> {
    loop {
        while let Ok(event) = rx.try_recv() {
            app.handle_event(event);
        }

        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Esc => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                KeyCode::Tab => app.next_field(),
                KeyCode::Backspace => app.backspace(),
                KeyCode::Down => app.next(),
                KeyCode::Up => app.previous(),
                KeyCode::Enter if !app.submitting => match app.form.to_submission() {
                    Ok(expense) => {
                        app.submitting = true;
                        app.status = Some("Submitting...".to_string());
                        let client = submitter.clone();
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            let result = client.submit(&expense).await;
                            let _ = tx.send(UiEvent::Submitted(result));
                        });
                    }
                    Err(e) => app.status = Some(e.to_string()),
                },
                KeyCode::Char(c) => app.type_char(c),
                _ => {}
            }
        }
    }
}

// ============================================================================
// DRAWING
// ============================================================================

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with totals
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Form
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(60), // Expense list
            Constraint::Percentage(40), // Chart + notifications
        ])
        .split(chunks[1]);

    render_table(f, content_chunks[0], app);

    let side_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(content_chunks[1]);

    render_chart(f, side_chunks[0], app);
    render_notifications(f, side_chunks[1], app);
    render_form(f, chunks[2], app);
    render_status_bar(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let connection = if app.connected {
        Span::styled("● live", Style::default().fg(Color::Green))
    } else {
        Span::styled("● offline", Style::default().fg(Color::Red))
    };

    let spans = vec![
        Span::styled(
            "Shared Ledger",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Total: ${}", format_amount(app.snapshot.running_total())),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("{} expenses", app.snapshot.len()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  |  "),
        connection,
    ];

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["User", "Description", "Amount", "Category"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.snapshot.entries().iter().map(|expense| {
        Row::new(vec![
            Cell::from(truncate(&expense.submitter, 16)),
            Cell::from(truncate(&expense.description, 30)),
            Cell::from(format!("${}", format_amount(expense.amount))).style(Style::default().fg(Color::Red)),
            Cell::from(truncate(&expense.category, 18)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(18),
            Constraint::Length(32),
            Constraint::Length(12),
            Constraint::Length(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Expenses "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_chart(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" By Category ");

    let Some(chart) = &app.chart else {
        let empty = Paragraph::new("  Waiting for the first expense...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    };

    let palette = [Color::Cyan, Color::LightRed, Color::Magenta, Color::Blue, Color::Green];
    let bars: Vec<Bar> = chart
        .labels
        .iter()
        .zip(&chart.values)
        .enumerate()
        .map(|(i, (label, cents))| {
            Bar::default()
                .value(*cents)
                .label(Line::from(truncate(label, 10)))
                .text_value(format_amount(*cents as f64 / 100.0))
                .style(Style::default().fg(palette[i % palette.len()]))
        })
        .collect();

    let bar_chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(10)
        .bar_gap(1);

    f.render_widget(bar_chart, area);
}

fn render_notifications(f: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = app
        .notifications
        .iter()
        .rev()
        .take(visible)
        .map(|(at, message)| {
            Line::from(vec![
                Span::styled(at.format("%H:%M:%S ").to_string(), Style::default().fg(Color::DarkGray)),
                Span::styled(message.clone(), Style::default().fg(Color::Yellow)),
            ])
        })
        .collect();

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Notifications "),
    );

    f.render_widget(panel, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![];
    for (i, field) in FormField::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }

        let style = if *field == app.focus {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        spans.push(Span::styled(format!("{}: ", field.label()), style));
        spans.push(Span::raw(app.form.field(*field).to_string()));
    }

    let form = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" New Expense "),
    );

    f.render_widget(form, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let Some(status) = &app.status {
        status_spans.push(Span::styled(format!(" {} ", status), Style::default().fg(Color::Cyan)));
        status_spans.push(Span::raw(" | "));
    }

    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Field | "));
    status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Submit | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("Esc", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
