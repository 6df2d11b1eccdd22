// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared_ledger::{
    ClientConfig, ConsoleNotifier, ConsoleRenderer, DispatchStats, EventDispatcher, ExpenseForm,
    LedgerState, LedgerStore, PushChannel, SessionEnd, SubmissionClient, SubmissionOutcome,
    TransportError,
};
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shared-ledger")]
#[command(about = "Live view of a shared expense ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Ledger server base URL
    #[arg(short, long, global = true, env = "LEDGER_SERVER", default_value = shared_ledger::config::DEFAULT_SERVER_URL)]
    server: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the ledger and print every update (default)
    Watch,

    /// Submit one expense
    Submit {
        #[arg(short, long)]
        user: String,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(short, long)]
        amount: String,

        #[arg(short, long)]
        category: String,
    },

    /// Interactive dashboard
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dashboard = matches!(cli.command, Some(Commands::Tui));
    init_logging(cli.verbose, dashboard);

    let config = ClientConfig::new(&cli.server)?;

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => run_watch(&config).await?,
        Commands::Submit {
            user,
            description,
            amount,
            category,
        } => {
            let form = ExpenseForm {
                user,
                description,
                amount,
                category,
            };
            run_submit(&config, form).await?;
        }
        Commands::Tui => run_dashboard_mode(&config).await?,
    }

    Ok(())
}

#[cfg(feature = "tui")]
async fn run_dashboard_mode(config: &ClientConfig) -> Result<()> {
    ui::run_dashboard(config).await
}

#[cfg(not(feature = "tui"))]
async fn run_dashboard_mode(_config: &ClientConfig) -> Result<()> {
    eprintln!("❌ Dashboard not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or follow the ledger in the console: shared-ledger watch");
    std::process::exit(1);
}

fn init_logging(verbose: bool, dashboard: bool) {
    // The dashboard owns the terminal; only errors may get through
    let default_level = match (dashboard, verbose) {
        (true, _) => "error",
        (false, true) => "debug",
        (false, false) => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_watch(config: &ClientConfig) -> Result<()> {
    println!("📒 Shared Ledger v{}", shared_ledger::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let push_url = config.push_url()?;
    let (channel, registration) = PushChannel::connect(&push_url)
        .await
        .with_context(|| format!("connecting to {}", push_url))?;
    println!("✓ Connected to {}", push_url);
    println!("   Press Ctrl+C to stop\n");

    // create → run → dispose
    let mut store = LedgerStore::new();
    let mut dispatcher =
        EventDispatcher::new(&mut store, ConsoleRenderer::stdout(), ConsoleNotifier::stdout());

    // Ctrl+C deregisters the handler; the session then closes the socket
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            registration.cancel();
        }
    });

    // A dropped socket ends the session like a close does; no reconnect
    let end = channel.run(&mut dispatcher).await;
    if let Err(e) = &end {
        tracing::warn!(error = %e, "push session ended abruptly");
    }

    let (_, _, stats) = dispatcher.finish();
    let state = store.dispose();

    let mut out = std::io::stdout();
    write_session_report(&mut out, &end, &state, &stats)?;

    Ok(())
}

fn write_session_report(
    out: &mut impl Write,
    end: &Result<SessionEnd, TransportError>,
    state: &LedgerState,
    stats: &DispatchStats,
) -> std::io::Result<()> {
    match end {
        Ok(SessionEnd::ClosedByServer) => writeln!(out, "\n⚠️  Server closed the push channel")?,
        Ok(SessionEnd::Deregistered) => writeln!(out, "\n✓ Stopped")?,
        Err(e) => writeln!(out, "\n⚠️  Disconnected: {}", e)?,
    }
    writeln!(
        out,
        "   {} expenses, total ${}, {} notifications, {} dropped messages",
        state.entries.len(),
        shared_ledger::format_amount(state.running_total),
        stats.notified,
        stats.dropped()
    )
}

async fn run_submit(config: &ClientConfig, mut form: ExpenseForm) -> Result<()> {
    let expense = form.to_submission()?;
    let client = SubmissionClient::from_config(config)?;

    println!("📤 Submitting: {}", expense.display_line());

    let result = client.submit(&expense).await;
    match form.settle(result) {
        SubmissionOutcome::Accepted => {
            println!("✅ Expense added");
            Ok(())
        }
        SubmissionOutcome::Rejected { alert, error } => {
            eprintln!("❌ {}", alert);
            Err(error.into())
        }
    }
}
