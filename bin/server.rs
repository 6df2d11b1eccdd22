// Shared Ledger - Reference Server
// Records expenses, recomputes totals, and pushes every change to all
// connected clients over WebSocket.

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::Serialize;
use shared_ledger::{Budget, BudgetSummary, Expense, PushMessage, ServerConfig};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Frames buffered per slow client before it starts skipping
const BROADCAST_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "ledger-server")]
#[command(about = "Reference push server for the shared expense ledger", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, env = "LEDGER_BIND", default_value = shared_ledger::config::DEFAULT_BIND)]
    bind: String,

    /// Budget name
    #[arg(long, default_value = shared_ledger::config::DEFAULT_BUDGET_NAME)]
    name: String,

    /// Amount available for the period
    #[arg(long, default_value_t = shared_ledger::config::DEFAULT_BUDGET_AMOUNT)]
    amount: f64,

    /// Warn when expenses exceed this fraction of the amount
    #[arg(long, default_value_t = shared_ledger::config::DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            bind: args.bind,
            budget_name: args.name,
            budget_amount: args.amount,
            threshold: args.threshold,
        }
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    budget: Arc<Mutex<Budget>>,
    broadcast: broadcast::Sender<String>,
}

impl AppState {
    fn new(budget: Budget) -> Self {
        let (broadcast, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            budget: Arc::new(Mutex::new(budget)),
            broadcast,
        }
    }

    fn budget(&self) -> MutexGuard<'_, Budget> {
        // A panicked handler can't leave the Vec half-written; keep serving
        self.budget.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/budget - Current budget and every recorded expense
async fn get_budget(State(state): State<AppState>) -> Json<ApiResponse<BudgetSummary>> {
    Json(ApiResponse::ok(state.budget().summary()))
}

/// POST /addExpense - Record one expense and broadcast the update
async fn add_expense(
    State(state): State<AppState>,
    payload: Result<Json<Expense>, JsonRejection>,
) -> Response {
    let Json(expense) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!(error = %rejection, "bad expense body");
            return (StatusCode::BAD_REQUEST, "Bad request").into_response();
        }
    };

    // Clients drop pushes with an empty User/Category; refuse them up front
    if expense.submitter.trim().is_empty() || expense.category.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Bad request").into_response();
    }

    {
        // Broadcast under the lock so push order matches record order
        let mut budget = state.budget();
        for message in budget.record(expense) {
            publish(&state, &message);
        }
    }

    Json(serde_json::json!({ "status": "success" })).into_response()
}

fn publish(state: &AppState, message: &PushMessage) {
    match message.encode() {
        Ok(frame) => {
            // Err only means nobody is connected
            let receivers = state.broadcast.send(frame).unwrap_or(0);
            debug!(receivers, "push message broadcast");
        }
        Err(e) => warn!(error = %e, "failed to encode push message"),
    }
}

/// GET /ws - Upgrade to the push channel
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, state))
}

async fn client_session(mut socket: WebSocket, state: AppState) {
    let mut updates = state.broadcast.subscribe();
    info!("client connected");

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(frame) => {
                    if let Err(e) = socket.send(Message::Text(frame)).await {
                        warn!(error = %e, "push failed, dropping client");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "client fell behind, messages skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                // The push channel is one-way; anything the client says is ignored
                Some(Ok(_)) => {}
            },
        }
    }

    info!("client disconnected");
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/budget", get(get_budget))
        .with_state(state.clone());

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/addExpense", post(add_expense))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from(args);
    config.validate()?;

    println!("🌐 Shared Ledger - Push Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✓ Budget: {} (${:.2}, warn above {:.0}%)",
        config.budget_name,
        config.budget_amount,
        config.threshold * 100.0
    );

    let state = AppState::new(Budget::from_config(&config));
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;

    println!("\n🚀 Server running on http://{}", config.bind);
    println!("   Push:   ws://{}/ws", config.bind);
    println!("   Submit: POST http://{}/addExpense", config.bind);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(state)).await?;

    Ok(())
}
