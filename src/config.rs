// ⚙️ Configuration for the client and the reference server
//
// Client: one base URL, from which both endpoints are derived
//   http://host:8080  →  ws://host:8080/ws   (push channel)
//                     →  http://host:8080/addExpense   (submission)

use crate::error::ConfigError;
use url::Url;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_PUSH_PATH: &str = "/ws";
pub const DEFAULT_SUBMIT_PATH: &str = "/addExpense";

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_BUDGET_NAME: &str = "Monthly Shared Budget";
pub const DEFAULT_BUDGET_AMOUNT: f64 = 1000.0;
pub const DEFAULT_THRESHOLD: f64 = 0.8;

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server: Url,
    pub push_path: String,
    pub submit_path: String,
}

impl ClientConfig {
    pub fn new(server: &str) -> Result<Self, ConfigError> {
        let server = Url::parse(server).map_err(|e| ConfigError::InvalidUrl {
            url: server.to_string(),
            reason: e.to_string(),
        })?;

        match server.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        Ok(ClientConfig {
            server,
            push_path: DEFAULT_PUSH_PATH.to_string(),
            submit_path: DEFAULT_SUBMIT_PATH.to_string(),
        })
    }

    /// Push channel endpoint (`ws://` or `wss://`)
    pub fn push_url(&self) -> Result<Url, ConfigError> {
        let mut url = self.join(&self.push_path)?;
        let scheme = if self.server.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ConfigError::UnsupportedScheme(scheme.to_string()))?;
        Ok(url)
    }

    /// One-shot submission endpoint
    pub fn submit_url(&self) -> Result<Url, ConfigError> {
        self.join(&self.submit_path)
    }

    fn join(&self, path: &str) -> Result<Url, ConfigError> {
        self.server.join(path).map_err(|e| ConfigError::InvalidUrl {
            url: format!("{}{}", self.server, path),
            reason: e.to_string(),
        })
    }
}

// ============================================================================
// SERVER
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: String,
    pub budget_name: String,
    pub budget_amount: f64,
    /// Fraction of `budget_amount` above which a warning is broadcast
    pub threshold: f64,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budget_amount.is_nan() || self.budget_amount <= 0.0 {
            return Err(ConfigError::NonPositiveBudget(self.budget_amount));
        }
        if self.threshold.is_nan() || self.threshold <= 0.0 || self.threshold > 1.0 {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: DEFAULT_BIND.to_string(),
            budget_name: DEFAULT_BUDGET_NAME.to_string(),
            budget_amount: DEFAULT_BUDGET_AMOUNT,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}
