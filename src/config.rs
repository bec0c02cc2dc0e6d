//! Runtime configuration read from the environment

use crate::session::{SessionOptions, DEFAULT_JOIN_TIMEOUT};
use crate::transport::tcp::{DEFAULT_BASE_PORT, DEFAULT_PORT_SPAN};
use crate::types::Difficulty;
use crate::words::BuiltinCatalog;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Where the local presentation bridge listens
    pub ui_addr: SocketAddr,
    /// Host the peer transport binds and connects on
    pub peer_host: IpAddr,
    pub peer_base_port: u16,
    pub peer_port_span: u16,
    pub join_timeout: Duration,
    /// Fixed seed for reproducible rooms
    pub seed: Option<u64>,
    pub word_difficulty: Option<Difficulty>,
    pub static_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ui_addr: SocketAddr::from(([127, 0, 0, 1], 6574)),
            peer_host: IpAddr::from([127, 0, 0, 1]),
            peer_base_port: DEFAULT_BASE_PORT,
            peer_port_span: DEFAULT_PORT_SPAN,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            seed: None,
            word_difficulty: None,
            static_dir: "static".to_string(),
        }
    }
}

/// Trimmed value of an env var, `None` when unset or blank
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Parsed env var, warning and falling back when the value is malformed
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_var(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            ui_addr: env_parse("UNDERCOVER_UI_ADDR").unwrap_or(defaults.ui_addr),
            peer_host: env_parse("UNDERCOVER_PEER_HOST").unwrap_or(defaults.peer_host),
            peer_base_port: env_parse("UNDERCOVER_PEER_BASE_PORT")
                .unwrap_or(defaults.peer_base_port),
            peer_port_span: env_parse::<u16>("UNDERCOVER_PEER_PORT_SPAN")
                .filter(|span| *span > 0)
                .unwrap_or(defaults.peer_port_span),
            join_timeout: env_parse("UNDERCOVER_JOIN_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.join_timeout),
            seed: env_parse("UNDERCOVER_SEED"),
            word_difficulty: env_parse("UNDERCOVER_WORD_DIFFICULTY"),
            static_dir: env_var("UNDERCOVER_STATIC_DIR").unwrap_or(defaults.static_dir),
        };

        if config.seed.is_some() {
            tracing::warn!("UNDERCOVER_SEED is set, rooms hosted here are reproducible");
        }
        config
    }

    /// Options for every session opened through this process
    pub fn session_options(&self) -> SessionOptions {
        let catalog = BuiltinCatalog::with_difficulty(self.word_difficulty);
        tracing::debug!(
            pairs = catalog.len(),
            difficulty = ?self.word_difficulty,
            "Word catalog loaded"
        );
        SessionOptions {
            join_timeout: self.join_timeout,
            seed: self.seed,
            catalog: Arc::new(catalog),
        }
    }
}
