// Public API for integration tests and potential library usage

pub mod app;
pub mod config;
pub mod protocol;
pub mod rng;
pub mod session;
pub mod state;
pub mod transport;
pub mod types;
pub mod words;
pub mod ws;
