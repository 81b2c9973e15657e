//! vodhub: multi-source media title search server.
//!
//! Wraps the [`vodhub_search`] engine in an HTTP service:
//! query → concurrent fan-out to every enabled source → merge → content
//! policy → ranking → JSON batch or server-sent event stream.
//!
//! # Architecture
//!
//! - **Config**: one TOML file ([`config::VodhubConfig`]) holding the
//!   listener, search settings, sources, policy terms and fold table
//! - **Server**: an axum router ([`server::router`]) sharing a single
//!   [`vodhub_search::Aggregator`] across requests
//! - **Errors**: [`error::ServerError`] maps engine failures onto HTTP
//!   status codes

pub mod config;
pub mod error;
pub mod server;

pub use config::VodhubConfig;
pub use error::{Result, ServerError};
pub use server::VodhubServer;
