//! # memvitals Agent
//!
//! A small local agent that answers named diagnostic queries about process
//! and host memory state.
//!
//! ## Protocol
//!
//! Length-prefixed JSON frames over a Unix domain socket. A caller sends a
//! [`memvitals_proto::MethodCall`] naming one of the supported operations
//! and receives exactly one reply: a structured result, a typed error, or a
//! distinct not-implemented signal.
//!
//! ## Architecture
//!
//! - [`config`]: YAML configuration with defaults and validation
//! - [`protocol`]: the frame codec
//! - [`handlers`]: request dispatch over a [`memvitals_telemetry::MemorySource`]
//! - [`server`]: the socket accept/serve loop

pub mod config;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use config::{AgentConfig, ConfigError};
pub use handlers::QueryHandler;
pub use server::QueryServer;
