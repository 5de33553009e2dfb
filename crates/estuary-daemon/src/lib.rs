//! Library half of `estuaryd`: wires the four core subsystems (spec 2)
//! together with the ambient config/persistence/TLS/CLI stack. `main.rs`
//! is a thin entry point over this crate, same split as the teacher's
//! `turbomcp-proxy` lib/bin pair.

pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod paths;
pub mod persistence;
pub mod slave_client;
pub mod slave_listener;
pub mod tls;
