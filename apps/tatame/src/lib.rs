//! # Tatame
//!
//! HTTP API, CLI and configuration around `tatame-core`.
//! The binary in `main.rs` only sets up logging and dispatches to [`cli`].

pub mod api;
pub mod cli;
pub mod config;
