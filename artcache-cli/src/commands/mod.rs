//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`cache`] - Cache inspection and temp-file sweeping
//! - [`config`] - Configuration management (init, path, show)
//! - [`generate`] - One-shot artifact generation
//! - [`key`] - Cache key derivation
//! - [`serve`] - HTTP server

pub mod cache;
pub mod config;
pub mod generate;
pub mod key;
pub mod serve;
