//! Smartmarks: a minimal personal bookmark manager with live multi-tab sync.
//!
//! This library crate exposes all modules for use by the RPC binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_connection;
pub mod rpc_handler;
pub mod services;
pub mod types;
