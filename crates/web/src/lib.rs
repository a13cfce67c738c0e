//! Snippetbox web application library.
//!
//! The binary in `main.rs` is a thin shell around [`routes::router`]; keeping
//! everything else in a library lets the integration tests drive the exact
//! router production serves.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod validator;
pub mod views;
