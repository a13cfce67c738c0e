//! Snippetbox Core - Shared types library.
//!
//! This crate provides common types used across the Snippetbox crates:
//! - `web` - The server-rendered snippet site
//! - `integration-tests` - End-to-end tests against the composed router
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and snippet lifetimes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
