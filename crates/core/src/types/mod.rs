//! Core types for Snippetbox.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod lifetime;

pub use email::{EMAIL_PATTERN, Email, EmailError};
pub use id::*;
pub use lifetime::SnippetLifetime;
