//! Domain models.

pub mod snippet;

pub use snippet::{Snippet, human_date};
