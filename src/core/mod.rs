//! Core error types shared by the site builder and the CLI.
//!
//! See [`error`] for the types and [`user_friendly_error`] for turning any
//! error into a colored report with suggestions.

pub mod error;

pub use error::{AppError, ErrorContext, message_with_causes, user_friendly_error};
