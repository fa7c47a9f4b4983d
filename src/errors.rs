use std::io;

use thiserror::Error;

use crate::types::Phrase;

/// Error type for collaborator failures, configuration, and report IO.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("scraping '{keyword}' failed: {reason}")]
    ScrapeFailed { keyword: Phrase, reason: String },
    #[error("classifying '{keyword}' failed: {reason}")]
    ClassifierFailed { keyword: Phrase, reason: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("task for '{keyword}' cannot move from {from} to {to}")]
    InvalidTransition {
        keyword: Phrase,
        from: &'static str,
        to: &'static str,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
