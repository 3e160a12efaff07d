//! Error types for chess-coach-core

use thiserror::Error;

use crate::engine::EngineError;
use crate::parser::PgnError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid position: {0}")]
    Position(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("PGN parsing error: {0}")]
    Pgn(#[from] PgnError),

    #[error("At least {required} games are needed for pattern detection, got {actual}")]
    InsufficientBatch { required: usize, actual: usize },

    #[error("Book error: {0}")]
    Book(String),

    #[error("Coach error: {0}")]
    Coach(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
