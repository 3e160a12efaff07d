//! Chess Coach Core Library
//!
//! Engine analysis of games, multi-game tactical pattern detection, a
//! book corpus for reference reading and the coach conversation layer.

pub mod board;
pub mod books;
pub mod coach;
pub mod engine;
pub mod error;
pub mod parser;
pub mod patterns;

pub use board::PositionOracle;
pub use books::BookLibrary;
pub use coach::{CoachClient, LessonManager};
pub use engine::ChessEngine;
pub use error::{Error, Result};
pub use patterns::{AnalyzedGame, PatternDetector, PatternSummary, PatternType, PlayerColor};

/// Fewest games a pattern batch may contain
pub const DEFAULT_MIN_PATTERN_GAMES: usize = 5;

/// Rejects batches too small to show a pattern
pub fn check_batch_size(actual: usize, required: usize) -> Result<()> {
    if actual < required {
        return Err(Error::InsufficientBatch { required, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_batch_size() {
        assert!(check_batch_size(5, DEFAULT_MIN_PATTERN_GAMES).is_ok());
        let err = check_batch_size(3, DEFAULT_MIN_PATTERN_GAMES).unwrap_err();
        assert_eq!(
            err.to_string(),
            "At least 5 games are needed for pattern detection, got 3"
        );
    }
}
