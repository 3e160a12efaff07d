//! Pattern detection engine

use super::aggregate::{analyze_phase_performance, detect_tactical_patterns, overall_accuracy};
use super::recommend::generate_recommendations;
use super::types::*;

/// Detects recurring weaknesses across a batch of analyzed games.
///
/// Stateless: every call works only on its arguments, so one detector can be
/// shared freely between request handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternDetector;

impl PatternDetector {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a batch of games and summarize recurring patterns
    /// games: engine-analyzed games
    /// player_colors: per-game side the player controlled; `None` or a
    /// missing entry scans both sides
    pub fn analyze_games(
        &self,
        games: &[AnalyzedGame],
        player_colors: &[Option<PlayerColor>],
    ) -> PatternSummary {
        let tactical_patterns = detect_tactical_patterns(games, player_colors);
        let phase_stats = analyze_phase_performance(games, player_colors);
        let recommendations = generate_recommendations(&tactical_patterns, &phase_stats);

        PatternSummary {
            total_games: games.len(),
            overall_accuracy: overall_accuracy(games, player_colors),
            tactical_patterns,
            phase_stats,
            recommendations,
        }
    }
}
