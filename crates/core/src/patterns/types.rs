//! Pattern types for multi-game weakness detection

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shakmaty::Color;

/// Move quality tier assigned from centipawn loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// < 20 centipawn loss
    Excellent,
    /// < 50 centipawn loss
    Good,
    /// < 100 centipawn loss
    Inaccuracy,
    /// < 300 centipawn loss
    Mistake,
    /// >= 300 centipawn loss
    Blunder,
}

impl Classification {
    pub fn from_cp_loss(cp_loss: f64) -> Self {
        match cp_loss {
            l if l >= 300.0 => Classification::Blunder,
            l if l >= 100.0 => Classification::Mistake,
            l if l >= 50.0 => Classification::Inaccuracy,
            l if l >= 20.0 => Classification::Good,
            _ => Classification::Excellent,
        }
    }

    /// Blunders and mistakes are scanned for tactical motifs
    pub fn is_error(&self) -> bool {
        matches!(self, Classification::Blunder | Classification::Mistake)
    }
}

/// Side of the board, as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl From<Color> for PlayerColor {
    fn from(color: Color) -> Self {
        match color {
            Color::White => PlayerColor::White,
            Color::Black => PlayerColor::Black,
        }
    }
}

impl From<PlayerColor> for Color {
    fn from(color: PlayerColor) -> Self {
        match color {
            PlayerColor::White => Color::White,
            PlayerColor::Black => Color::Black,
        }
    }
}

/// One move of an engine-analyzed game.
///
/// Evaluations are in pawns from White's point of view. `eval_change` is from
/// the mover's point of view: negative means the mover lost ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub move_number: u32,
    pub color: PlayerColor,
    #[serde(default)]
    pub san: Option<String>,
    #[serde(default)]
    pub uci: Option<String>,
    pub fen_before: String,
    pub fen_after: String,
    pub eval_before: f64,
    pub eval_after: f64,
    pub eval_change: f64,
    #[serde(default)]
    pub best_move: Option<String>,
    pub classification: Classification,
}

impl MoveRecord {
    /// Centipawns the mover gave away, never negative
    pub fn cp_loss(&self) -> f64 {
        (-self.eval_change * 100.0).max(0.0)
    }
}

/// Per-side totals for one analyzed game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    #[serde(default)]
    pub white_accuracy: Option<f64>,
    #[serde(default)]
    pub black_accuracy: Option<f64>,
    #[serde(default)]
    pub white_blunders: u32,
    #[serde(default)]
    pub black_blunders: u32,
    #[serde(default)]
    pub white_mistakes: u32,
    #[serde(default)]
    pub black_mistakes: u32,
    #[serde(default)]
    pub white_inaccuracies: u32,
    #[serde(default)]
    pub black_inaccuracies: u32,
    #[serde(default)]
    pub total_moves: u32,
}

impl GameSummary {
    pub fn accuracy(&self, color: PlayerColor) -> Option<f64> {
        match color {
            PlayerColor::White => self.white_accuracy,
            PlayerColor::Black => self.black_accuracy,
        }
    }
}

/// A game scored move-by-move by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedGame {
    pub moves: Vec<MoveRecord>,
    #[serde(default)]
    pub summary: GameSummary,
}

/// Tactical motif, declared in detector priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    HangingPiece,
    KnightFork,
    Pin,
    BackRank,
}

impl PatternType {
    /// Lowercase name with spaces, used in recommendation text
    pub fn readable(&self) -> &'static str {
        match self {
            PatternType::HangingPiece => "hanging piece",
            PatternType::KnightFork => "knight fork",
            PatternType::Pin => "pin",
            PatternType::BackRank => "back rank",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PatternType::HangingPiece => "Hanging Piece",
            PatternType::KnightFork => "Knight Fork",
            PatternType::Pin => "Pin",
            PatternType::BackRank => "Back Rank",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    /// Moves 1-15
    Opening,
    /// Moves 16-40
    Middlegame,
    /// Moves 41+
    Endgame,
}

impl GamePhase {
    pub fn from_move_number(move_number: u32) -> Self {
        match move_number {
            0..=15 => GamePhase::Opening,
            16..=40 => GamePhase::Middlegame,
            _ => GamePhase::Endgame,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Opening => "opening",
            GamePhase::Middlegame => "middlegame",
            GamePhase::Endgame => "endgame",
        }
    }
}

/// A tactical motif found right after one of the player's errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub game_index: usize,
    pub move_number: u32,
    pub pattern: PatternType,
    pub lost_material: f64,
    pub fen: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseStat {
    pub phase: GamePhase,
    pub avg_accuracy: f64,
    pub blunder_count: u32,
    pub mistake_count: u32,
    pub move_count: u32,
}

/// Findings grouped by motif, in scan order within each motif
pub type PatternTable = BTreeMap<PatternType, Vec<Finding>>;

/// Phase statistics; phases without moves are absent
pub type PhaseTable = BTreeMap<GamePhase, PhaseStat>;

/// Aggregate result of a multi-game pattern scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub total_games: usize,
    pub tactical_patterns: PatternTable,
    pub phase_stats: PhaseTable,
    pub overall_accuracy: f64,
    pub recommendations: Vec<String>,
}

impl PatternSummary {
    pub fn total_findings(&self) -> usize {
        self.tactical_patterns.values().map(Vec::len).sum()
    }
}

/// Rounds to one decimal place
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
