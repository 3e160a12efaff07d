//! Types for representing engine analysis results

use std::fmt;

use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::parser::PlyRecord;
use crate::patterns::{
    accuracy_from_cp_losses, AnalyzedGame, Classification, GameSummary, MoveRecord, PlayerColor,
};

/// Pawns used in place of a forced mate
pub const MATE_SCORE: f64 = 100.0;

/// Engine score relative to the side to move, as reported over UCI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Evaluation {
    /// Centipawn score
    #[serde(rename = "cp")]
    Centipawns(i32),
    /// Forced mate in N (negative = side to move gets mated, 0 = already mated)
    Mate(i32),
}

impl Evaluation {
    /// Score in pawns for the side to move; mates map to +/- `MATE_SCORE`
    pub fn as_pawns(&self) -> f64 {
        match self {
            Evaluation::Centipawns(cp) => *cp as f64 / 100.0,
            Evaluation::Mate(moves) if *moves > 0 => MATE_SCORE,
            Evaluation::Mate(_) => -MATE_SCORE,
        }
    }

    /// Score in pawns from White's point of view, given who is to move
    pub fn white_pawns(&self, turn: Color) -> f64 {
        match turn {
            Color::White => self.as_pawns(),
            Color::Black => -self.as_pawns(),
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => {
                let score = *cp as f64 / 100.0;
                if score >= 0.0 {
                    write!(f, "+{:.2}", score)
                } else {
                    write!(f, "{:.2}", score)
                }
            }
            Evaluation::Mate(moves) => write!(f, "M{}", moves),
        }
    }
}

/// Complete analysis of a position
#[derive(Debug, Clone)]
pub struct PositionAnalysis {
    /// Best move found, empty when the position has no legal moves
    pub best_move: String,
    /// Evaluation of the position
    pub evaluation: Evaluation,
    /// Analysis depth reached
    pub depth: u8,
    /// Principal variation (best line of play)
    pub pv: Vec<String>,
    /// Time spent analyzing (milliseconds)
    pub time_ms: u64,
    /// Nodes searched
    pub nodes: u64,
}

impl PositionAnalysis {
    /// Returns a brief summary of the analysis
    pub fn summary(&self) -> String {
        format!(
            "Eval: {} | Best: {} | Depth: {} | PV: {}",
            self.evaluation,
            self.best_move,
            self.depth,
            self.pv.iter().take(5).cloned().collect::<Vec<_>>().join(" ")
        )
    }
}

/// Evaluation in the shape clients consume: pawns for `cp`, moves for `mate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
}

impl From<Evaluation> for EvaluationReport {
    fn from(evaluation: Evaluation) -> Self {
        match evaluation {
            Evaluation::Centipawns(cp) => Self {
                kind: "cp".to_string(),
                value: cp as f64 / 100.0,
            },
            Evaluation::Mate(moves) => Self {
                kind: "mate".to_string(),
                value: moves as f64,
            },
        }
    }
}

/// Result of analyzing a single position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub fen: String,
    pub evaluation: EvaluationReport,
    pub best_move: Option<String>,
    pub best_move_san: Option<String>,
    pub pv: Vec<String>,
    pub depth: u8,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Builds an analyzed game from a replayed PGN and White-relative
/// evaluations (in pawns) of every position: one before each ply plus the
/// final position.
pub fn build_analyzed_game(plies: &[PlyRecord], white_evals: &[f64]) -> AnalyzedGame {
    let mut moves = Vec::with_capacity(plies.len());
    let mut summary = GameSummary::default();
    let mut white_losses = Vec::new();
    let mut black_losses = Vec::new();

    for (ply, window) in plies.iter().zip(white_evals.windows(2)) {
        let (eval_before, eval_after) = (window[0], window[1]);
        let sign = match ply.color {
            PlayerColor::White => 1.0,
            PlayerColor::Black => -1.0,
        };
        let eval_change = round2((eval_after - eval_before) * sign);
        let cp_loss = (-eval_change * 100.0).max(0.0);
        let classification = Classification::from_cp_loss(cp_loss);

        let (losses, blunders, mistakes, inaccuracies) = match ply.color {
            PlayerColor::White => (
                &mut white_losses,
                &mut summary.white_blunders,
                &mut summary.white_mistakes,
                &mut summary.white_inaccuracies,
            ),
            PlayerColor::Black => (
                &mut black_losses,
                &mut summary.black_blunders,
                &mut summary.black_mistakes,
                &mut summary.black_inaccuracies,
            ),
        };
        losses.push(cp_loss);
        match classification {
            Classification::Blunder => *blunders += 1,
            Classification::Mistake => *mistakes += 1,
            Classification::Inaccuracy => *inaccuracies += 1,
            _ => {}
        }

        moves.push(MoveRecord {
            move_number: ply.move_number,
            color: ply.color,
            san: Some(ply.san.clone()),
            uci: Some(ply.uci.clone()),
            fen_before: ply.fen_before.clone(),
            fen_after: ply.fen_after.clone(),
            eval_before: round2(eval_before),
            eval_after: round2(eval_after),
            eval_change,
            best_move: None,
            classification,
        });
    }

    let side_accuracy = |losses: &[f64]| {
        (!losses.is_empty()).then(|| (accuracy_from_cp_losses(losses) * 10.0).round() / 10.0)
    };
    summary.white_accuracy = side_accuracy(&white_losses[..]);
    summary.black_accuracy = side_accuracy(&black_losses[..]);
    summary.total_moves = moves.len() as u32;

    AnalyzedGame { moves, summary }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ply(move_number: u32, color: PlayerColor, san: &str) -> PlyRecord {
        PlyRecord {
            move_number,
            color,
            san: san.to_string(),
            uci: String::new(),
            fen_before: String::new(),
            fen_after: String::new(),
        }
    }

    #[test]
    fn test_evaluation_display() {
        assert_eq!(Evaluation::Centipawns(35).to_string(), "+0.35");
        assert_eq!(Evaluation::Centipawns(-120).to_string(), "-1.20");
        assert_eq!(Evaluation::Mate(3).to_string(), "M3");
        assert_eq!(Evaluation::Mate(-2).to_string(), "M-2");
    }

    #[test]
    fn test_white_point_of_view() {
        assert_eq!(Evaluation::Centipawns(50).white_pawns(Color::Black), -0.5);
        assert_eq!(Evaluation::Mate(0).white_pawns(Color::Black), MATE_SCORE);
        assert_eq!(Evaluation::Mate(2).white_pawns(Color::White), MATE_SCORE);
    }

    #[test]
    fn test_evaluation_report() {
        let report = EvaluationReport::from(Evaluation::Centipawns(-42));
        assert_eq!(report.kind, "cp");
        assert_eq!(report.value, -0.42);

        let json = serde_json::to_value(EvaluationReport::from(Evaluation::Mate(4))).unwrap();
        assert_eq!(json["type"], "mate");
        assert_eq!(json["value"], 4.0);
    }

    #[test]
    fn test_build_analyzed_game() {
        let plies = vec![
            ply(1, PlayerColor::White, "e4"),
            ply(1, PlayerColor::Black, "f6"),
            ply(2, PlayerColor::White, "d4"),
            ply(2, PlayerColor::Black, "g5"),
        ];
        // Black's g5 walks into mate
        let evals = [0.3, 0.3, 1.0, 1.1, MATE_SCORE];

        let game = build_analyzed_game(&plies, &evals);
        assert_eq!(game.moves.len(), 4);

        let f6 = &game.moves[1];
        assert_eq!(f6.eval_change, -0.7);
        assert_eq!(f6.classification, Classification::Inaccuracy);

        let g5 = &game.moves[3];
        assert_eq!(g5.classification, Classification::Blunder);
        assert_eq!(g5.eval_change, -98.9);

        assert_eq!(game.moves[0].classification, Classification::Excellent);
        assert_eq!(game.summary.white_accuracy, Some(100.0));
        assert_eq!(game.summary.black_blunders, 1);
        assert_eq!(game.summary.black_inaccuracies, 1);
        assert_eq!(game.summary.total_moves, 4);
        // (70 + 9890) / 2 = 4980 cp average loss
        assert_eq!(game.summary.black_accuracy, Some(0.0));
    }

    #[test]
    fn test_no_moves_has_no_accuracy() {
        let game = build_analyzed_game(&[], &[0.2]);
        assert!(game.moves.is_empty());
        assert_eq!(game.summary.white_accuracy, None);
    }
}
