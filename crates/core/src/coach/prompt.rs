//! System prompt assembly

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::lesson::LESSON_MARKER;
use crate::patterns::PatternSummary;

const BASE_PROMPT: &str = "You are a friendly chess coach helping a student improve their game.

Your approach:
- Ask questions to find out what the student wants to work on
- Give concrete, actionable advice rather than platitudes
- Use the board to illustrate points when it helps
- Be encouraging but honest about mistakes
- Refer to established chess principles

Do not calculate tactics yourself; the engine does that. Your job is to explain \
ideas and help the student understand why moves are good or bad.

Keep replies conversational and short. Ask follow-up questions when the \
student's goal is unclear.";

/// What the student currently has on the board
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardContext {
    #[serde(default)]
    pub fen: Option<String>,
    #[serde(default)]
    pub last_move: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

fn lesson_instructions() -> String {
    format!(
        "When you and the student agree on something to practise, end your reply with \
         {LESSON_MARKER} followed by a single JSON object with the keys \"topic\", \"type\", \
         \"goals\" (list of strings), \"activity\" (with \"type\" one of practice_game, \
         position_study, tactics_drill, endgame_practice, game_review and optional \
         \"positions\", \"coach_plays\", \"target_opening\", \"pgn\"), and optionally \
         \"source_reference\", \"teaching_notes\" and \"success_criteria\"."
    )
}

/// Renders a pattern summary as a prompt block
pub fn pattern_block(summary: &PatternSummary) -> String {
    let mut block = String::new();
    let _ = writeln!(
        block,
        "Recent pattern analysis ({} games, overall accuracy {:.1}%):",
        summary.total_games, summary.overall_accuracy
    );

    for (pattern, findings) in &summary.tactical_patterns {
        if findings.is_empty() {
            continue;
        }
        let avg = findings.iter().map(|f| f.lost_material).sum::<f64>() / findings.len() as f64;
        let _ = writeln!(
            block,
            "- {}: {} occurrence(s), avg {:.1} pawns lost",
            pattern.display_name(),
            findings.len(),
            avg
        );
    }

    for stats in summary.phase_stats.values() {
        let _ = writeln!(
            block,
            "- {} accuracy {:.1}% ({} blunders, {} mistakes over {} moves)",
            stats.phase.as_str(),
            stats.avg_accuracy,
            stats.blunder_count,
            stats.mistake_count,
            stats.move_count
        );
    }

    if !summary.recommendations.is_empty() {
        block.push_str("Recommendations:\n");
        for rec in &summary.recommendations {
            let _ = writeln!(block, "- {}", rec);
        }
    }

    block.trim_end().to_string()
}

/// Builds the coach's system prompt from whatever context is available
pub fn build_system_prompt(
    board: Option<&BoardContext>,
    patterns: Option<&PatternSummary>,
    reading: Option<&str>,
) -> String {
    let mut prompt = String::from(BASE_PROMPT);

    if let Some(board) = board {
        prompt.push_str("\n\nCurrent board state:");
        let fen = board.fen.as_deref().unwrap_or("starting position");
        let _ = write!(prompt, "\n- Position (FEN): {}", fen);
        if let Some(last_move) = board.last_move.as_deref().filter(|m| !m.is_empty()) {
            let _ = write!(prompt, "\n- Last move: {}", last_move);
        }
        if let Some(mode) = board.mode.as_deref().filter(|m| !m.is_empty()) {
            let _ = write!(prompt, "\n- Current mode: {}", mode);
        }
    }

    if let Some(summary) = patterns {
        prompt.push_str("\n\n");
        prompt.push_str(&pattern_block(summary));
    }

    if let Some(reading) = reading.filter(|r| !r.trim().is_empty()) {
        prompt.push_str("\n\nReference material:\n");
        prompt.push_str(reading.trim_end());
    }

    prompt.push_str("\n\n");
    prompt.push_str(&lesson_instructions());
    prompt
}
