//! Batch aggregation of motifs and phase statistics

use std::collections::BTreeMap;

use shakmaty::Color;
use tracing::debug;

use super::motifs::first_motif;
use super::types::*;
use crate::board::PositionOracle;

/// Attribution for game `index`; `None` means both sides are scanned
fn attributed(player_colors: &[Option<PlayerColor>], index: usize) -> Option<PlayerColor> {
    player_colors.get(index).copied().flatten()
}

fn is_attributed_move(user_color: Option<PlayerColor>, record: &MoveRecord) -> bool {
    user_color.map_or(true, |c| c == record.color)
}

/// Scans the player's blunders and mistakes for tactical motifs.
///
/// Each error contributes at most one finding. Moves whose position cannot
/// be parsed are skipped.
pub fn detect_tactical_patterns(
    games: &[AnalyzedGame],
    player_colors: &[Option<PlayerColor>],
) -> PatternTable {
    let mut patterns = PatternTable::new();

    for (game_index, game) in games.iter().enumerate() {
        let user_color = attributed(player_colors, game_index);

        for record in &game.moves {
            if !record.classification.is_error() || !is_attributed_move(user_color, record) {
                continue;
            }

            let board = match PositionOracle::from_fen(&record.fen_after) {
                Ok(b) => b,
                Err(e) => {
                    debug!(game_index, move_number = record.move_number, "skipping move: {}", e);
                    continue;
                }
            };

            let victim: Color = record.color.into();
            let Some((pattern, motif)) = first_motif(&board, victim, !victim) else {
                continue;
            };

            let eval_loss = round1(record.eval_change.abs());
            let lost_material = if eval_loss > 0.0 { eval_loss } else { motif.material };

            patterns.entry(pattern).or_default().push(Finding {
                game_index,
                move_number: record.move_number,
                pattern,
                lost_material,
                fen: record.fen_after.clone(),
                description: motif.description,
            });
        }
    }

    patterns
}

#[derive(Default)]
struct PhaseAccumulator {
    cp_losses: Vec<f64>,
    blunders: u32,
    mistakes: u32,
    moves: u32,
}

/// Accuracy and error counts per game phase for the attributed side.
/// Phases without moves are left out.
pub fn analyze_phase_performance(
    games: &[AnalyzedGame],
    player_colors: &[Option<PlayerColor>],
) -> PhaseTable {
    let mut phases: BTreeMap<GamePhase, PhaseAccumulator> = BTreeMap::new();

    for (game_index, game) in games.iter().enumerate() {
        let user_color = attributed(player_colors, game_index);

        for record in &game.moves {
            if !is_attributed_move(user_color, record) {
                continue;
            }

            let acc = phases
                .entry(GamePhase::from_move_number(record.move_number))
                .or_default();
            acc.moves += 1;
            match record.classification {
                Classification::Blunder => acc.blunders += 1,
                Classification::Mistake => acc.mistakes += 1,
                _ => {}
            }
            acc.cp_losses.push(record.cp_loss());
        }
    }

    phases
        .into_iter()
        .filter(|(_, acc)| acc.moves > 0)
        .map(|(phase, acc)| {
            let stat = PhaseStat {
                phase,
                avg_accuracy: round1(accuracy_from_cp_losses(&acc.cp_losses)),
                blunder_count: acc.blunders,
                mistake_count: acc.mistakes,
                move_count: acc.moves,
            };
            (phase, stat)
        })
        .collect()
}

/// `100 - mean(cp_loss) / 2`, clamped to [0, 100]. No samples is 100.
pub fn accuracy_from_cp_losses(cp_losses: &[f64]) -> f64 {
    if cp_losses.is_empty() {
        return 100.0;
    }
    let avg_loss = cp_losses.iter().sum::<f64>() / cp_losses.len() as f64;
    (100.0 - avg_loss / 2.0).clamp(0.0, 100.0)
}

/// Mean of the per-game accuracy figures for the attributed side, or both
/// sides when unknown. Missing figures are skipped; no figures gives 0.0.
pub fn overall_accuracy(games: &[AnalyzedGame], player_colors: &[Option<PlayerColor>]) -> f64 {
    let mut accuracies = Vec::new();

    for (game_index, game) in games.iter().enumerate() {
        match attributed(player_colors, game_index) {
            Some(color) => accuracies.extend(game.summary.accuracy(color)),
            None => {
                accuracies.extend(game.summary.white_accuracy);
                accuracies.extend(game.summary.black_accuracy);
            }
        }
    }

    if accuracies.is_empty() {
        return 0.0;
    }
    round1(accuracies.iter().sum::<f64>() / accuracies.len() as f64)
}
