//! Tactical motif detectors
//!
//! Each detector inspects the position right after the victim's move and
//! reports at most one motif. Detectors never mutate the board; hypothetical
//! moves are played on copies.

use shakmaty::{Color, Move, Rank, Role, Square};

use super::types::PatternType;
use crate::board::{material_value, role_name, PositionOracle};

/// What a detector found: a description and the material at stake in pawns
#[derive(Debug, Clone, PartialEq)]
pub struct Motif {
    pub description: String,
    pub material: f64,
}

/// `(board, victim, exploiter)`
pub type Detector = fn(&PositionOracle, Color, Color) -> Option<Motif>;

/// Detectors in priority order. The first one that fires claims the error.
pub const DETECTORS: [(PatternType, Detector); 4] = [
    (PatternType::HangingPiece, hanging_piece),
    (PatternType::KnightFork, knight_fork),
    (PatternType::Pin, pin),
    (PatternType::BackRank, back_rank),
];

/// Runs the detectors in priority order and returns the first hit
pub fn first_motif(
    board: &PositionOracle,
    victim: Color,
    exploiter: Color,
) -> Option<(PatternType, Motif)> {
    DETECTORS
        .iter()
        .find_map(|(pattern, detect)| detect(board, victim, exploiter).map(|m| (*pattern, m)))
}

/// Pieces a knight fork is worth reporting for
const FORKABLE: [Role; 4] = [Role::King, Role::Queen, Role::Rook, Role::Bishop];

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Most valuable victim piece that is attacked and has no defender.
/// Equal values resolve to the lowest square (a1 first).
pub fn hanging_piece(board: &PositionOracle, victim: Color, exploiter: Color) -> Option<Motif> {
    let mut best: Option<(Square, Role, f64)> = None;

    for square in board.occupied_by(victim) {
        let Some(piece) = board.piece_at(square) else {
            continue;
        };
        if piece.role == Role::King {
            continue;
        }
        if board.attackers(exploiter, square).is_empty() || board.attackers(victim, square).any() {
            continue;
        }

        let value = material_value(piece.role);
        if best.map_or(true, |(_, _, v)| value > v) {
            best = Some((square, piece.role, value));
        }
    }

    best.map(|(square, role, value)| Motif {
        description: format!("{} on {} left undefended", capitalize(role_name(role)), square),
        material: value,
    })
}

/// Fork from a knight on `square`, with the total value it attacks
fn fork_from(board: &PositionOracle, square: Square, victim: Color) -> Option<(Motif, f64)> {
    let targets: Vec<Role> = board
        .knight_attacks(square)
        .into_iter()
        .filter_map(|target| board.piece_at(target))
        .filter(|piece| piece.color == victim && FORKABLE.contains(&piece.role))
        .map(|piece| piece.role)
        .collect();

    if targets.len() < 2 {
        return None;
    }

    let total: f64 = targets.iter().map(|r| material_value(*r)).sum();
    // The victim saves the bigger piece, so the lesser one is what is lost
    let at_risk = targets
        .iter()
        .map(|r| material_value(*r))
        .fold(f64::INFINITY, f64::min);
    let names = targets
        .iter()
        .map(|r| role_name(*r))
        .collect::<Vec<_>>()
        .join(" and ");

    Some((
        Motif {
            description: format!("Knight on {} forks {}", square, names),
            material: at_risk,
        },
        total,
    ))
}

/// Knight fork by the exploiter, either already on the board or one knight
/// move away. The fork attacking the most total material wins.
pub fn knight_fork(board: &PositionOracle, victim: Color, exploiter: Color) -> Option<Motif> {
    let mut best: Option<Motif> = None;
    let mut best_total = 0.0;

    for knight in board.pieces(exploiter, Role::Knight) {
        if let Some((motif, total)) = fork_from(board, knight, victim) {
            if total > best_total {
                best = Some(motif);
                best_total = total;
            }
        }
    }

    let mut knight_moves: Vec<Move> = board
        .legal_moves(exploiter)
        .into_iter()
        .filter(|m| m.role() == Role::Knight)
        .collect();
    knight_moves.sort_by_key(|m| (m.from(), m.to()));

    for mv in knight_moves {
        let Ok(after) = board.apply(&mv) else {
            continue;
        };
        if let Some((motif, total)) = fork_from(&after, mv.to(), victim) {
            if total > best_total {
                best = Some(motif);
                best_total = total;
            }
        }
    }

    best
}

/// Most valuable victim piece pinned to its own king
pub fn pin(board: &PositionOracle, victim: Color, _exploiter: Color) -> Option<Motif> {
    let king = board.king_square(victim)?;
    let mut best: Option<Motif> = None;
    let mut best_value = 0.0;

    for square in board.occupied_by(victim) {
        let Some(piece) = board.piece_at(square) else {
            continue;
        };
        if piece.role == Role::King || !board.is_pinned(victim, square) {
            continue;
        }

        let value = material_value(piece.role);
        if value <= best_value {
            continue;
        }

        let pinner = board
            .pin_ray(victim, square)
            .into_iter()
            .filter(|&s| s != square && s != king)
            .find_map(|s| board.piece_at(s).filter(|p| p.color != victim))
            .map_or("piece", |p| role_name(p.role));

        best_value = value;
        best = Some(Motif {
            description: format!(
                "{} on {} pinned to king by {}",
                capitalize(role_name(piece.role)),
                square,
                pinner
            ),
            material: value,
        });
    }

    best
}

/// King on its home rank with no safe square directly in front of it, while
/// the exploiter still has a rook or queen
pub fn back_rank(board: &PositionOracle, victim: Color, exploiter: Color) -> Option<Motif> {
    let king = board.king_square(victim)?;
    let (home, forward) = match victim {
        Color::White => (Rank::First, Rank::Second),
        Color::Black => (Rank::Eighth, Rank::Seventh),
    };
    if king.rank() != home {
        return None;
    }

    for delta in -1..=1 {
        let Some(file) = king.file().offset(delta) else {
            continue;
        };
        let escape = Square::from_coords(file, forward);
        let own_piece = board.piece_at(escape).map_or(false, |p| p.color == victim);
        if !own_piece && !board.is_attacked_by(exploiter, escape) {
            return None;
        }
    }

    let has_heavy_piece =
        board.pieces(exploiter, Role::Rook).any() || board.pieces(exploiter, Role::Queen).any();

    has_heavy_piece.then(|| Motif {
        description: "Back rank weakness - king trapped by own pawns".to_string(),
        // Mate threat, not real material
        material: 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(fen: &str) -> PositionOracle {
        PositionOracle::from_fen(fen).unwrap()
    }

    #[test]
    fn test_hanging_queen_on_d4() {
        let b = board("6k1/8/8/1n6/3Q4/8/8/6K1 b - - 0 1");
        let motif = hanging_piece(&b, Color::White, Color::Black).unwrap();
        assert!(motif.description.contains("Queen on d4"));
        assert_eq!(motif.material, 9.0);
    }

    #[test]
    fn test_defended_piece_is_not_hanging() {
        // Queen on d4 defended by the pawn on e3
        let b = board("6k1/8/8/1n6/3Q4/4P3/8/6K1 b - - 0 1");
        assert!(hanging_piece(&b, Color::White, Color::Black).is_none());
    }

    #[test]
    fn test_hanging_ties_resolve_to_lowest_square() {
        // Knights on a4 and h4 both attacked by pawns and undefended
        let b = board("6k1/8/8/1p4p1/N6N/8/8/4K3 b - - 0 1");
        let motif = hanging_piece(&b, Color::White, Color::Black).unwrap();
        assert_eq!(motif.description, "Knight on a4 left undefended");
        assert_eq!(motif.material, 3.0);
    }

    #[test]
    fn test_existing_knight_fork() {
        let b = board("4k3/8/8/8/8/8/2n5/R3K3 w - - 0 1");
        let motif = knight_fork(&b, Color::White, Color::Black).unwrap();
        assert_eq!(motif.description, "Knight on c2 forks rook and king");
        assert_eq!(motif.material, 5.0);
    }

    #[test]
    fn test_fork_one_knight_move_away() {
        let b = board("4k3/8/8/8/1n6/8/8/R3K3 b - - 0 1");
        let motif = knight_fork(&b, Color::White, Color::Black).unwrap();
        assert_eq!(motif.description, "Knight on c2 forks rook and king");
        assert_eq!(motif.material, 5.0);
        // The hypothetical move was played on a copy
        assert_eq!(b.piece_at(Square::B4).map(|p| p.role), Some(Role::Knight));
        assert!(b.piece_at(Square::C2).is_none());
    }

    #[test]
    fn test_single_target_is_not_a_fork() {
        let b = board("4k3/8/8/8/8/8/2n5/4K3 w - - 0 1");
        assert!(knight_fork(&b, Color::White, Color::Black).is_none());
    }

    #[test]
    fn test_pin_names_the_pinner() {
        let b = board("4k3/4r3/8/8/8/8/4B3/4K3 b - - 0 1");
        let motif = pin(&b, Color::White, Color::Black).unwrap();
        assert_eq!(motif.description, "Bishop on e2 pinned to king by rook");
        assert_eq!(motif.material, 3.0);
    }

    #[test]
    fn test_back_rank_trapped_king() {
        let b = board("r5k1/5ppp/8/8/8/8/5PPP/6K1 b - - 0 1");
        let motif = back_rank(&b, Color::White, Color::Black).unwrap();
        assert_eq!(motif.material, 100.0);
        assert!(motif.description.starts_with("Back rank weakness"));
    }

    #[test]
    fn test_back_rank_with_luft() {
        let b = board("r5k1/5ppp/8/8/8/7P/5PP1/6K1 b - - 0 1");
        assert!(back_rank(&b, Color::White, Color::Black).is_none());
    }

    #[test]
    fn test_back_rank_luft_covered_by_bishop() {
        let b = board("r5k1/5ppp/8/4b3/8/7P/5PP1/6K1 b - - 0 1");
        assert!(back_rank(&b, Color::White, Color::Black).is_some());
    }

    #[test]
    fn test_back_rank_needs_heavy_piece() {
        let b = board("n5k1/5ppp/8/8/8/8/5PPP/6K1 b - - 0 1");
        assert!(back_rank(&b, Color::White, Color::Black).is_none());
    }

    #[test]
    fn test_back_rank_corner_king() {
        let b = board("r6k/6pp/8/8/8/8/6PP/7K b - - 0 1");
        assert!(back_rank(&b, Color::White, Color::Black).is_some());
    }

    #[test]
    fn test_hanging_piece_beats_pin() {
        // Bishop e2 is pinned, knight a4 hangs to the b5 pawn
        let b = board("4k3/4r3/8/1p6/N7/8/4B3/4K3 b - - 0 1");
        assert!(pin(&b, Color::White, Color::Black).is_some());

        let (pattern, motif) = first_motif(&b, Color::White, Color::Black).unwrap();
        assert_eq!(pattern, PatternType::HangingPiece);
        assert_eq!(motif.description, "Knight on a4 left undefended");
    }

    #[test]
    fn test_quiet_position_has_no_motif() {
        let b = board("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
        assert!(first_motif(&b, Color::White, Color::Black).is_none());
    }
}
