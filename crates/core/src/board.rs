//! Board position oracle
//!
//! Read-only query surface over a `shakmaty` position. The motif detectors
//! are built entirely on top of these queries; move legality and attack
//! generation are delegated to `shakmaty`.

use shakmaty::{
    attacks, fen::Fen, Bitboard, CastlingMode, Chess, Color, EnPassantMode, FromSetup, Move,
    Piece, Position, Role, Square,
};

use crate::error::{Error, Result};

/// Standard material values in pawns. The king value is only used for ranking.
pub fn material_value(role: Role) -> f64 {
    match role {
        Role::Pawn => 1.0,
        Role::Knight => 3.0,
        Role::Bishop => 3.0,
        Role::Rook => 5.0,
        Role::Queen => 9.0,
        Role::King => 100.0,
    }
}

pub fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}

/// A parsed position that answers attack, pin and move queries.
#[derive(Debug, Clone)]
pub struct PositionOracle {
    position: Chess,
}

impl PositionOracle {
    /// Parses a FEN string into an oracle
    pub fn from_fen(fen: &str) -> Result<Self> {
        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|e| Error::Position(format!("{}: {}", fen, e)))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| Error::Position(format!("{}: {}", fen, e)))?;
        Ok(Self { position })
    }

    pub fn from_position(position: Chess) -> Self {
        Self { position }
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position.board().piece_at(square)
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.position.board().king_of(color)
    }

    /// All squares holding a piece of `color` and `role`, ascending
    pub fn pieces(&self, color: Color, role: Role) -> Bitboard {
        let board = self.position.board();
        board.by_color(color) & board.by_role(role)
    }

    /// All squares holding a piece of `color`, ascending
    pub fn occupied_by(&self, color: Color) -> Bitboard {
        self.position.board().by_color(color)
    }

    /// Squares of `color` pieces attacking `square` with the current occupancy.
    /// Pinned attackers are included.
    pub fn attackers(&self, color: Color, square: Square) -> Bitboard {
        let board = self.position.board();
        board.attacks_to(square, color, board.occupied())
    }

    pub fn is_attacked_by(&self, color: Color, square: Square) -> bool {
        self.attackers(color, square).any()
    }

    /// Squares a knight standing on `square` attacks
    pub fn knight_attacks(&self, square: Square) -> Bitboard {
        attacks::knight_attacks(square)
    }

    /// Line from the king of `color` (exclusive) to the slider pinning the
    /// piece on `square` (inclusive). Empty when the piece is not pinned.
    pub fn pin_ray(&self, color: Color, square: Square) -> Bitboard {
        let board = self.position.board();
        if board.piece_at(square).map(|p| p.color) != Some(color) {
            return Bitboard::EMPTY;
        }
        let Some(king) = board.king_of(color) else {
            return Bitboard::EMPTY;
        };

        let enemy = board.by_color(!color);
        let queens = board.by_role(Role::Queen);
        let orthogonal = attacks::rook_attacks(king, Bitboard::EMPTY)
            & (board.by_role(Role::Rook) | queens);
        let diagonal = attacks::bishop_attacks(king, Bitboard::EMPTY)
            & (board.by_role(Role::Bishop) | queens);

        for sniper in (orthogonal | diagonal) & enemy {
            let between = attacks::between(king, sniper);
            if (between & board.occupied()).single_square() == Some(square) {
                return between | Bitboard::from(sniper);
            }
        }
        Bitboard::EMPTY
    }

    pub fn is_pinned(&self, color: Color, square: Square) -> bool {
        self.pin_ray(color, square).any()
    }

    /// Legal moves for `color`, whether or not it is `color`'s turn.
    /// Empty when `color` cannot legally be put on move.
    pub fn legal_moves(&self, color: Color) -> Vec<Move> {
        match self.on_move(color) {
            Some(position) => position.legal_moves().into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Plays `mv` on a copy of the position. The receiver is left untouched.
    pub fn apply(&self, mv: &Move) -> Result<Self> {
        let mover = mv
            .from()
            .and_then(|from| self.piece_at(from))
            .map(|p| p.color)
            .ok_or_else(|| Error::Position(format!("no piece to move for {:?}", mv)))?;

        let position = self
            .on_move(mover)
            .ok_or_else(|| Error::Position(format!("{:?} cannot be put on move", mover)))?;

        position
            .play(mv.clone())
            .map(Self::from_position)
            .map_err(|e| Error::Position(e.to_string()))
    }

    /// A copy of the position with `color` to move
    fn on_move(&self, color: Color) -> Option<Chess> {
        if self.position.turn() == color {
            return Some(self.position.clone());
        }
        let mut setup = self.position.to_setup(EnPassantMode::Legal);
        setup.turn = color;
        setup.ep_square = None;
        Chess::from_setup(setup, CastlingMode::Standard).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTING: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_malformed_fen_is_position_error() {
        let result = PositionOracle::from_fen("not a fen");
        assert!(matches!(result, Err(Error::Position(_))));
    }

    #[test]
    fn test_attackers_of_f3() {
        let oracle = PositionOracle::from_fen(STARTING).unwrap();
        let attackers: Vec<Square> = oracle.attackers(Color::White, Square::F3).into_iter().collect();
        assert_eq!(attackers, vec![Square::G1, Square::E2, Square::G2]);
        assert!(!oracle.is_attacked_by(Color::Black, Square::F3));
    }

    #[test]
    fn test_piece_and_king_lookup() {
        let oracle = PositionOracle::from_fen(STARTING).unwrap();
        assert_eq!(oracle.king_square(Color::Black), Some(Square::E8));
        let piece = oracle.piece_at(Square::D1).unwrap();
        assert_eq!(piece.role, Role::Queen);
        assert_eq!(piece.color, Color::White);
        assert!(oracle.piece_at(Square::D4).is_none());
    }

    #[test]
    fn test_pin_ray_reaches_pinner() {
        // White bishop on e2 pinned by the rook on e7
        let oracle = PositionOracle::from_fen("4k3/4r3/8/8/8/8/4B3/4K3 w - - 0 1").unwrap();
        assert!(oracle.is_pinned(Color::White, Square::E2));

        let ray = oracle.pin_ray(Color::White, Square::E2);
        assert!(ray.contains(Square::E7));
        assert!(ray.contains(Square::E2));
        assert!(!ray.contains(Square::E1));
        assert!(!ray.contains(Square::E8));
    }

    #[test]
    fn test_two_blockers_is_not_a_pin() {
        let oracle = PositionOracle::from_fen("4k3/4r3/8/8/4N3/8/4B3/4K3 w - - 0 1").unwrap();
        assert!(!oracle.is_pinned(Color::White, Square::E2));
        assert!(!oracle.is_pinned(Color::White, Square::E4));
    }

    #[test]
    fn test_legal_moves_for_side_not_on_move() {
        let oracle = PositionOracle::from_fen(STARTING).unwrap();
        assert_eq!(oracle.legal_moves(Color::White).len(), 20);
        assert_eq!(oracle.legal_moves(Color::Black).len(), 20);
    }

    #[test]
    fn test_apply_does_not_mutate() {
        let oracle = PositionOracle::from_fen(STARTING).unwrap();
        let mv = oracle
            .legal_moves(Color::White)
            .into_iter()
            .find(|m| m.from() == Some(Square::G1) && m.to() == Square::F3)
            .unwrap();

        let next = oracle.apply(&mv).unwrap();
        assert_eq!(next.piece_at(Square::F3).map(|p| p.role), Some(Role::Knight));
        assert_eq!(oracle.piece_at(Square::G1).map(|p| p.role), Some(Role::Knight));
        assert!(oracle.piece_at(Square::F3).is_none());
    }

    #[test]
    fn test_material_values() {
        assert_eq!(material_value(Role::Queen), 9.0);
        assert_eq!(material_value(Role::Bishop), material_value(Role::Knight));
        assert_eq!(role_name(Role::Rook), "rook");
    }
}
