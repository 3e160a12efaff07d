//! PGN parsing and move-by-move replay

use pgn_reader::{RawTag, SanPlus, Skip, Visitor};
use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position};
use std::fs;
use std::io::{self, Cursor};
use std::ops::ControlFlow;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::patterns::PlayerColor;

/// One half-move of a replayed game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlyRecord {
    /// Full-move number the ply belongs to
    pub move_number: u32,
    pub color: PlayerColor,
    pub san: String,
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
}

/// Represents a parsed chess game
#[derive(Debug, Clone)]
pub struct PgnGame {
    pub event: Option<String>,
    pub site: Option<String>,
    pub date: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,
    pub white_elo: Option<u16>,
    pub black_elo: Option<u16>,
    pub plies: Vec<PlyRecord>,
    pub initial_position: Chess,
    pub final_position: Chess,
}

impl PgnGame {
    pub fn move_count(&self) -> usize {
        self.plies.len()
    }

    pub fn summary(&self) -> String {
        let white = self.white.as_deref().unwrap_or("Unknown");
        let black = self.black.as_deref().unwrap_or("Unknown");
        let result = self.result.as_deref().unwrap_or("*");
        format!("{} vs {} - {}", white, black, result)
    }

    /// Side played by `username`, matched case-insensitively against the
    /// White and Black tags
    pub fn player_color(&self, username: &str) -> Option<PlayerColor> {
        let matches = |tag: &Option<String>| {
            tag.as_deref()
                .is_some_and(|name| name.trim().eq_ignore_ascii_case(username.trim()))
        };

        if matches(&self.white) {
            Some(PlayerColor::White)
        } else if matches(&self.black) {
            Some(PlayerColor::Black)
        } else {
            None
        }
    }
}

fn fen_string(position: &Chess) -> String {
    Fen::from_position(position, EnPassantMode::Legal).to_string()
}

#[derive(Default)]
struct GameTags {
    event: Option<String>,
    site: Option<String>,
    date: Option<String>,
    white: Option<String>,
    black: Option<String>,
    result: Option<String>,
    white_elo: Option<u16>,
    black_elo: Option<u16>,
    fen: Option<String>,
}

struct GameMoves {
    tags: GameTags,
    plies: Vec<PlyRecord>,
    initial_position: Chess,
    current_position: Chess,
    success: bool,
}

struct GameParser;

impl Visitor for GameParser {
    type Tags = GameTags;
    type Movetext = GameMoves;
    type Output = Option<PgnGame>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(GameTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let name_str = String::from_utf8_lossy(name);
        let value_str = value.decode_utf8_lossy().to_string();

        match name_str.as_ref() {
            "Event" => tags.event = Some(value_str),
            "Site" => tags.site = Some(value_str),
            "Date" => tags.date = Some(value_str),
            "White" => tags.white = Some(value_str),
            "Black" => tags.black = Some(value_str),
            "Result" => tags.result = Some(value_str),
            "WhiteElo" => tags.white_elo = value_str.parse().ok(),
            "BlackElo" => tags.black_elo = value_str.parse().ok(),
            "FEN" => tags.fen = Some(value_str),
            _ => {}
        }

        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let start = match tags.fen.as_deref() {
            None => Some(Chess::default()),
            Some(fen) => fen
                .parse::<Fen>()
                .ok()
                .and_then(|f| f.into_position(CastlingMode::Standard).ok()),
        };

        let success = start.is_some();
        if !success {
            debug!(fen = ?tags.fen, "game has an unusable FEN tag");
        }
        let start = start.unwrap_or_default();

        ControlFlow::Continue(GameMoves {
            tags,
            plies: Vec::new(),
            initial_position: start.clone(),
            current_position: start,
            success,
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        if !movetext.success {
            return ControlFlow::Continue(());
        }

        let position = &movetext.current_position;
        let mv = match san.san.to_move(position) {
            Ok(m) => m,
            Err(_) => {
                debug!(san = %san, "illegal move in movetext");
                movetext.success = false;
                return ControlFlow::Continue(());
            }
        };

        let move_number = position.fullmoves().get();
        let color = PlayerColor::from(position.turn());
        let fen_before = fen_string(position);

        match position.clone().play(mv) {
            Ok(new_pos) => {
                movetext.plies.push(PlyRecord {
                    move_number,
                    color,
                    san: san.to_string(),
                    uci: mv.to_uci(CastlingMode::Standard).to_string(),
                    fen_before,
                    fen_after: fen_string(&new_pos),
                });
                movetext.current_position = new_pos;
            }
            Err(_) => {
                movetext.success = false;
            }
        }

        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        _movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        if movetext.success {
            Some(PgnGame {
                event: movetext.tags.event,
                site: movetext.tags.site,
                date: movetext.tags.date,
                white: movetext.tags.white,
                black: movetext.tags.black,
                result: movetext.tags.result,
                white_elo: movetext.tags.white_elo,
                black_elo: movetext.tags.black_elo,
                plies: movetext.plies,
                initial_position: movetext.initial_position,
                final_position: movetext.current_position,
            })
        } else {
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum PgnError {
    #[error("File error: {0}")]
    File(#[from] io::Error),
    #[error("No valid games found in PGN")]
    NoGamesFound,
    #[error("Parse error: {0}")]
    Parse(String),
}

pub fn parse_pgn_file<P: AsRef<Path>>(path: P) -> Result<Vec<PgnGame>, PgnError> {
    let contents = fs::read_to_string(path)?;
    parse_pgn_string(&contents)
}

/// Parses every game in `pgn`. Games with illegal movetext are dropped;
/// an input with no valid game is an error.
pub fn parse_pgn_string(pgn: &str) -> Result<Vec<PgnGame>, PgnError> {
    let mut parser = GameParser;
    let mut games: Vec<PgnGame> = Vec::new();

    let cursor = Cursor::new(pgn.as_bytes());
    let mut reader = pgn_reader::Reader::new(cursor);

    loop {
        match reader.read_game(&mut parser) {
            Ok(Some(maybe_game)) => {
                if let Some(game) = maybe_game {
                    games.push(game);
                }
            }
            Ok(None) => break,
            Err(e) => return Err(PgnError::Parse(e.to_string())),
        }
    }

    if games.is_empty() {
        Err(PgnError::NoGamesFound)
    } else {
        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Color;

    const SAMPLE_PGN: &str = r#"[Event "Test"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 1-0
"#;

    #[test]
    fn test_parse_pgn_string() {
        let games = parse_pgn_string(SAMPLE_PGN).unwrap();
        assert_eq!(games.len(), 1);

        let game = &games[0];
        assert_eq!(game.white.as_deref(), Some("Alice"));
        assert_eq!(game.black.as_deref(), Some("Bob"));
        assert_eq!(game.result.as_deref(), Some("1-0"));
        assert_eq!(game.move_count(), 5);
    }

    #[test]
    fn test_game_summary() {
        let games = parse_pgn_string(SAMPLE_PGN).unwrap();
        let summary = games[0].summary();
        assert_eq!(summary, "Alice vs Bob - 1-0");
    }

    #[test]
    fn test_position_tracking() {
        let games = parse_pgn_string(SAMPLE_PGN).unwrap();
        let game = &games[0];
        assert_eq!(game.final_position.turn(), Color::Black);
        assert_eq!(game.final_position.board().occupied().count(), 32);
    }

    #[test]
    fn test_ply_records() {
        let games = parse_pgn_string(SAMPLE_PGN).unwrap();
        let plies = &games[0].plies;

        let first = &plies[0];
        assert_eq!(first.move_number, 1);
        assert_eq!(first.color, PlayerColor::White);
        assert_eq!(first.san, "e4");
        assert_eq!(first.uci, "e2e4");
        assert_eq!(
            first.fen_before,
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
        assert_eq!(
            first.fen_after,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );

        let bb5 = &plies[4];
        assert_eq!(bb5.move_number, 3);
        assert_eq!(bb5.uci, "f1b5");
        assert_eq!(plies[3].fen_after, bb5.fen_before);
    }

    #[test]
    fn test_castling_uci() {
        let pgn = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. O-O *";
        let games = parse_pgn_string(pgn).unwrap();
        let castle = games[0].plies.last().unwrap();
        assert_eq!(castle.san, "O-O");
        assert_eq!(castle.uci, "e1g1");

        let promotion = "[FEN \"4k3/P7/8/8/8/8/8/4K3 w - - 0 1\"]\n\n1. a8=Q+ *";
        let games = parse_pgn_string(promotion).unwrap();
        assert_eq!(games[0].plies[0].uci, "a7a8q");
    }

    #[test]
    fn test_variations_are_skipped() {
        let pgn = "1. e4 (1. d4 d5) 1... e5 2. Nf3 *";
        let games = parse_pgn_string(pgn).unwrap();
        let sans: Vec<&str> = games[0].plies.iter().map(|p| p.san.as_str()).collect();
        assert_eq!(sans, vec!["e4", "e5", "Nf3"]);
    }

    #[test]
    fn test_illegal_movetext_drops_game() {
        let pgn = "1. e4 e5 2. Ke3 *\n\n1. d4 d5 *\n";
        let games = parse_pgn_string(pgn).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].plies[0].san, "d4");

        assert!(matches!(
            parse_pgn_string("1. e4 Ke7 2. Ke3 *"),
            Err(PgnError::NoGamesFound)
        ));
    }

    #[test]
    fn test_fen_tag_sets_start() {
        let pgn = r#"[SetUp "1"]
[FEN "4k3/8/8/8/8/8/4P3/4K3 b - - 0 30"]

30... Kd7 31. e4 *
"#;
        let games = parse_pgn_string(pgn).unwrap();
        let plies = &games[0].plies;
        assert_eq!(plies[0].color, PlayerColor::Black);
        assert_eq!(plies[0].move_number, 30);
        assert_eq!(plies[1].move_number, 31);
        assert_eq!(plies[1].uci, "e2e4");
    }

    #[test]
    fn test_player_color() {
        let games = parse_pgn_string(SAMPLE_PGN).unwrap();
        let game = &games[0];
        assert_eq!(game.player_color("alice"), Some(PlayerColor::White));
        assert_eq!(game.player_color("BOB"), Some(PlayerColor::Black));
        assert_eq!(game.player_color("carol"), None);
    }
}
