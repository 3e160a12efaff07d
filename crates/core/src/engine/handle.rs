//! Shared, lazily started engine handle used by the service layer

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Position};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::analysis::{build_analyzed_game, EvaluationReport, PositionReport};
use super::stockfish::{EngineError, SearchLimit, StockfishEngine, Strength};
use crate::board::PositionOracle;
use crate::error::Result;
use crate::parser::PgnGame;
use crate::patterns::AnalyzedGame;

/// Strength range Stockfish accepts for `UCI_Elo`
pub const MIN_ELO: u16 = 1320;
pub const MAX_ELO: u16 = 3190;

/// A move chosen by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineMove {
    pub uci: String,
    pub san: Option<String>,
}

/// One engine process behind an async mutex. Searches are serialized.
pub struct ChessEngine {
    path: String,
    process: Mutex<Option<StockfishEngine>>,
}

impl ChessEngine {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            process: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Spawns the engine if it is not already running
    pub async fn start(&self) -> Result<()> {
        let mut process = self.process.lock().await;
        if process.is_none() {
            *process = Some(StockfishEngine::new(&self.path).await?);
            info!(path = %self.path, "engine started");
        }
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        if let Some(mut engine) = self.process.lock().await.take() {
            engine.quit().await?;
            info!("engine stopped");
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        let mut process = self.process.lock().await;
        discard_if_closed(&mut process);
        process.is_some()
    }

    /// Evaluates a position. The score is relative to the side to move.
    pub async fn analyze(&self, fen: &str, depth: u8) -> Result<PositionReport> {
        let oracle = PositionOracle::from_fen(fen)?;

        let mut guard = self.process.lock().await;
        let engine = guard.as_mut().ok_or(EngineError::NotInitialized)?;
        let result = async {
            engine.set_strength(Strength::Full).await?;
            engine.set_position(Some(&oracle.fen()), None).await?;
            engine.analyze(depth).await
        }
        .await;
        discard_if_closed(&mut guard);
        let analysis = result?;

        let best_move = (!analysis.best_move.is_empty()).then(|| analysis.best_move.clone());
        let best_move_san = best_move
            .as_deref()
            .and_then(|uci| uci_to_san(oracle.position(), uci));

        Ok(PositionReport {
            fen: fen.to_string(),
            evaluation: EvaluationReport::from(analysis.evaluation),
            best_move,
            best_move_san,
            pv: analysis.pv,
            depth,
        })
    }

    /// Picks a move at reduced strength, then restores full strength
    pub async fn play_move(&self, fen: &str, elo: u16, movetime_ms: u64) -> Result<EngineMove> {
        let oracle = PositionOracle::from_fen(fen)?;
        let elo = elo.clamp(MIN_ELO, MAX_ELO);

        let mut guard = self.process.lock().await;
        let engine = guard.as_mut().ok_or(EngineError::NotInitialized)?;
        let result = async {
            engine.set_strength(Strength::Limited(elo)).await?;
            engine.set_position(Some(&oracle.fen()), None).await?;
            let search = engine
                .search(SearchLimit::MoveTime(Duration::from_millis(movetime_ms)))
                .await;
            // A dropped request skips this; the next analysis restores it
            if let Err(e) = engine.set_strength(Strength::Full).await {
                warn!("failed to restore engine strength: {}", e);
            }
            search
        }
        .await;
        discard_if_closed(&mut guard);
        let analysis = result?;

        if analysis.best_move.is_empty() {
            return Err(EngineError::Protocol("no legal move in position".into()).into());
        }
        let san = uci_to_san(oracle.position(), &analysis.best_move);
        Ok(EngineMove {
            uci: analysis.best_move,
            san,
        })
    }

    /// Evaluates every position of a replayed game and classifies each ply
    pub async fn analyze_game(&self, game: &PgnGame, depth: u8) -> Result<AnalyzedGame> {
        let final_fen = match game.plies.last() {
            Some(ply) => ply.fen_after.clone(),
            None => PositionOracle::from_position(game.initial_position.clone()).fen(),
        };

        let mut guard = self.process.lock().await;
        let engine = guard.as_mut().ok_or(EngineError::NotInitialized)?;
        let result = async {
            engine.set_strength(Strength::Full).await?;

            let mut white_evals = Vec::with_capacity(game.plies.len() + 1);
            let mut best_moves = Vec::with_capacity(game.plies.len());
            for ply in &game.plies {
                engine.set_position(Some(&ply.fen_before), None).await?;
                let analysis = engine.analyze(depth).await?;
                white_evals.push(analysis.evaluation.white_pawns(ply.color.into()));
                best_moves.push((!analysis.best_move.is_empty()).then_some(analysis.best_move));
            }

            engine.set_position(Some(&final_fen), None).await?;
            let last = engine.analyze(depth).await?;
            white_evals.push(last.evaluation.white_pawns(game.final_position.turn()));
            Ok::<_, EngineError>((white_evals, best_moves))
        }
        .await;
        discard_if_closed(&mut guard);
        drop(guard);
        let (white_evals, best_moves) = result?;

        let mut analyzed = build_analyzed_game(&game.plies, &white_evals);
        for (record, best) in analyzed.moves.iter_mut().zip(best_moves) {
            record.best_move = best;
        }

        info!(
            game = %game.summary(),
            plies = game.plies.len(),
            depth,
            "game analyzed"
        );
        Ok(analyzed)
    }
}

/// Forgets a process that stopped answering so the handle reports it as down
fn discard_if_closed(process: &mut Option<StockfishEngine>) {
    if process.as_ref().is_some_and(StockfishEngine::is_closed) {
        warn!("engine process exited");
        *process = None;
    }
}

/// Converts a UCI move to SAN in `position`, if it is legal there
pub fn uci_to_san(position: &Chess, uci: &str) -> Option<String> {
    let uci_move: UciMove = uci.parse().ok()?;
    let mv = uci_move.to_move(position).ok()?;
    Some(San::from_move(position, mv).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uci_to_san() {
        let start = Chess::default();
        assert_eq!(uci_to_san(&start, "g1f3").as_deref(), Some("Nf3"));
        assert_eq!(uci_to_san(&start, "e2e5"), None);
        assert_eq!(uci_to_san(&start, "nonsense"), None);
    }

    #[test]
    fn test_castling_san() {
        let oracle =
            PositionOracle::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(uci_to_san(oracle.position(), "e1g1").as_deref(), Some("O-O"));
        assert_eq!(uci_to_san(oracle.position(), "e1c1").as_deref(), Some("O-O-O"));
    }

    #[tokio::test]
    async fn test_not_started() {
        let engine = ChessEngine::new("stockfish");
        assert!(!engine.is_running().await);

        let start = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let err = engine.analyze(start, 10).await.unwrap_err();
        assert!(matches!(err, crate::Error::Engine(EngineError::NotInitialized)));
        // Stopping an idle handle is a no-op
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_fen_checked_before_engine() {
        let engine = ChessEngine::new("stockfish");
        let err = engine.analyze("not a fen", 10).await.unwrap_err();
        assert!(matches!(err, crate::Error::Position(_)));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let engine = ChessEngine::new("/nonexistent/stockfish");
        let err = engine.start().await.unwrap_err();
        assert!(matches!(err, crate::Error::Engine(EngineError::Spawn(_))));
        assert!(!engine.is_running().await);
    }

    /// Scripted UCI engine: search `n` scores `10 * n` centipawns, plus
    /// 1000 while strength is limited. `go depth 99` makes it exit.
    #[cfg(unix)]
    const SCRIPTED_ENGINE: &str = r#"#!/bin/sh
n=0
limit=0
while read -r line; do
  case "$line" in
    uci) echo "id name scripted"; echo "uciok" ;;
    isready) echo "readyok" ;;
    "setoption name UCI_LimitStrength value true") limit=1000 ;;
    "setoption name UCI_LimitStrength value false") limit=0 ;;
    "go depth 99") exit 0 ;;
    go*)
      n=$((n + 1))
      sleep 0.5
      echo "info depth 1 score cp $((n * 10 + limit)) pv e2e4"
      echo "bestmove e2e4"
      ;;
  esac
done
"#;

    #[cfg(unix)]
    async fn scripted_engine(dir: &tempfile::TempDir) -> ChessEngine {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("engine.sh");
        std::fs::write(&path, SCRIPTED_ENGINE).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = ChessEngine::new(path.to_string_lossy().into_owned());
        engine.start().await.unwrap();
        engine
    }

    #[cfg(unix)]
    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_analysis_does_not_leak_into_next() {
        let dir = tempfile::tempdir().unwrap();
        let engine = scripted_engine(&dir).await;

        let dropped =
            tokio::time::timeout(Duration::from_millis(150), engine.analyze(START, 10)).await;
        assert!(dropped.is_err());

        let report = engine.analyze(START, 10).await.unwrap();
        assert_eq!(report.evaluation.value, 0.2);
        assert_eq!(report.best_move_san.as_deref(), Some("e4"));
        let report = engine.analyze(START, 10).await.unwrap();
        assert_eq!(report.evaluation.value, 0.3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_play_move_restores_full_strength() {
        let dir = tempfile::tempdir().unwrap();
        let engine = scripted_engine(&dir).await;

        let dropped =
            tokio::time::timeout(Duration::from_millis(150), engine.play_move(START, 1500, 100))
                .await;
        assert!(dropped.is_err());

        let report = engine.analyze(START, 10).await.unwrap();
        assert_eq!(report.evaluation.value, 0.2);
        let report = engine.analyze(START, 10).await.unwrap();
        assert_eq!(report.evaluation.value, 0.3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_play_move_then_analysis_at_full_strength() {
        let dir = tempfile::tempdir().unwrap();
        let engine = scripted_engine(&dir).await;

        let reply = engine.play_move(START, 1500, 100).await.unwrap();
        assert_eq!(reply.uci, "e2e4");
        assert_eq!(reply.san.as_deref(), Some("e4"));

        let report = engine.analyze(START, 10).await.unwrap();
        assert_eq!(report.evaluation.value, 0.2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exited_engine_is_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let engine = scripted_engine(&dir).await;
        assert!(engine.is_running().await);

        let err = engine.analyze(START, 99).await.unwrap_err();
        assert!(matches!(err, crate::Error::Engine(EngineError::Protocol(_))));
        assert!(!engine.is_running().await);

        let err = engine.analyze(START, 10).await.unwrap_err();
        assert!(matches!(err, crate::Error::Engine(EngineError::NotInitialized)));
    }

    #[tokio::test]
    #[ignore] // Ignore by default - requires stockfish installed
    async fn test_analyze_game() {
        let games = crate::parser::parse_pgn_string("1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0")
            .unwrap();
        let engine = ChessEngine::new("stockfish");
        engine.start().await.unwrap();

        let analyzed = engine.analyze_game(&games[0], 8).await.unwrap();
        assert_eq!(analyzed.moves.len(), 7);
        let nf6 = &analyzed.moves[5];
        assert_eq!(nf6.classification, crate::patterns::Classification::Blunder);

        let reply = engine.play_move(&nf6.fen_before, 1500, 100).await.unwrap();
        assert!(!reply.uci.is_empty());
        engine.stop().await.unwrap();
    }
}
