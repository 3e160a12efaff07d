//! Stockfish integration

pub mod analysis;
mod handle;
pub mod stockfish;

pub use analysis::{
    build_analyzed_game, Evaluation, EvaluationReport, PositionAnalysis, PositionReport, MATE_SCORE,
};
pub use handle::{uci_to_san, ChessEngine, EngineMove, MAX_ELO, MIN_ELO};
pub use stockfish::{EngineError, SearchLimit, StockfishEngine, Strength};
