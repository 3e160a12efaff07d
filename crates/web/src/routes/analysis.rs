use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use chess_coach_core::books::SectionHit;
use chess_coach_core::engine::{EngineMove, PositionReport};
use chess_coach_core::parser::{parse_pgn_string, PgnGame};
use chess_coach_core::{check_batch_size, AnalyzedGame, PatternDetector, PatternSummary, PlayerColor};

use crate::error::{ApiError, ApiResult};
use crate::{lock, AppState};

pub const DEFAULT_DEPTH: u32 = 15;
pub const MAX_DEPTH: u32 = 30;
const READING_LIMIT: usize = 3;

fn default_depth() -> u32 {
    DEFAULT_DEPTH
}

fn checked_depth(depth: u32) -> ApiResult<u8> {
    if !(1..=MAX_DEPTH).contains(&depth) {
        return Err(ApiError::BadRequest(format!(
            "depth must be between 1 and {}",
            MAX_DEPTH
        )));
    }
    Ok(depth as u8)
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub fen: String,
    #[serde(default = "default_depth")]
    pub depth: u32,
}

pub async fn analyze_position(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<Json<PositionReport>> {
    let depth = checked_depth(req.depth)?;
    let report = state.engine.analyze(&req.fen, depth).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeGameRequest {
    pub pgn: String,
    #[serde(default = "default_depth")]
    pub depth: u32,
}

pub async fn analyze_game(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeGameRequest>,
) -> ApiResult<Json<AnalyzedGame>> {
    let depth = checked_depth(req.depth)?;
    let games = parse_pgn_string(&req.pgn).map_err(chess_coach_core::Error::from)?;
    // parse_pgn_string never returns an empty list
    let Some(game) = games.first() else {
        return Err(ApiError::BadRequest("No valid games found in PGN".into()));
    };
    let analyzed = state.engine.analyze_game(game, depth).await?;
    Ok(Json(analyzed))
}

#[derive(Debug, Deserialize)]
pub struct PlayMoveRequest {
    pub fen: String,
    #[serde(default = "default_elo")]
    pub elo: u16,
    #[serde(default = "default_movetime")]
    pub movetime_ms: u64,
}

fn default_elo() -> u16 {
    1500
}

fn default_movetime() -> u64 {
    500
}

pub async fn play_move(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlayMoveRequest>,
) -> ApiResult<Json<EngineMove>> {
    let movetime = req.movetime_ms.clamp(50, 10_000);
    let mv = state.engine.play_move(&req.fen, req.elo, movetime).await?;
    Ok(Json(mv))
}

#[derive(Debug, Deserialize)]
pub struct PatternsRequest {
    pub pgns: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_depth")]
    pub depth: u32,
}

#[derive(Debug, Serialize)]
pub struct PatternsResponse {
    #[serde(flatten)]
    pub summary: PatternSummary,
    pub suggested_reading: Vec<SectionHit>,
}

/// Parses every submitted PGN; each string may hold several games
fn collect_games(pgns: &[String]) -> ApiResult<Vec<PgnGame>> {
    let mut games = Vec::new();
    for (i, pgn) in pgns.iter().enumerate() {
        let parsed = parse_pgn_string(pgn)
            .map_err(|e| ApiError::BadRequest(format!("PGN #{}: {}", i + 1, e)))?;
        games.extend(parsed);
    }
    Ok(games)
}

pub async fn detect_patterns(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PatternsRequest>,
) -> ApiResult<Json<PatternsResponse>> {
    let depth = checked_depth(req.depth)?;
    let games = collect_games(&req.pgns)?;
    check_batch_size(games.len(), state.config.min_pattern_games)?;

    let colors: Vec<Option<PlayerColor>> = games
        .iter()
        .map(|g| req.username.as_deref().and_then(|u| g.player_color(u)))
        .collect();

    let mut analyzed = Vec::with_capacity(games.len());
    for game in &games {
        analyzed.push(state.engine.analyze_game(game, depth).await?);
    }

    let summary = tokio::task::spawn_blocking(move || {
        PatternDetector::new().analyze_games(&analyzed, &colors)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Pattern detection failed: {}", e)))?;

    tracing::info!(
        games = summary.total_games,
        findings = summary.total_findings(),
        accuracy = summary.overall_accuracy,
        "pattern batch analyzed"
    );

    let suggested_reading = state.books.suggested_reading(&summary, READING_LIMIT);
    *lock(&state.last_patterns) = Some(summary.clone());

    Ok(Json(PatternsResponse { summary, suggested_reading }))
}
