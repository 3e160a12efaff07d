use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

pub mod analysis;
pub mod books;
pub mod coach;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analysis::analyze_position))
        .route("/api/analyze-game", post(analysis::analyze_game))
        .route("/api/play-move", post(analysis::play_move))
        .route("/api/patterns", post(analysis::detect_patterns))
        .route("/api/coach/chat", post(coach::chat))
        .route("/api/lesson/current", get(coach::current_lesson))
        .route("/api/lesson/complete", post(coach::complete_lesson))
        .route("/api/books", get(books::list_books))
        .route("/api/books/search", get(books::search_books))
        .route("/api/books/:title/sections/:number", get(books::get_section))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub engine: &'static str,
    pub engine_running: bool,
    pub coach_enabled: bool,
    pub books: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        engine: "stockfish",
        engine_running: state.engine.is_running().await,
        coach_enabled: state.coach.is_some(),
        books: state.books.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chess_coach_core::books::Book;
    use chess_coach_core::coach::LessonPlan;
    use chess_coach_core::BookLibrary;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::lock;

    const BOOK: &str = r#"{
        "metadata": {"title": "My System", "author": "Aron Nimzowitsch", "year": 1925},
        "parts": [{"part_number": 1, "chapters": [{"chapter_number": 3, "title": "The Pin",
            "sections": [{"section_number": 12, "title": "Pins against the king",
                          "content": "The pinned piece is a weakness.", "topics": ["pin"]}]}]}]
    }"#;

    fn state() -> Arc<AppState> {
        let config = Config {
            stockfish_path: "/nonexistent/stockfish".to_string(),
            ..Config::from_lookup(|_| None)
        };
        let book: Book = serde_json::from_str(BOOK).unwrap();
        Arc::new(AppState::new(config, BookLibrary::from_books([book]), None))
    }

    async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(state(), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["engine"], "stockfish");
        assert_eq!(body["engine_running"], false);
        assert_eq!(body["coach_enabled"], false);
        assert_eq!(body["books"], 1);
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_input() {
        let (status, body) = send(state(), post_json("/api/analyze", json!({"fen": "nope"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid position"));

        let start = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let (status, body) =
            send(state(), post_json("/api/analyze", json!({"fen": start, "depth": 31}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "depth must be between 1 and 30");
    }

    #[tokio::test]
    async fn test_analyze_without_engine_is_unavailable() {
        let start = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let (status, body) = send(state(), post_json("/api/analyze", json!({"fen": start}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["detail"], "Chess engine is not running");
    }

    #[tokio::test]
    async fn test_patterns_need_minimum_batch() {
        let pgns = vec!["1. e4 e5 *", "1. d4 d5 *"];
        let (status, body) = send(
            state(),
            post_json("/api/patterns", json!({"pgns": pgns, "username": "me"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["detail"],
            "At least 5 games are needed for pattern detection, got 2"
        );
    }

    #[tokio::test]
    async fn test_patterns_report_bad_pgn() {
        let (status, body) = send(
            state(),
            post_json("/api/patterns", json!({"pgns": ["1. e4 e5 *", "1. Ke3 *"]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().starts_with("PGN #2"));
    }

    #[tokio::test]
    async fn test_coach_disabled_without_key() {
        let (status, body) =
            send(state(), post_json("/api/coach/chat", json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["detail"].as_str().unwrap().contains("ANTHROPIC_API_KEY"));
    }

    #[tokio::test]
    async fn test_lesson_lifecycle() {
        let state = state();

        let (status, body) = send(state.clone(), get("/api/lesson/current")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["lesson"].is_null());

        let (status, _) =
            send(state.clone(), post_json("/api/lesson/complete", json!({"success": true}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let plan = LessonPlan::from_json(json!({
            "topic": "Pins", "type": "tactics", "goals": ["Spot pins"],
            "activity": {"type": "tactics_drill"}
        }))
        .unwrap();
        lock(&state.lessons).start_lesson(plan);

        let (_, body) = send(state.clone(), get("/api/lesson/current")).await;
        assert_eq!(body["lesson"]["topic"], "Pins");

        let (status, body) = send(
            state.clone(),
            post_json("/api/lesson/complete", json!({"success": true, "notes": "done"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["lesson"]["topic"], "Pins");
    }

    #[tokio::test]
    async fn test_books_routes() {
        let (status, body) = send(state(), get("/api/books")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["title"], "My System");

        let (_, body) = send(state(), get("/api/books/search?q=king,%20endgame")).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["section_number"], 12);

        let (status, _) = send(state(), get("/api/books/search?q=")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(state(), get("/api/books/My%20System/sections/12")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Pins against the king");

        let (status, _) = send(state(), get("/api/books/My%20System/sections/99")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
