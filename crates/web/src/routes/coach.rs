use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use chess_coach_core::books::BookLibrary;
use chess_coach_core::coach::{
    build_system_prompt, BoardContext, ChatMessage, CoachReply, CompletedLesson, LessonPlan,
};
use chess_coach_core::PatternSummary;

use crate::error::{ApiError, ApiResult};
use crate::{lock, AppState};

const READING_SECTIONS: usize = 2;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub board_context: Option<BoardContext>,
}

/// Full text of the sections that cover the student's recent motifs
fn reading_for(books: &BookLibrary, summary: &PatternSummary) -> String {
    books
        .suggested_reading(summary, READING_SECTIONS)
        .iter()
        .filter_map(|hit| {
            let section = books.get_section(&hit.book, hit.section_number)?;
            Some(format!(
                "From {}, section {} ({}):\n{}",
                hit.book, section.section_number, section.title, section.content
            ))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<CoachReply>> {
    let Some(coach) = state.coach.as_ref() else {
        return Err(ApiError::Unavailable(
            "Coach is not configured: set ANTHROPIC_API_KEY".into(),
        ));
    };
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }

    let patterns = lock(&state.last_patterns).clone();
    let reading = patterns
        .as_ref()
        .map(|summary| reading_for(&state.books, summary));
    let system = build_system_prompt(
        req.board_context.as_ref(),
        patterns.as_ref(),
        reading.as_deref(),
    );

    let mut reply = coach.chat_with_system(&req.message, &req.history, &system).await?;

    if let Some(plan) = reply.lesson.take() {
        let mut lessons = lock(&state.lessons);
        reply.lesson = Some(lessons.start_lesson(plan).clone());
    }

    Ok(Json(reply))
}

#[derive(Debug, Serialize)]
pub struct CurrentLesson {
    pub lesson: Option<LessonPlan>,
}

pub async fn current_lesson(State(state): State<Arc<AppState>>) -> Json<CurrentLesson> {
    let lesson = lock(&state.lessons).current().cloned();
    Json(CurrentLesson { lesson })
}

#[derive(Debug, Deserialize)]
pub struct CompleteLessonRequest {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub notes: String,
}

pub async fn complete_lesson(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompleteLessonRequest>,
) -> ApiResult<Json<CompletedLesson>> {
    let mut lessons = lock(&state.lessons);
    let done = lessons
        .complete_lesson(req.success, &req.notes)
        .cloned()
        .ok_or_else(|| ApiError::NotFound("No lesson in progress".into()))?;
    Ok(Json(done))
}
