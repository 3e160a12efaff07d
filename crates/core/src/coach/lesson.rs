//! Lesson plans proposed by the coach

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::Result;
use crate::patterns::PlayerColor;

/// Marker the model puts before a lesson plan object
pub const LESSON_MARKER: &str = "[LESSON_PLAN]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PracticeGame,
    PositionStudy,
    TacticsDrill,
    EndgamePractice,
    GameReview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonPosition {
    pub fen: String,
    pub instruction: String,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonActivity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default)]
    pub positions: Vec<LessonPosition>,
    /// Side the coach takes in a practice game
    #[serde(default)]
    pub coach_plays: Option<PlayerColor>,
    #[serde(default)]
    pub target_opening: Option<String>,
    #[serde(default)]
    pub pgn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReference {
    pub book: String,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub page_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonPlan {
    /// Assigned by `LessonManager`; anything the model sends is replaced
    #[serde(default)]
    pub id: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub source_reference: Option<SourceReference>,
    pub goals: Vec<String>,
    pub activity: LessonActivity,
    #[serde(default)]
    pub teaching_notes: Vec<String>,
    #[serde(default)]
    pub success_criteria: Option<String>,
}

impl LessonPlan {
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// A finished lesson and how it went
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedLesson {
    pub lesson: LessonPlan,
    pub success: bool,
    pub notes: String,
    pub completed_at: DateTime<Utc>,
}

/// Current lesson and history
#[derive(Debug, Default)]
pub struct LessonManager {
    current: Option<LessonPlan>,
    history: Vec<CompletedLesson>,
    counter: u32,
}

impl LessonManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self, now: DateTime<Utc>) -> String {
        self.counter += 1;
        format!("lesson_{}_{:03}", now.format("%Y%m%d"), self.counter)
    }

    /// Stamps `plan` with a fresh id and makes it the current lesson
    pub fn start_lesson(&mut self, plan: LessonPlan) -> &LessonPlan {
        self.start_lesson_at(plan, Utc::now())
    }

    fn start_lesson_at(&mut self, mut plan: LessonPlan, now: DateTime<Utc>) -> &LessonPlan {
        plan.id = self.next_id(now);
        plan.created_at = now;
        info!(id = %plan.id, topic = %plan.topic, "lesson started");
        self.current.insert(plan)
    }

    pub fn current(&self) -> Option<&LessonPlan> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &[CompletedLesson] {
        &self.history
    }

    /// Moves the current lesson into history. Returns None when no lesson
    /// is in progress.
    pub fn complete_lesson(&mut self, success: bool, notes: &str) -> Option<&CompletedLesson> {
        let lesson = self.current.take()?;
        info!(id = %lesson.id, success, "lesson completed");
        self.history.push(CompletedLesson {
            lesson,
            success,
            notes: notes.to_string(),
            completed_at: Utc::now(),
        });
        self.history.last()
    }
}

/// Pulls the JSON object that follows `[LESSON_PLAN]` out of a model reply.
/// Code fences around the object are tolerated.
pub fn extract_lesson_json(text: &str) -> Option<Value> {
    let (_, rest) = text.split_once(LESSON_MARKER)?;
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix("```json")
        .or_else(|| rest.strip_prefix("```"))
        .unwrap_or(rest);

    // Trailing text after the object, such as a closing fence, is ignored
    let start = rest.find('{')?;
    serde_json::Deserializer::from_str(&rest[start..])
        .into_iter::<Value>()
        .next()?
        .ok()
}

/// Text before the lesson marker, which is what the student sees
pub fn strip_lesson(text: &str) -> &str {
    text.split_once(LESSON_MARKER)
        .map_or(text, |(before, _)| before)
        .trim()
}
