//! AI chess coach

mod client;
pub mod lesson;
mod prompt;

pub use client::{
    ChatMessage, ChatRole, CoachClient, CoachReply, DEFAULT_MODEL, START_LESSON_ACTION,
};
pub use lesson::{
    extract_lesson_json, ActivityKind, CompletedLesson, LessonActivity, LessonManager, LessonPlan,
    LessonPosition, SourceReference,
};
pub use prompt::{build_system_prompt, pattern_block, BoardContext};
