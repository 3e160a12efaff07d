//! Anthropic Messages API client for the coach

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::lesson::{extract_lesson_json, strip_lesson, LessonPlan};
use super::prompt::{build_system_prompt, BoardContext};
use crate::error::{Error, Result};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Suggested action attached to a reply that carries a lesson plan
pub const START_LESSON_ACTION: &str = "start_lesson";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// The coach's answer, with any lesson plan split out of the text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachReply {
    pub message: String,
    pub suggested_action: Option<String>,
    pub lesson: Option<LessonPlan>,
}

impl CoachReply {
    /// Splits raw model text into the visible message and a lesson plan.
    /// A malformed plan is dropped and the message kept.
    pub fn from_text(text: &str) -> Self {
        let lesson = extract_lesson_json(text).and_then(|value| match LessonPlan::from_json(value) {
            Ok(plan) => Some(plan),
            Err(e) => {
                warn!("discarding malformed lesson plan: {}", e);
                None
            }
        });

        Self {
            message: strip_lesson(text).to_string(),
            suggested_action: lesson.as_ref().map(|_| START_LESSON_ACTION.to_string()),
            lesson,
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

pub struct CoachClient {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl CoachClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::Coach("API key is not a valid header value".into()))?;
        headers.insert("x-api-key", key);
        Ok(headers)
    }

    /// Sends the student's message with the conversation so far
    pub async fn chat(
        &self,
        message: &str,
        history: &[ChatMessage],
        board_context: Option<&BoardContext>,
    ) -> Result<CoachReply> {
        let system = build_system_prompt(board_context, None, None);
        self.chat_with_system(message, history, &system).await
    }

    /// Same as `chat` with a caller-built system prompt
    pub async fn chat_with_system(
        &self,
        message: &str,
        history: &[ChatMessage],
        system: &str,
    ) -> Result<CoachReply> {
        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(message));

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages,
        };
        debug!(model = %self.model, turns = body.messages.len(), "coach request");

        let response = self
            .client
            .post(MESSAGES_URL)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Coach(format!(
                "API error: {} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let reply: MessagesResponse = response.json().await?;
        let text = reply.text();
        if text.is_empty() {
            return Err(Error::Coach("empty reply from model".into()));
        }

        Ok(CoachReply::from_text(&text))
    }
}
