use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Row of the quiz listing; questions are counted, not loaded.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub id: i64,
    pub subject: String,
    pub created_at: DateTime<Utc>,
    pub creator_id: Option<i64>,
    pub question_count: i64,
}

/// A quiz with its questions and choices in display order.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizDocument {
    pub id: i64,
    pub subject: String,
    pub created_at: DateTime<Utc>,
    pub creator: Option<User>,
    pub questions: Vec<QuestionDocument>,
    pub question_count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct QuestionDocument {
    pub id: i64,
    pub text: String,
    pub choices: Vec<ChoiceDocument>,
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct ChoiceDocument {
    pub id: i64,
    pub text: String,
    pub correct: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub position: i64,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub position: i64,
    pub text: String,
    #[sqlx(rename = "is_correct")]
    pub correct: bool,
}

impl From<Choice> for ChoiceDocument {
    fn from(choice: Choice) -> Self {
        ChoiceDocument {
            id: choice.id,
            text: choice.text,
            correct: choice.correct,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: Option<i64>,
    pub user_id: Option<i64>,
    pub started_at: DateTime<Utc>,
}

/// Fixes the position at which a question was presented during an attempt.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttemptQuestion {
    pub sequence_number: i64,
    pub question_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserChoice {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: Option<i64>,
    pub choice_id: Option<i64>,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttemptDocument {
    pub id: i64,
    pub quiz_id: Option<i64>,
    pub user_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub questions: Vec<AttemptQuestion>,
    pub user_choices: Vec<UserChoice>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    pub subject: String,
    pub creator_id: Option<i64>,
    pub question_count: u32,
    pub choice_count: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptRequest {
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    pub choice_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    pub correct: bool,
    pub message: String,
}

const DEFAULT_PER_PAGE: u32 = 10;
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PaginationParams {
    /// `(limit, offset)` for SQL, with `page` starting at 1.
    pub fn limit_offset(&self) -> (i64, i64) {
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        let page = self.page.unwrap_or(1).max(1);
        let offset = i64::from(page - 1) * i64::from(per_page);
        (i64::from(per_page), offset)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ShuffleParams {
    /// Randomize question order for presentation.
    pub shuffle: Option<bool>,
}
