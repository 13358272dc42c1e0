use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubmittedAnswer {
    pub question_id: String,
    pub values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub correct: bool,
    pub points_awarded: u32,
    pub points_possible: u32,
}

/// A scored submission. Records are append-only: once stored they are never updated.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub learner_id: String,
    pub quiz_id: String,
    pub ordinal: u32,
    pub answers: Vec<SubmittedAnswer>,
    pub results: Vec<QuestionResult>,
    pub points_awarded: u32,
    pub points_possible: u32,
    pub score: f64,
    pub passed: bool,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
}
