// src/models/session.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::question::PublicQuestion;

/// DTO for a taker logging in to start a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(length(min = 1, max = 50, message = "Employee ID is required."))]
    pub taker_id: String,
    #[validate(length(min = 1, max = 100, message = "Employee name is required."))]
    pub taker_name: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// 0-based option index.
    pub option: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    Completed,
}

/// What the taker sees for the current question.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub taker_id: String,
    pub taker_name: String,
    pub quiz: String,
    pub phase: SessionPhase,
    pub position: usize,
    pub total: usize,
    pub answered: usize,
    pub is_first: bool,
    pub is_last: bool,
    pub question: Option<PublicQuestion>,
    pub selected: Option<usize>,
}

/// Returned to the taker after submitting.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    pub passed: bool,
    pub message: String,
}
