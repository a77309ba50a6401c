// src/models/result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{config::PASS_THRESHOLD, models::question::Question};

/// Immutable record of a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub taker_id: String,
    pub taker_name: String,

    /// Number of correctly answered questions.
    pub score: usize,
    pub total: usize,
    pub percentage: u32,

    /// Selected option per question, `None` when skipped.
    pub answers: Vec<Option<usize>>,

    /// Name of the quiz set the attempt was taken against.
    pub quiz: String,
    pub timestamp: DateTime<Utc>,

    /// Questions as they were when the attempt was taken.
    /// Absent on records written before snapshots existed. A snapshot that
    /// no longer decodes is dropped rather than failing the whole ledger.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_snapshot"
    )]
    pub quiz_snapshot: Option<Vec<Question>>,
}

fn lenient_snapshot<'de, D>(deserializer: D) -> Result<Option<Vec<Question>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match serde_json::from_value(value) {
        Ok(questions) => Some(questions),
        Err(e) => {
            tracing::warn!("Discarding unreadable quiz snapshot: {}", e);
            None
        }
    }))
}

impl QuizResult {
    pub fn passed(&self) -> bool {
        self.percentage >= PASS_THRESHOLD
    }

    pub fn status_label(&self) -> &'static str {
        if self.passed() { "PASS" } else { "FAIL" }
    }
}

/// Listing row for the results dashboard.
#[derive(Debug, Serialize)]
pub struct ResultSummary {
    /// Position in the ledger; stable across listings.
    pub index: usize,
    pub taker_id: String,
    pub taker_name: String,
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    pub passed: bool,
    pub quiz: String,
    pub timestamp: DateTime<Utc>,
}

impl ResultSummary {
    pub fn new(index: usize, result: &QuizResult) -> Self {
        Self {
            index,
            taker_id: result.taker_id.clone(),
            taker_name: result.taker_name.clone(),
            score: result.score,
            total: result.total,
            percentage: result.percentage,
            passed: result.passed(),
            quiz: result.quiz.clone(),
            timestamp: result.timestamp,
        }
    }
}

/// Dashboard counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total_attempts: usize,
    pub average_percentage: f64,
    pub pass_count: usize,
    /// Fraction in `[0, 1]`.
    pub pass_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Correct,
    Incorrect,
    Skipped,
    /// The question behind this slot can no longer be found.
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailRow {
    pub number: usize,
    pub question: Option<String>,
    pub selected: Option<usize>,
    pub selected_text: Option<String>,
    pub correct_index: Option<usize>,
    pub correct_text: Option<String>,
    pub status: AnswerStatus,
}

/// Where the questions of a detail view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Snapshot,
    LiveCategory,
    Missing,
}

#[derive(Debug, Serialize)]
pub struct ResultDetail {
    #[serde(flatten)]
    pub summary: ResultSummary,
    pub source: QuestionSource,
    pub rows: Vec<DetailRow>,
}
