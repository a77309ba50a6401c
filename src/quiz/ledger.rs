// src/quiz/ledger.rs

use crate::{
    config::PASS_THRESHOLD,
    error::AppError,
    models::{
        question::Question,
        result::{
            AnswerStatus, DetailRow, LedgerStats, QuestionSource, QuizResult, ResultDetail,
            ResultSummary,
        },
    },
    quiz::{catalog::Catalog, intent::DeleteIntent, tabular},
    store::{Store, StoreKey},
};

/// Append-only history of completed attempts.
///
/// The whole sequence is rewritten on every save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    results: Vec<QuizResult>,
}

/// Results ordered newest first. Iterate as many times as needed.
pub struct ResultsView<'a> {
    results: &'a [QuizResult],
    order: Vec<usize>,
}

impl<'a> ResultsView<'a> {
    fn new(results: &'a [QuizResult]) -> Self {
        let mut order: Vec<usize> = (0..results.len()).collect();
        // stable: equal timestamps keep insertion order
        order.sort_by(|a, b| results[*b].timestamp.cmp(&results[*a].timestamp));
        Self { results, order }
    }

    /// Yields `(ledger index, result)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a QuizResult)> + '_ {
        let results = self.results;
        self.order.iter().map(move |&i| (i, &results[i]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Ledger {
    pub fn from_results(results: Vec<QuizResult>) -> Self {
        Self { results }
    }

    pub async fn load(store: &Store) -> Result<Self, AppError> {
        let results = store.load(StoreKey::AllQuizResults).await?.unwrap_or_default();
        Ok(Self { results })
    }

    pub async fn save(&self, store: &Store) -> Result<(), AppError> {
        if self.results.is_empty() {
            store.remove(StoreKey::AllQuizResults).await
        } else {
            store.save(StoreKey::AllQuizResults, &self.results).await
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&QuizResult, AppError> {
        self.results
            .get(index)
            .ok_or_else(|| AppError::NotFound(format!("Result {} not found", index)))
    }

    pub fn append(&mut self, result: QuizResult) -> usize {
        tracing::info!("Result saved for {} in quiz {}", result.taker_name, result.quiz);
        self.results.push(result);
        self.results.len() - 1
    }

    pub fn list(&self) -> ResultsView<'_> {
        ResultsView::new(&self.results)
    }

    pub fn aggregate(&self) -> LedgerStats {
        let total_attempts = self.results.len();
        if total_attempts == 0 {
            return LedgerStats {
                total_attempts: 0,
                average_percentage: 0.0,
                pass_count: 0,
                pass_rate: 0.0,
            };
        }

        let sum: u64 = self.results.iter().map(|r| u64::from(r.percentage)).sum();
        let pass_count = self
            .results
            .iter()
            .filter(|r| r.percentage >= PASS_THRESHOLD)
            .count();

        LedgerStats {
            total_attempts,
            average_percentage: sum as f64 / total_attempts as f64,
            pass_count,
            pass_rate: pass_count as f64 / total_attempts as f64,
        }
    }

    pub fn request_remove(&self, index: usize) -> Result<DeleteIntent, AppError> {
        let result = self.get(index)?;
        Ok(DeleteIntent::Result {
            index,
            taker_id: result.taker_id.clone(),
            timestamp: result.timestamp,
        })
    }

    pub fn request_clear(&self) -> Result<DeleteIntent, AppError> {
        if self.results.is_empty() {
            return Err(AppError::BadRequest("There are no results to delete".to_string()));
        }
        Ok(DeleteIntent::AllResults {
            count: self.results.len(),
        })
    }

    /// Applies a confirmed removal, returning how many entries went away.
    ///
    /// Intents whose target moved since they were issued are refused.
    pub fn confirm(&mut self, intent: &DeleteIntent) -> Result<usize, AppError> {
        match intent {
            DeleteIntent::Result {
                index,
                taker_id,
                timestamp,
            } => {
                let unchanged = self
                    .results
                    .get(*index)
                    .is_some_and(|r| &r.taker_id == taker_id && r.timestamp == *timestamp);
                if !unchanged {
                    return Err(AppError::Conflict(
                        "Result changed since the delete was requested".to_string(),
                    ));
                }
                self.results.remove(*index);
                Ok(1)
            }
            DeleteIntent::AllResults { count } => {
                if *count != self.results.len() {
                    return Err(AppError::Conflict(
                        "Results changed since the delete was requested".to_string(),
                    ));
                }
                self.results.clear();
                Ok(*count)
            }
            DeleteIntent::Category { .. } => {
                Err(AppError::BadRequest("Not a result deletion request".to_string()))
            }
        }
    }

    /// Per-question breakdown of one attempt.
    ///
    /// Questions come from the snapshot stored with the result, else from
    /// the live category of the same name. Slots with no recoverable
    /// question are reported as unavailable.
    pub fn detail(&self, index: usize, catalog: &Catalog) -> Result<ResultDetail, AppError> {
        let result = self.get(index)?;

        let (source, questions): (QuestionSource, &[Question]) = match &result.quiz_snapshot {
            Some(snapshot) => (QuestionSource::Snapshot, snapshot.as_slice()),
            None => match catalog.get(&result.quiz) {
                Some(set) => (QuestionSource::LiveCategory, set.questions.as_slice()),
                None => (QuestionSource::Missing, &[][..]),
            },
        };
        if source == QuestionSource::Missing {
            tracing::warn!(
                "Quiz '{}' for result {} is gone; detail shows unavailable rows",
                result.quiz,
                index
            );
        }

        let rows = result
            .answers
            .iter()
            .enumerate()
            .map(|(i, answer)| detail_row(i, *answer, questions.get(i)))
            .collect();

        Ok(ResultDetail {
            summary: ResultSummary::new(index, result),
            source,
            rows,
        })
    }

    pub fn export_csv(&self) -> Result<String, AppError> {
        tabular::write_results_csv(self.list().iter().map(|(_, r)| r))
    }
}

fn detail_row(i: usize, selected: Option<usize>, question: Option<&Question>) -> DetailRow {
    let Some(question) = question else {
        return DetailRow {
            number: i + 1,
            question: None,
            selected,
            selected_text: None,
            correct_index: None,
            correct_text: None,
            status: AnswerStatus::Unavailable,
        };
    };

    let status = match selected {
        None => AnswerStatus::Skipped,
        Some(s) if s == question.correct => AnswerStatus::Correct,
        Some(_) => AnswerStatus::Incorrect,
    };

    DetailRow {
        number: i + 1,
        question: Some(question.text.clone()),
        selected,
        selected_text: selected.and_then(|s| question.options.get(s).cloned()),
        correct_index: Some(question.correct),
        correct_text: question.correct_text().map(str::to_string),
        status,
    }
}
