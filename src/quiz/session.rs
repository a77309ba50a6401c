// src/quiz/session.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::OPTION_COUNT,
    error::AppError,
    models::{
        question::{PublicQuestion, QuizSet},
        result::QuizResult,
        session::{SessionPhase, SessionView},
    },
};

/// The person taking the quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taker {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress { position: usize },
    Completed,
}

/// One taker's attempt at a fixed sequence of questions.
#[derive(Debug, Clone)]
pub struct QuizSession {
    id: Uuid,
    taker: Taker,
    quiz: QuizSet,
    answers: Vec<Option<usize>>,
    state: SessionState,
}

/// Round-half-up percentage computed without floating point.
pub fn percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((score * 200 + total) / (total * 2)) as u32
}

impl QuizSession {
    pub fn new(taker: Taker) -> Self {
        Self {
            id: Uuid::new_v4(),
            taker,
            quiz: QuizSet::new(""),
            answers: Vec::new(),
            state: SessionState::NotStarted,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    /// Binds the session to a quiz and moves to the first question.
    pub fn start(&mut self, quiz: QuizSet) -> Result<(), AppError> {
        if self.state != SessionState::NotStarted {
            return Err(AppError::PreconditionFailed("Quiz already started".to_string()));
        }
        if quiz.is_empty() {
            return Err(AppError::PreconditionFailed(
                "No quiz questions are available".to_string(),
            ));
        }

        self.answers = vec![None; quiz.len()];
        self.quiz = quiz;
        self.state = SessionState::InProgress { position: 0 };
        Ok(())
    }

    fn position(&self) -> Result<usize, AppError> {
        match self.state {
            SessionState::InProgress { position } => Ok(position),
            SessionState::NotStarted => {
                Err(AppError::PreconditionFailed("Quiz has not started".to_string()))
            }
            SessionState::Completed => Err(AppError::PreconditionFailed(
                "Quiz has already been submitted".to_string(),
            )),
        }
    }

    /// Records (or replaces) the answer for the current question.
    pub fn select_answer(&mut self, option: usize) -> Result<(), AppError> {
        let position = self.position()?;
        if option >= OPTION_COUNT {
            return Err(AppError::BadRequest(format!(
                "Option {} is out of range 0..={}",
                option,
                OPTION_COUNT - 1
            )));
        }

        self.answers[position] = Some(option);
        Ok(())
    }

    /// Moves to the next question; stays put on the last one.
    pub fn advance(&mut self) -> Result<usize, AppError> {
        let position = self.position()?;
        let next = (position + 1).min(self.quiz.len() - 1);
        self.state = SessionState::InProgress { position: next };
        Ok(next)
    }

    /// Moves to the previous question; stays put on the first one.
    pub fn retreat(&mut self) -> Result<usize, AppError> {
        let position = self.position()?;
        let prev = position.saturating_sub(1);
        self.state = SessionState::InProgress { position: prev };
        Ok(prev)
    }

    /// Scores the attempt and closes the session.
    ///
    /// Only allowed from the last question. Skipped questions count as wrong.
    pub fn submit(&mut self) -> Result<QuizResult, AppError> {
        let position = self.position()?;
        let total = self.quiz.len();
        if position + 1 != total {
            return Err(AppError::PreconditionFailed(
                "Quiz can only be submitted from the last question".to_string(),
            ));
        }

        let score = self
            .quiz
            .questions
            .iter()
            .zip(&self.answers)
            .filter(|(question, answer)| **answer == Some(question.correct))
            .count();

        self.state = SessionState::Completed;

        Ok(QuizResult {
            taker_id: self.taker.id.clone(),
            taker_name: self.taker.name.clone(),
            score,
            total,
            percentage: percentage(score, total),
            answers: self.answers.clone(),
            quiz: self.quiz.name.clone(),
            timestamp: Utc::now(),
            quiz_snapshot: Some(self.quiz.questions.clone()),
        })
    }

    pub fn view(&self) -> SessionView {
        let (phase, position) = match self.state {
            SessionState::NotStarted => (SessionPhase::NotStarted, 0),
            SessionState::InProgress { position } => (SessionPhase::InProgress, position),
            SessionState::Completed => (SessionPhase::Completed, self.quiz.len().saturating_sub(1)),
        };
        let question = match self.state {
            SessionState::InProgress { position } => self
                .quiz
                .questions
                .get(position)
                .map(|q| PublicQuestion::from_question(position, q)),
            _ => None,
        };

        SessionView {
            session_id: self.id,
            taker_id: self.taker.id.clone(),
            taker_name: self.taker.name.clone(),
            quiz: self.quiz.name.clone(),
            phase,
            position,
            total: self.quiz.len(),
            answered: self.answers.iter().filter(|a| a.is_some()).count(),
            is_first: position == 0,
            is_last: position + 1 >= self.quiz.len(),
            question,
            selected: self.answers.get(position).copied().flatten(),
        }
    }
}

struct SessionEntry {
    session: QuizSession,
    expires_at: DateTime<Utc>,
}

/// Live sessions keyed by id. Dropping an entry abandons the attempt.
///
/// Sessions idle for longer than the TTL are evicted, the same way a
/// closed browser tab discards an attempt.
#[derive(Clone)]
pub struct SessionBook {
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    ttl: Duration,
}

impl SessionBook {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::minutes(30))
    }

    pub async fn insert(&self, session: QuizSession) {
        let now = Utc::now();
        let entry = SessionEntry {
            expires_at: self.expiry_from(now),
            session,
        };

        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, e| e.expires_at > now);
        if sessions.len() < before {
            tracing::debug!("Evicted {} idle sessions", before - sessions.len());
        }
        sessions.insert(entry.session.id(), entry);
    }

    /// Runs `f` against the session, returning its output. Touching a
    /// session extends its lifetime.
    pub async fn with<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut QuizSession) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let expired = match sessions.get(&id) {
            Some(entry) => entry.expires_at <= now,
            None => return Err(AppError::NotFound("Quiz session not found".to_string())),
        };
        if expired {
            sessions.remove(&id);
            return Err(AppError::NotFound("Quiz session has expired".to_string()));
        }

        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Quiz session not found".to_string()))?;
        entry.expires_at = self.expiry_from(now);
        f(&mut entry.session)
    }

    /// Removes a live session so the caller owns it exclusively.
    pub async fn take(&self, id: Uuid) -> Result<QuizSession, AppError> {
        let entry = self
            .sessions
            .lock()
            .await
            .remove(&id)
            .ok_or_else(|| AppError::NotFound("Quiz session not found".to_string()))?;

        if entry.expires_at <= Utc::now() {
            return Err(AppError::NotFound("Quiz session has expired".to_string()));
        }
        Ok(entry.session)
    }

    pub async fn remove(&self, id: Uuid) -> Option<QuizSession> {
        self.sessions.lock().await.remove(&id).map(|e| e.session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Question;

    fn quiz(correct: &[usize]) -> QuizSet {
        QuizSet {
            name: "Safety".to_string(),
            questions: correct
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    Question::new(
                        format!("Q{}", i + 1),
                        ["a", "b", "c", "d"].map(str::to_string),
                        *c,
                        "Safety",
                    )
                    .unwrap()
                })
                .collect(),
        }
    }

    fn started(correct: &[usize]) -> QuizSession {
        let mut session = QuizSession::new(Taker {
            id: "E001".to_string(),
            name: "Ada".to_string(),
        });
        session.start(quiz(correct)).unwrap();
        session
    }

    #[test]
    fn scores_worked_example() {
        let mut session = started(&[0, 2, 2]);
        session.select_answer(0).unwrap();
        session.advance().unwrap();
        session.advance().unwrap();
        session.select_answer(2).unwrap();

        let result = session.submit().unwrap();
        assert_eq!(result.answers, vec![Some(0), None, Some(2)]);
        assert_eq!(result.score, 2);
        assert_eq!(result.total, 3);
        assert_eq!(result.percentage, 67);
        assert_eq!(result.quiz, "Safety");
        assert_eq!(result.quiz_snapshot.as_ref().map(Vec::len), Some(3));
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(0, 5), 0);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn start_rejects_empty_quiz() {
        let mut session = QuizSession::new(Taker {
            id: "E001".to_string(),
            name: "Ada".to_string(),
        });
        assert!(matches!(
            session.start(QuizSet::new("Empty")),
            Err(AppError::PreconditionFailed(_))
        ));
        assert_eq!(session.state(), SessionState::NotStarted);
    }

    #[test]
    fn answers_require_in_progress_state() {
        let mut session = QuizSession::new(Taker {
            id: "E001".to_string(),
            name: "Ada".to_string(),
        });
        assert!(session.select_answer(0).is_err());
        assert!(session.advance().is_err());
    }

    #[test]
    fn navigation_stops_at_boundaries() {
        let mut session = started(&[0, 1]);
        assert_eq!(session.retreat().unwrap(), 0);
        assert_eq!(session.advance().unwrap(), 1);
        assert_eq!(session.advance().unwrap(), 1);
        assert_eq!(session.retreat().unwrap(), 0);
    }

    #[test]
    fn changing_an_answer_overwrites_the_slot() {
        let mut session = started(&[3]);
        session.select_answer(1).unwrap();
        session.select_answer(3).unwrap();
        assert_eq!(session.answers(), &[Some(3)]);
        assert_eq!(session.submit().unwrap().score, 1);
    }

    #[test]
    fn out_of_range_option_is_rejected() {
        let mut session = started(&[0]);
        assert!(matches!(session.select_answer(4), Err(AppError::BadRequest(_))));
        assert_eq!(session.answers(), &[None]);
    }

    #[test]
    fn submit_only_from_last_question() {
        let mut session = started(&[0, 1]);
        assert!(matches!(session.submit(), Err(AppError::PreconditionFailed(_))));
        session.advance().unwrap();
        let result = session.submit().unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.percentage, 0);
        assert!(session.submit().is_err());
    }

    #[test]
    fn view_hides_answers_and_tracks_progress() {
        let mut session = started(&[0, 1, 2]);
        session.select_answer(2).unwrap();
        let view = session.view();
        assert_eq!(view.phase, SessionPhase::InProgress);
        assert_eq!(view.total, 3);
        assert_eq!(view.answered, 1);
        assert_eq!(view.selected, Some(2));
        assert!(view.is_first);
        assert!(!view.is_last);
        assert_eq!(view.question.map(|q| q.number), Some(1));
    }

    #[tokio::test]
    async fn book_reports_unknown_sessions() {
        let book = SessionBook::new(Duration::from_secs(60));
        let outcome = book.with(Uuid::new_v4(), |s| s.advance()).await;
        assert!(matches!(outcome, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let book = SessionBook::new(Duration::ZERO);
        let idle = started(&[0]);
        let idle_id = idle.id();
        book.insert(idle).await;

        book.insert(started(&[1])).await;
        assert_eq!(book.len().await, 1);
        assert!(matches!(
            book.with(idle_id, |s| Ok(s.view())).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn touched_sessions_stay_live() {
        let book = SessionBook::new(Duration::from_secs(60));
        let session = started(&[0, 1]);
        let id = session.id();
        book.insert(session).await;
        book.insert(started(&[2])).await;

        assert_eq!(book.with(id, |s| s.advance()).await.unwrap(), 1);
        assert_eq!(book.len().await, 2);

        let taken = book.take(id).await.unwrap();
        assert_eq!(taken.id(), id);
        assert!(matches!(book.take(id).await, Err(AppError::NotFound(_))));
    }
}
