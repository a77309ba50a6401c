// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::{PublicQuestion, QuizSet},
        result::QuizResult,
        session::{AnswerRequest, StartSessionRequest, SubmitResponse},
    },
    quiz::{
        catalog::Catalog,
        ledger::Ledger,
        session::{QuizSession, SessionBook, Taker},
    },
    store::Store,
};

/// Reads the published active quiz, falling back to the built-in set.
async fn current_quiz(store: &Store) -> Result<QuizSet, AppError> {
    match Catalog::load_current(store).await? {
        Some(quiz) if !quiz.is_empty() => {
            tracing::debug!("Loaded quiz '{}' with {} questions", quiz.name, quiz.len());
            Ok(quiz)
        }
        _ => {
            tracing::warn!("No active quiz published, serving the built-in set");
            Ok(QuizSet::builtin())
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActiveQuizResponse {
    pub name: String,
    pub total: usize,
    pub questions: Vec<PublicQuestion>,
}

/// Returns the quiz new sessions will get, without answers.
pub async fn get_active_quiz(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let quiz = current_quiz(&store).await?;

    Ok(Json(ActiveQuizResponse {
        total: quiz.len(),
        questions: quiz
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| PublicQuestion::from_question(i, q))
            .collect(),
        name: quiz.name,
    }))
}

/// Logs a taker in and starts a session on the active quiz.
pub async fn start_session(
    State(store): State<Store>,
    State(sessions): State<SessionBook>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if payload.taker_id.trim().is_empty() || payload.taker_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Please enter both Employee ID and Name".to_string(),
        ));
    }

    let quiz = current_quiz(&store).await?;

    let mut session = QuizSession::new(Taker {
        id: payload.taker_id.trim().to_string(),
        name: payload.taker_name.trim().to_string(),
    });
    session.start(quiz)?;

    let view = session.view();
    tracing::info!(
        "Session {} started for {} on quiz '{}'",
        view.session_id,
        view.taker_id,
        view.quiz
    );
    sessions.insert(session).await;

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(sessions): State<SessionBook>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.with(id, |s| Ok(s.view())).await?;
    Ok(Json(view))
}

/// Abandons a session. Nothing about it is persisted.
pub async fn abandon_session(
    State(sessions): State<SessionBook>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    sessions
        .remove(id)
        .await
        .ok_or_else(|| AppError::NotFound("Quiz session not found".to_string()))?;
    tracing::info!("Session {} abandoned", id);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn select_answer(
    State(sessions): State<SessionBook>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions
        .with(id, |s| {
            s.select_answer(payload.option)?;
            Ok(s.view())
        })
        .await?;

    Ok(Json(view))
}

pub async fn next_question(
    State(sessions): State<SessionBook>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions
        .with(id, |s| {
            s.advance()?;
            Ok(s.view())
        })
        .await?;

    Ok(Json(view))
}

pub async fn previous_question(
    State(sessions): State<SessionBook>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions
        .with(id, |s| {
            s.retreat()?;
            Ok(s.view())
        })
        .await?;

    Ok(Json(view))
}

async fn record_result(store: &Store, result: &QuizResult) -> Result<(), AppError> {
    let _gate = store.write_gate().await;
    let mut ledger = Ledger::load(store).await?;
    ledger.append(result.clone());
    ledger.save(store).await
}

/// Scores the session and appends the result to the ledger.
///
/// The session leaves the book only once the result is stored; on any
/// failure it is put back unchanged so the taker can submit again.
pub async fn submit_session(
    State(store): State<Store>,
    State(sessions): State<SessionBook>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut session = sessions.take(id).await?;
    let pending = session.clone();

    let result = match session.submit() {
        Ok(result) => result,
        Err(err) => {
            sessions.insert(pending).await;
            return Err(err);
        }
    };
    if let Err(err) = record_result(&store, &result).await {
        tracing::error!("Failed to store result for session {}: {}", id, err);
        sessions.insert(pending).await;
        return Err(err);
    }

    Ok(Json(SubmitResponse {
        score: result.score,
        total: result.total,
        percentage: result.percentage,
        passed: result.passed(),
        message: "Quiz submitted successfully".to_string(),
    }))
}
