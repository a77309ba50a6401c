// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::csv_download,
    models::question::{CreateQuizSetRequest, Question, QuestionRequest},
    quiz::{
        catalog::{Catalog, ImportMode},
        intent::{DeleteIntent, IntentBook},
        ledger::Ledger,
        tabular::{HeaderMode, parse_questions_csv},
    },
    store::Store,
};

/// Lists every quiz set with its size and whether it is active.
/// Admin only.
pub async fn list_quizzes(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let catalog = Catalog::load(&store).await?;

    Ok(Json(serde_json::json!({
        "active": catalog.active_name(),
        "quizzes": catalog.summaries(),
    })))
}

/// Creates a new quiz set, optionally with questions.
/// Admin only.
pub async fn create_quiz(
    State(store): State<Store>,
    Json(payload): Json<CreateQuizSetRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let name = payload.name.trim().to_string();
    let questions = payload
        .questions
        .into_iter()
        .map(|q| q.into_question(&name))
        .collect::<Result<Vec<Question>, AppError>>()?;

    let _gate = store.write_gate().await;
    let mut catalog = Catalog::load(&store).await?;
    catalog.create_category(&name, questions)?;
    catalog.save(&store).await?;
    tracing::info!("Created quiz '{}'", name);

    Ok((StatusCode::CREATED, Json(serde_json::json!({"name": name}))))
}

/// Returns a quiz set with its answers.
/// Admin only.
pub async fn get_quiz(
    State(store): State<Store>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = Catalog::load(&store).await?;
    let set = catalog
        .get(&name)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Quiz '{}' not found", name)))?;

    Ok(Json(set))
}

/// Makes a quiz set the one served to takers.
/// Admin only.
pub async fn activate_quiz(
    State(store): State<Store>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let _gate = store.write_gate().await;
    let mut catalog = Catalog::load(&store).await?;

    if !catalog.set_active(&name) {
        tracing::warn!("Cannot activate quiz '{}': missing or empty", name);
        return Err(AppError::NotFound(format!(
            "Quiz '{}' not found or has no questions",
            name
        )));
    }
    catalog.save(&store).await?;
    tracing::info!("Activated quiz '{}'", name);

    Ok(Json(serde_json::json!({"active": name})))
}

/// Downloads a quiz set in the import CSV format.
/// Admin only.
pub async fn export_quiz(
    State(store): State<Store>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = Catalog::load(&store).await?;
    let csv = catalog.export_category(&name)?;

    Ok(csv_download(&format!("{}.csv", name), csv))
}

/// First step of deleting a quiz set: returns an intent to confirm.
/// Admin only.
pub async fn request_quiz_delete(
    State(store): State<Store>,
    State(intents): State<IntentBook>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = Catalog::load(&store).await?;
    let intent = catalog.request_delete_category(&name)?;

    Ok((StatusCode::ACCEPTED, Json(intents.issue(intent).await)))
}

/// Appends a question to a quiz set.
/// Admin only.
pub async fn add_question(
    State(store): State<Store>,
    Path(name): Path<String>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = payload.into_question(&name)?;

    let _gate = store.write_gate().await;
    let mut catalog = Catalog::load(&store).await?;
    let index = catalog.add_question(&name, question)?;
    catalog.save(&store).await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"index": index}))))
}

/// Replaces a question in place.
/// Admin only.
pub async fn update_question(
    State(store): State<Store>,
    Path((name, index)): Path<(String, usize)>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = payload.into_question(&name)?;

    let _gate = store.write_gate().await;
    let mut catalog = Catalog::load(&store).await?;
    catalog.update_question(&name, index, question)?;
    catalog.save(&store).await?;

    Ok(StatusCode::OK)
}

/// Removes a question from a quiz set.
/// Admin only.
pub async fn delete_question(
    State(store): State<Store>,
    Path((name, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let _gate = store.write_gate().await;
    let mut catalog = Catalog::load(&store).await?;
    catalog.remove_question(&name, index)?;
    catalog.save(&store).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    #[serde(default)]
    pub mode: ImportMode,
    #[serde(default)]
    pub strict: bool,
}

/// Imports questions from a CSV body.
///
/// Rows that fail validation are skipped and listed in the report.
/// Admin only.
pub async fn import_quizzes(
    State(store): State<Store>,
    Query(params): Query<ImportParams>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    let header_mode = if params.strict {
        HeaderMode::Strict
    } else {
        HeaderMode::Lenient
    };
    let rows = parse_questions_csv(&body, header_mode)?;

    let _gate = store.write_gate().await;
    let mut catalog = Catalog::load(&store).await?;
    let report = catalog.import_questions(rows, params.mode);
    catalog.save(&store).await?;

    Ok(Json(report))
}

/// Applies a pending delete intent.
/// Admin only.
pub async fn confirm_intent(
    State(store): State<Store>,
    State(intents): State<IntentBook>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let intent = intents.take(id).await?;

    let _gate = store.write_gate().await;
    let body = match &intent {
        DeleteIntent::Category { name } => {
            let mut catalog = Catalog::load(&store).await?;
            let active = catalog.confirm_delete_category(&intent)?;
            catalog.save(&store).await?;
            tracing::info!("Deleted quiz '{}'", name);
            serde_json::json!({"deleted": 1, "active": active})
        }
        DeleteIntent::Result { .. } | DeleteIntent::AllResults { .. } => {
            let mut ledger = Ledger::load(&store).await?;
            let removed = ledger.confirm(&intent)?;
            ledger.save(&store).await?;
            tracing::info!("Deleted {} result(s)", removed);
            serde_json::json!({"deleted": removed})
        }
    };

    Ok(Json(body))
}

/// Drops a pending delete intent without applying it.
/// Admin only.
pub async fn cancel_intent(
    State(intents): State<IntentBook>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !intents.cancel(id).await {
        return Err(AppError::NotFound("Delete request not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
