// src/handlers/results.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    error::AppError,
    handlers::csv_download,
    models::result::ResultSummary,
    quiz::{catalog::Catalog, intent::IntentBook, ledger::Ledger},
    store::Store,
};

/// Lists results, most recent first.
/// Admin only.
pub async fn list_results(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let ledger = Ledger::load(&store).await?;
    let rows: Vec<ResultSummary> = ledger
        .list()
        .iter()
        .map(|(index, result)| ResultSummary::new(index, result))
        .collect();

    Ok(Json(rows))
}

/// Dashboard counters: attempts, average percentage, pass rate.
/// Admin only.
pub async fn results_stats(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let ledger = Ledger::load(&store).await?;
    Ok(Json(ledger.aggregate()))
}

/// Question-by-question breakdown of one result.
/// Admin only.
pub async fn result_detail(
    State(store): State<Store>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, AppError> {
    let ledger = Ledger::load(&store).await?;
    let catalog = Catalog::load(&store).await?;

    Ok(Json(ledger.detail(index, &catalog)?))
}

/// Downloads all results as CSV.
/// Admin only.
pub async fn export_results(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let ledger = Ledger::load(&store).await?;
    if ledger.is_empty() {
        return Err(AppError::NotFound("No results to export".to_string()));
    }

    let filename = format!("quiz_results_{}.csv", Utc::now().format("%Y-%m-%d"));
    Ok(csv_download(&filename, ledger.export_csv()?))
}

/// First step of deleting one result.
/// Admin only.
pub async fn request_result_delete(
    State(store): State<Store>,
    State(intents): State<IntentBook>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, AppError> {
    let ledger = Ledger::load(&store).await?;
    let intent = ledger.request_remove(index)?;

    Ok((StatusCode::ACCEPTED, Json(intents.issue(intent).await)))
}

/// First step of deleting every result.
/// Admin only.
pub async fn request_results_clear(
    State(store): State<Store>,
    State(intents): State<IntentBook>,
) -> Result<impl IntoResponse, AppError> {
    let ledger = Ledger::load(&store).await?;
    let intent = ledger.request_clear()?;

    Ok((StatusCode::ACCEPTED, Json(intents.issue(intent).await)))
}
