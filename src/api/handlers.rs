//! Route handlers. Each handler validates its input, then runs the storage
//! work on the blocking pool with a connection scoped to the request.

use crate::api::{run_blocking, AppState};
use crate::error::{AppError, Result};
use crate::models::bucket::BucketWithTransactions;
use crate::models::dashboard::DashboardBucket;
use crate::models::transaction::TransactionWithBucket;
use crate::operations::validation::{
    self, AssignmentPayload, BucketPayload, TransactionPayload,
};
use crate::operations::{bucket, dashboard, import, transaction};
use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub count: usize,
    pub transactions: Vec<TransactionWithBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

/// An empty body reads as `{}` so missing fields surface as field errors.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::invalid("body", format!("Invalid JSON: {}", e)))
}

pub async fn health() -> &'static str {
    "OK"
}

// ==================== Buckets ====================

pub async fn list_buckets(State(state): State<AppState>) -> Result<Json<Vec<BucketWithTransactions>>> {
    run_blocking(&state.store, bucket::list_buckets).await.map(Json)
}

pub async fn get_bucket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BucketWithTransactions>> {
    run_blocking(&state.store, move |conn| bucket::get_bucket(conn, &id))
        .await
        .map(Json)
}

pub async fn create_bucket(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<BucketWithTransactions>)> {
    let payload: BucketPayload = parse_body(&body)?;
    let input = validation::validate_new_bucket(&payload)?;

    let created = run_blocking(&state.store, move |conn| bucket::create_bucket(conn, input)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_bucket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<BucketWithTransactions>> {
    let payload: BucketPayload = parse_body(&body)?;
    let changes = validation::validate_bucket_changes(&payload)?;

    run_blocking(&state.store, move |conn| bucket::update_bucket(conn, &id, &changes))
        .await
        .map(Json)
}

pub async fn delete_bucket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    run_blocking(&state.store, move |conn| bucket::delete_bucket(conn, &id)).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ==================== Transactions ====================

pub async fn list_transactions(State(state): State<AppState>) -> Result<Json<Vec<TransactionWithBucket>>> {
    run_blocking(&state.store, transaction::list_transactions)
        .await
        .map(Json)
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionWithBucket>> {
    run_blocking(&state.store, move |conn| transaction::get_transaction(conn, &id))
        .await
        .map(Json)
}

pub async fn create_transaction(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<TransactionWithBucket>)> {
    let payload: TransactionPayload = parse_body(&body)?;
    let input = validation::validate_new_transaction(&payload)?;

    let created = run_blocking(&state.store, move |conn| transaction::create_transaction(conn, input)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Bucket (re)assignment. `bucketId` must be present; `null` unassigns.
pub async fn assign_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TransactionWithBucket>> {
    let payload: AssignmentPayload = parse_body(&body)?;
    let target = validation::validate_assignment(&payload)?;

    run_blocking(&state.store, move |conn| {
        transaction::assign_bucket(conn, &id, target.as_deref())
    })
    .await
    .map(Json)
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    run_blocking(&state.store, move |conn| transaction::delete_transaction(conn, &id)).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ==================== Dashboard & import ====================

pub async fn get_dashboard(State(state): State<AppState>) -> Result<Json<Vec<DashboardBucket>>> {
    let now = Local::now().naive_local();
    run_blocking(&state.store, move |conn| dashboard::build_dashboard(conn, now))
        .await
        .map(Json)
}

/// Imports the multipart field `file`. A rejected statement answers 400 with
/// the row errors and nothing persisted.
pub async fn upload_statement(State(state): State<AppState>, mut multipart: Multipart) -> Result<Response> {
    let mut contents = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid("file", e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::invalid("file", e.to_string()))?;
        contents = Some(String::from_utf8_lossy(&bytes).into_owned());
    }

    let text = contents.ok_or_else(|| AppError::invalid("file", "No file uploaded"))?;

    match run_blocking(&state.store, move |conn| import::import_statement(conn, &text)).await {
        Ok(transactions) => Ok(Json(UploadResponse {
            success: true,
            count: transactions.len(),
            transactions,
            errors: None,
        })
        .into_response()),
        Err(AppError::StatementParse(errors)) => Ok((
            StatusCode::BAD_REQUEST,
            Json(UploadResponse {
                success: false,
                count: 0,
                transactions: Vec::new(),
                errors: Some(errors),
            }),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}
