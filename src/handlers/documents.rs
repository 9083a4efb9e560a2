use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use super::SessionId;
use crate::{
    errors::ServiceError, services::invoices::InvoiceCreated, ubl::ValidationOutcome, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateRequest {
    /// UBL Invoice XML
    pub invoice: String,
}

/// Ingest an order document
///
/// Accepts a UBL Order (or Invoice) as `application/xml`, or the equivalent
/// JSON object, stores it as an order and derives an invoice from it.
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    request_body(content = String, description = "UBL XML or JSON trade document", content_type = "application/xml"),
    params(("x-session-id" = String, Header, description = "Session id")),
    responses(
        (status = 201, description = "Order stored and invoice created", body = InvoiceCreated),
        (status = 400, description = "Malformed document or invalid field", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unknown session", body = crate::errors::ErrorResponse),
        (status = 409, description = "SalesOrderID already exists", body = crate::errors::ErrorResponse),
        (status = 500, description = "Database failure", body = crate::errors::ErrorResponse)
    ),
    tag = "documents"
)]
pub async fn ingest_document(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<InvoiceCreated>), ServiceError> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

    let created = state
        .services
        .ingestion
        .ingest(&body, content_type, &session_id)
        .await?;

    info!(invoice_id = created.invoice_id, "Document accepted");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Validate a UBL invoice
///
/// Runs the structural and business-rule checks. Always answers 200; the
/// outcome says whether the invoice passed. A body that is not a JSON object
/// with an `invoice` string is reported as a failed outcome.
#[utoipa::path(
    post,
    path = "/api/v1/documents/validate",
    request_body = ValidateRequest,
    responses(
        (status = 200, description = "Validation outcome", body = ValidationOutcome)
    ),
    tag = "documents"
)]
pub async fn validate_document(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Json<ValidationOutcome> {
    match payload {
        Ok(Json(request)) => Json(state.services.validator.validate(&request.invoice)),
        Err(rejection) => Json(ValidationOutcome::invalid(rejection.body_text())),
    }
}
