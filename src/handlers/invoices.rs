use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use super::{CurrentSession, DeletedResponse, MessageResponse};
use crate::{
    errors::ServiceError,
    services::invoices::{InvoiceFieldUpdate, InvoiceSummary, InvoiceWithItems},
    AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct BuyerQuery {
    /// Buyer party name
    pub buyer: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInvoiceRequest {
    /// Only `payableAmount` is accepted
    pub field: String,
    #[schema(value_type = String)]
    pub value: Value,
}

/// List invoices by buyer name
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    params(BuyerQuery, ("x-session-id" = String, Header, description = "Session id")),
    responses(
        (status = 200, description = "Invoices for the buyer", body = [InvoiceSummary]),
        (status = 400, description = "Missing buyer", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unknown session", body = crate::errors::ErrorResponse),
        (status = 404, description = "No invoices for the buyer", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    _session: CurrentSession,
    Query(query): Query<BuyerQuery>,
) -> Result<Json<Vec<InvoiceSummary>>, ServiceError> {
    let buyer = query
        .buyer
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| ServiceError::invalid_field("buyer", "query parameter is required"))?;

    let invoices = state
        .services
        .invoices
        .get_invoices_by_buyer_name(buyer.trim())
        .await?;
    Ok(Json(invoices))
}

/// Get an invoice with its items
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    params(("id" = i32, Path, description = "Invoice id"), ("x-session-id" = String, Header, description = "Session id")),
    responses(
        (status = 200, description = "Invoice found", body = InvoiceWithItems),
        (status = 401, description = "Unknown session", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    _session: CurrentSession,
    Path(invoice_id): Path<i32>,
) -> Result<Json<InvoiceWithItems>, ServiceError> {
    let invoice = state.services.invoices.get_invoice_by_id(invoice_id).await?;
    Ok(Json(invoice))
}

/// Update a single invoice field
#[utoipa::path(
    patch,
    path = "/api/v1/invoices/{id}",
    request_body = UpdateInvoiceRequest,
    params(("id" = i32, Path, description = "Invoice id"), ("x-session-id" = String, Header, description = "Session id")),
    responses(
        (status = 200, description = "Invoice updated", body = MessageResponse),
        (status = 400, description = "Field not updatable or invalid value", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unknown session", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    _session: CurrentSession,
    Path(invoice_id): Path<i32>,
    payload: Result<Json<UpdateInvoiceRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ServiceError> {
    let Json(request) =
        payload.map_err(|rejection| ServiceError::invalid_field("body", rejection.body_text()))?;
    let value = match &request.value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(ServiceError::invalid_field(
                request.field.as_str(),
                "value must be a string or a number",
            ))
        }
    };
    let update = InvoiceFieldUpdate::parse(&request.field, &value)?;

    state
        .services
        .invoices
        .update_invoice_field(invoice_id, update)
        .await?;
    Ok(Json(MessageResponse {
        message: "Invoice updated successfully.".to_string(),
    }))
}

/// Delete an invoice and its items
#[utoipa::path(
    delete,
    path = "/api/v1/invoices/{id}",
    params(("id" = i32, Path, description = "Invoice id"), ("x-session-id" = String, Header, description = "Session id")),
    responses(
        (status = 200, description = "Invoice deleted", body = DeletedResponse),
        (status = 401, description = "Unknown session", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn delete_invoice(
    State(state): State<AppState>,
    _session: CurrentSession,
    Path(invoice_id): Path<i32>,
) -> Result<Json<DeletedResponse>, ServiceError> {
    state.services.invoices.delete_invoice_by_id(invoice_id).await?;
    Ok(Json(DeletedResponse {
        success: true,
        message: format!("Invoice {} deleted", invoice_id),
    }))
}

/// Export an invoice as UBL XML
///
/// The supplier party is the company of the calling session.
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}/xml",
    params(("id" = i32, Path, description = "Invoice id"), ("x-session-id" = String, Header, description = "Session id")),
    responses(
        (status = 200, description = "UBL Invoice document", body = String, content_type = "application/xml"),
        (status = 401, description = "Unknown session", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn get_invoice_xml(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(invoice_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let xml = state
        .services
        .invoices
        .invoice_xml(invoice_id, &session.company_name)
        .await?;
    Ok(([(CONTENT_TYPE, "application/xml")], xml))
}
