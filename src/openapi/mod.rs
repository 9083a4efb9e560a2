use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::{
    errors::ErrorResponse,
    handlers::{
        self,
        documents::ValidateRequest,
        health::HealthResponse,
        invoices::UpdateInvoiceRequest,
        DeletedResponse, MessageResponse,
    },
    services::{
        invoices::{InvoiceCreated, InvoiceSummary, InvoiceWithItems},
        orders::{LineItem, OrderWithItems},
    },
    ubl::ValidationOutcome,
    AppState,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "UBL Invoice API",
        version = "0.1.0",
        description = r#"
Ingests UBL Order documents (XML or JSON), stores them as orders, derives
invoices and exports those invoices as UBL 2.1 Invoice XML.

Every endpoint except `/documents/validate` and `/health` requires an
`x-session-id` header naming a known session.

Errors are returned as `{"error": "<message>"}`.
"#
    ),
    paths(
        handlers::documents::ingest_document,
        handlers::documents::validate_document,
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::update_invoice,
        handlers::invoices::delete_invoice,
        handlers::invoices::get_invoice_xml,
        handlers::orders::list_order_ids,
        handlers::orders::get_order,
        handlers::orders::delete_order,
        handlers::health::health,
    ),
    components(schemas(
        ErrorResponse,
        ValidateRequest,
        ValidationOutcome,
        InvoiceCreated,
        InvoiceWithItems,
        InvoiceSummary,
        UpdateInvoiceRequest,
        LineItem,
        OrderWithItems,
        DeletedResponse,
        MessageResponse,
        HealthResponse,
    )),
    tags(
        (name = "documents", description = "Document ingestion and validation"),
        (name = "invoices", description = "Stored invoices and UBL export"),
        (name = "orders", description = "Stored orders"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document.
pub fn openapi_routes() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
