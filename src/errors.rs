use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::error;
use utoipa::ToSchema;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "error": "Invoice 42 not found" }))]
pub struct ErrorResponse {
    /// Human-readable error description
    pub error: String,
}

/// Step of a database interaction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DbStage {
    Connect,
    Migrate,
    Begin,
    Query,
    InsertOrder,
    InsertOrderItem,
    InsertInvoice,
    InsertInvoiceItem,
    Update,
    Delete,
    Commit,
}

impl fmt::Display for DbStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connect => "connect",
            Self::Migrate => "migrate",
            Self::Begin => "begin transaction",
            Self::Query => "query",
            Self::InsertOrder => "insert order",
            Self::InsertOrderItem => "insert order item",
            Self::InsertInvoice => "insert invoice",
            Self::InsertInvoiceItem => "insert invoice item",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Commit => "commit",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Order with SalesOrderID {0} already exists")]
    DuplicateOrderId(String),

    #[error("Invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("Order {0} not found")]
    OrderNotFound(String),

    #[error("No items found for order {0}")]
    NoItemsFound(String),

    #[error("No orders found for party {0}")]
    NoOrdersFound(String),

    #[error("Invoice {0} not found")]
    InvoiceNotFound(i32),

    #[error("No invoices found for buyer {0}")]
    NoInvoicesFound(String),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Database error during {stage}: {source}")]
    DatabaseError {
        stage: DbStage,
        #[serde(skip)]
        source: DbErr,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn database(stage: DbStage, source: DbErr) -> Self {
        Self::DatabaseError { stage, source }
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::OrderNotFound(_)
            | Self::NoItemsFound(_)
            | Self::NoOrdersFound(_)
            | Self::InvoiceNotFound(_)
            | Self::NoInvoicesFound(_) => StatusCode::NOT_FOUND,
            Self::SessionNotFound => StatusCode::UNAUTHORIZED,
            Self::MalformedDocument(_)
            | Self::MissingRequiredFields(_)
            | Self::UnsupportedContentType(_)
            | Self::InvalidField { .. } => StatusCode::BAD_REQUEST,
            Self::DuplicateOrderId(_) => StatusCode::CONFLICT,
            Self::DatabaseError { .. } | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError { stage, .. } => format!("Database error during {}", stage),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "request".to_string());
        ServiceError::invalid_field(field, err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            let request_id = crate::tracing::current_request_id();
            error!(
                request_id = request_id.as_ref().map(|id| id.as_str()).unwrap_or("-"),
                error = %self,
                "Request failed"
            );
        }
        let body = ErrorResponse {
            error: self.response_message(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[test]
    fn not_found_kinds_map_to_404() {
        for err in [
            ServiceError::OrderNotFound("ORD1".into()),
            ServiceError::NoItemsFound("ORD1".into()),
            ServiceError::NoOrdersFound("ABC Corp".into()),
            ServiceError::InvoiceNotFound(7),
            ServiceError::NoInvoicesFound("ABC Corp".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND, "{err}");
        }
    }

    #[test]
    fn input_kinds_map_to_400() {
        for err in [
            ServiceError::MalformedDocument("bad".into()),
            ServiceError::MissingRequiredFields(vec!["IssueDate".into()]),
            ServiceError::UnsupportedContentType("text/plain".into()),
            ServiceError::invalid_field("UUID", "not an RFC-4122 UUID"),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{err}");
        }
    }

    #[test]
    fn session_and_internal_kinds() {
        assert_eq!(
            ServiceError::SessionNotFound.status_code(),
            StatusCode::UNAUTHORIZED
        );
        let db = ServiceError::database(DbStage::Commit, DbErr::Custom("disk full".into()));
        assert_eq!(db.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(db.response_message(), "Database error during commit");
    }

    #[test]
    fn missing_fields_are_listed() {
        let err = ServiceError::MissingRequiredFields(vec![
            "IssueDate".to_string(),
            "CurrencyCode".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Missing required fields: IssueDate, CurrencyCode"
        );
    }

    #[tokio::test]
    async fn into_response_renders_error_body() {
        let response = ServiceError::InvoiceNotFound(42).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Invoice 42 not found");
    }

    #[tokio::test]
    async fn database_errors_hide_driver_details() {
        let response = ServiceError::database(
            DbStage::InsertOrder,
            DbErr::Custom("UNIQUE constraint failed: orders.SalesOrderID".into()),
        )
        .into_response();

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Database error during insert order");
    }
}
