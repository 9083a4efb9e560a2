use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    services::{
        ingestion::IngestionService, invoices::InvoiceService, orders::OrderService,
    },
    session::{SessionContext, SessionResolver, UuidSource},
    ubl::DocumentValidator,
    AppState,
};

pub mod documents;
pub mod health;
pub mod invoices;
pub mod orders;

/// Header carrying the caller's session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Container for the services handlers call into.
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderService,
    pub invoices: InvoiceService,
    pub ingestion: IngestionService,
    pub validator: DocumentValidator,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        sessions: Arc<dyn SessionResolver>,
        uuids: Arc<dyn UuidSource>,
    ) -> Self {
        let orders = OrderService::new(db_pool.clone());
        let invoices = InvoiceService::new(db_pool);
        let ingestion =
            IngestionService::new(sessions, orders.clone(), invoices.clone(), uuids);

        Self {
            orders,
            invoices,
            ingestion,
            validator: DocumentValidator::peppol(),
        }
    }
}

/// Session id as presented, not yet resolved.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| SessionId(v.to_string()))
            .ok_or(ServiceError::SessionNotFound)
    }
}

/// Session resolved through the application's [`SessionResolver`].
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionContext);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionId(id) = SessionId::from_request_parts(parts, state).await?;
        state.sessions.resolve(&id).await.map(CurrentSession)
    }
}

/// Body of delete endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
}

/// Body of endpoints that only report success.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
