use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::{CurrentSession, DeletedResponse};
use crate::{errors::ServiceError, services::orders::OrderWithItems, AppState};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PartyQuery {
    /// Buyer party name
    pub party_name: Option<String>,
}

/// List sales order ids for a party
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(PartyQuery, ("x-session-id" = String, Header, description = "Session id")),
    responses(
        (status = 200, description = "Sales order ids", body = [String]),
        (status = 400, description = "Missing partyName", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unknown session", body = crate::errors::ErrorResponse),
        (status = 404, description = "No orders for the party", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn list_order_ids(
    State(state): State<AppState>,
    _session: CurrentSession,
    Query(query): Query<PartyQuery>,
) -> Result<Json<Vec<String>>, ServiceError> {
    let party_name = query
        .party_name
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ServiceError::invalid_field("partyName", "query parameter is required"))?;

    let ids = state
        .services
        .orders
        .get_order_ids_by_party_name(party_name.trim())
        .await?;
    Ok(Json(ids))
}

/// Get an order with its items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = String, Path, description = "Sales order id"), ("x-session-id" = String, Header, description = "Session id")),
    responses(
        (status = 200, description = "Order found", body = OrderWithItems),
        (status = 401, description = "Unknown session", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    _session: CurrentSession,
    Path(sales_order_id): Path<String>,
) -> Result<Json<OrderWithItems>, ServiceError> {
    let order = state
        .services
        .orders
        .get_order_by_sales_order_id(&sales_order_id)
        .await?;
    Ok(Json(order))
}

/// Delete an order with its items and derived invoices
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = String, Path, description = "Sales order id"), ("x-session-id" = String, Header, description = "Session id")),
    responses(
        (status = 200, description = "Order deleted", body = DeletedResponse),
        (status = 401, description = "Unknown session", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    _session: CurrentSession,
    Path(sales_order_id): Path<String>,
) -> Result<Json<DeletedResponse>, ServiceError> {
    state.services.orders.delete_order_by_id(&sales_order_id).await?;
    Ok(Json(DeletedResponse {
        success: true,
        message: format!("Order {} deleted", sales_order_id),
    }))
}
