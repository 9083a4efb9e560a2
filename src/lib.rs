//! UBL trade-document service
//!
//! Ingests UBL Order documents, validates UBL invoices, persists orders and
//! the invoices derived from them, and exports stored invoices as UBL XML.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod session;
pub mod tracing;
pub mod ubl;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::session::{SessionResolver, UuidSource};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub sessions: Arc<dyn SessionResolver>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        sessions: Arc<dyn SessionResolver>,
        uuids: Arc<dyn UuidSource>,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), sessions.clone(), uuids);
        Self {
            db,
            config,
            sessions,
            services,
        }
    }
}

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Documents
        .route("/documents", post(handlers::documents::ingest_document))
        .route(
            "/documents/validate",
            post(handlers::documents::validate_document),
        )
        // Invoices
        .route("/invoices", get(handlers::invoices::list_invoices))
        .route(
            "/invoices/:id",
            get(handlers::invoices::get_invoice)
                .patch(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route("/invoices/:id/xml", get(handlers::invoices::get_invoice_xml))
        // Orders
        .route("/orders", get(handlers::orders::list_order_ids))
        .route(
            "/orders/:id",
            get(handlers::orders::get_order).delete(handlers::orders::delete_order),
        )
        .route("/health", get(handlers::health::health))
}

/// Complete application router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let max_body_bytes = state.config.server.max_body_bytes;

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::openapi_routes())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(crate::tracing::RequestSpanMaker))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
