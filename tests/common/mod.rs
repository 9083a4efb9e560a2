#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use ubl_invoice_api::{
    build_router,
    config::AppConfig,
    db,
    session::{InMemorySessionResolver, RandomUuidSource, SessionContext},
    AppState,
};

pub const SESSION: &str = "test-session";
pub const SUPPLIER: &str = "Acme Supplies Ltd";

pub const ORDER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Order xmlns="urn:oasis:names:specification:ubl:schema:xsd:Order-2"
       xmlns:cac="urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2"
       xmlns:cbc="urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2">
  <cbc:ID>ORD1</cbc:ID>
  <cbc:SalesOrderID>ORD1</cbc:SalesOrderID>
  <cbc:UUID>6f1c2a1e-3b7d-4c5a-9e8f-0a1b2c3d4e5f</cbc:UUID>
  <cbc:IssueDate>2025-03-06</cbc:IssueDate>
  <cac:BuyerCustomerParty>
    <cac:Party><cac:PartyName><cbc:Name>ABC Corp</cbc:Name></cac:PartyName></cac:Party>
  </cac:BuyerCustomerParty>
  <cac:SellerSupplierParty>
    <cac:Party><cac:PartyName><cbc:Name>Acme Supplies Ltd</cbc:Name></cac:PartyName></cac:Party>
  </cac:SellerSupplierParty>
  <cac:AnticipatedMonetaryTotal>
    <cbc:PayableAmount currencyID="USD">500</cbc:PayableAmount>
  </cac:AnticipatedMonetaryTotal>
  <cac:OrderLine>
    <cac:LineItem>
      <cbc:ID>1</cbc:ID>
      <cbc:Quantity unitCode="EA">10</cbc:Quantity>
      <cac:Price><cbc:PriceAmount currencyID="USD">50</cbc:PriceAmount></cac:Price>
      <cac:Item>
        <cbc:Description>Widget</cbc:Description>
        <cac:BuyersItemIdentification><cbc:ID>1</cbc:ID></cac:BuyersItemIdentification>
        <cac:SellersItemIdentification><cbc:ID>2</cbc:ID></cac:SellersItemIdentification>
      </cac:Item>
    </cac:LineItem>
  </cac:OrderLine>
</Order>"#;

/// Application router over a fresh SQLite file in a temporary directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("ubl_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.database.max_connections = 1;
        cfg.database.min_connections = 1;

        let pool = db::connect(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let sessions = InMemorySessionResolver::new();
        sessions.insert(
            SESSION,
            SessionContext {
                user_id: "user-1".to_string(),
                company_name: SUPPLIER.to_string(),
            },
        );

        let state = AppState::new(
            Arc::new(pool),
            cfg,
            Arc::new(sessions),
            Arc::new(RandomUuidSource),
        );

        Self {
            router: build_router(state.clone()),
            state,
            _dir: dir,
        }
    }

    /// Sends a request with the test session attached.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: impl Into<Body>,
    ) -> axum::response::Response {
        self.request_with_session(method, uri, content_type, body, Some(SESSION))
            .await
    }

    pub async fn request_with_session(
        &self,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: impl Into<Body>,
        session: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        if let Some(session) = session {
            builder = builder.header("x-session-id", session);
        }

        let request = builder.body(body.into()).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Posts a document and returns the new invoice id.
    pub async fn ingest(&self, body: &str, content_type: &str) -> i64 {
        let response = self
            .request(
                Method::POST,
                "/api/v1/documents",
                Some(content_type),
                body.to_string(),
            )
            .await;
        let (status, json) = read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "ingest failed: {json}");
        json["invoiceId"].as_i64().expect("invoiceId in response")
    }
}

pub async fn read_body(response: axum::response::Response) -> (StatusCode, String) {
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}

pub async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let (status, body) = read_body(response).await;
    let json = serde_json::from_str(&body).unwrap_or(Value::Null);
    (status, json)
}
