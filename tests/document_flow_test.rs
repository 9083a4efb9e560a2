mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{read_body, read_json, TestApp, ORDER_XML, SUPPLIER};

const ORDER_JSON: &str = r#"{
    "SalesOrderID": "ORD2",
    "UUID": "9a7b1c2d-4e5f-4a6b-8c7d-0e1f2a3b4c5d",
    "IssueDate": "06/03/2025",
    "PartyName": "Globex",
    "PayableAmount": "120.50",
    "CurrencyCode": "EUR",
    "Items": [
        {
            "ItemDescription": "Bolt",
            "BuyersItemIdentification": "11",
            "SellersItemIdentification": "21",
            "ItemAmount": 100,
            "ItemUnitCode": "PCS",
            "ItemPrice": "0.75"
        },
        {
            "ItemDescription": "Nut",
            "BuyersItemIdentification": "12",
            "SellersItemIdentification": "22",
            "ItemAmount": 100,
            "ItemUnitCode": "PCS",
            "ItemPrice": "0.455"
        }
    ]
}"#;

#[tokio::test]
async fn xml_order_becomes_invoice_with_one_item() {
    let app = TestApp::new().await;
    let invoice_id = app.ingest(ORDER_XML, "application/xml").await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/{invoice_id}"),
            None,
            "",
        )
        .await;
    let (status, invoice) = read_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice["invoiceId"], json!(invoice_id));
    assert_eq!(invoice["salesOrderId"], "ORD1");
    assert_eq!(invoice["partyNameBuyer"], "ABC Corp");
    assert_eq!(invoice["issueDate"], "2025-03-06");
    assert_eq!(invoice["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(invoice["items"][0]["itemDescription"], "Widget");
}

#[tokio::test]
async fn json_order_is_accepted_with_day_first_dates() {
    let app = TestApp::new().await;
    let invoice_id = app.ingest(ORDER_JSON, "application/json; charset=utf-8").await;

    let (status, order) = read_json(
        app.request(Method::GET, "/api/v1/orders/ORD2", None, "")
            .await,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["issueDate"], "2025-03-06");
    assert_eq!(order["items"].as_array().map(Vec::len), Some(2));

    let (status, invoice) = read_json(
        app.request(
            Method::GET,
            &format!("/api/v1/invoices/{invoice_id}"),
            None,
            "",
        )
        .await,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice["currencyCode"], "EUR");
    assert_eq!(invoice["items"][1]["itemDescription"], "Nut");
}

#[tokio::test]
async fn invalid_uuid_leaves_no_order_behind() {
    let app = TestApp::new().await;
    let body = ORDER_XML.replace(
        "6f1c2a1e-3b7d-4c5a-9e8f-0a1b2c3d4e5f",
        "not-a-uuid",
    );

    let (status, error) = read_json(
        app.request(Method::POST, "/api/v1/documents", Some("application/xml"), body)
            .await,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].as_str().unwrap().contains("UUID"));

    let response = app.request(Method::GET, "/api/v1/orders/ORD1", None, "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_sales_order_id_conflicts() {
    let app = TestApp::new().await;
    app.ingest(ORDER_XML, "application/xml").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/documents",
            Some("application/xml"),
            ORDER_XML,
        )
        .await;
    let (status, error) = read_json(response).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        error["error"],
        "Order with SalesOrderID ORD1 already exists"
    );
}

#[tokio::test]
async fn order_without_lines_is_kept_when_invoice_derivation_fails() {
    let app = TestApp::new().await;
    let start = ORDER_XML.find("<cac:OrderLine>").unwrap();
    let end = ORDER_XML.find("</cac:OrderLine>").unwrap() + "</cac:OrderLine>".len();
    let body = format!("{}{}", &ORDER_XML[..start], &ORDER_XML[end..]);

    let (status, error) = read_json(
        app.request(Method::POST, "/api/v1/documents", Some("application/xml"), body)
            .await,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "No items found for order ORD1");

    let (status, order) = read_json(
        app.request(Method::GET, "/api/v1/orders/ORD1", None, "")
            .await,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["items"], json!([]));
}

#[tokio::test]
async fn session_is_required_for_ingestion() {
    let app = TestApp::new().await;

    let missing = app
        .request_with_session(
            Method::POST,
            "/api/v1/documents",
            Some("application/xml"),
            ORDER_XML,
            None,
        )
        .await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let unknown = app
        .request_with_session(
            Method::POST,
            "/api/v1/documents",
            Some("application/xml"),
            ORDER_XML,
            Some("expired"),
        )
        .await;
    let (status, error) = read_json(unknown).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error"], "Session not found");
}

#[tokio::test]
async fn unsupported_and_malformed_bodies_are_bad_requests() {
    let app = TestApp::new().await;

    let plain = app
        .request(Method::POST, "/api/v1/documents", Some("text/plain"), "hello")
        .await;
    assert_eq!(plain.status(), StatusCode::BAD_REQUEST);

    let broken = app
        .request(
            Method::POST,
            "/api/v1/documents",
            Some("application/xml"),
            "<Order><cbc:ID>",
        )
        .await;
    assert_eq!(broken.status(), StatusCode::BAD_REQUEST);

    let missing = app
        .request(
            Method::POST,
            "/api/v1/documents",
            Some("application/json"),
            r#"{"SalesOrderID": "ORD9"}"#,
        )
        .await;
    let (status, error) = read_json(missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"]
        .as_str()
        .unwrap()
        .starts_with("Missing required fields"));
}

#[tokio::test]
async fn exported_invoice_validates_until_business_rules_break() {
    let app = TestApp::new().await;
    let invoice_id = app.ingest(ORDER_XML, "application/xml").await;

    let (status, xml) = read_body(
        app.request(
            Method::GET,
            &format!("/api/v1/invoices/{invoice_id}/xml"),
            None,
            "",
        )
        .await,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains(SUPPLIER));
    assert!(xml.contains("<cbc:LineExtensionAmount currencyID=\"USD\">500.00</cbc:LineExtensionAmount>"));

    let validate = |invoice: String| {
        let app = &app;
        async move {
            read_json(
                app.request(
                    Method::POST,
                    "/api/v1/documents/validate",
                    Some("application/json"),
                    json!({ "invoice": invoice }).to_string(),
                )
                .await,
            )
            .await
        }
    };

    let (status, outcome) = validate(xml.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({ "validated": true, "message": "Valid invoice" }));

    let issue_date = "<cbc:IssueDate>2025-03-06</cbc:IssueDate>";
    let doubled = xml.replacen(issue_date, &format!("{issue_date}{issue_date}"), 1);
    let (status, outcome) = validate(doubled).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["validated"], false);
    assert_ne!(outcome["message"], "Valid invoice");
}

#[tokio::test]
async fn validation_reports_unparseable_input_without_failing() {
    let app = TestApp::new().await;
    let (status, outcome) = read_json(
        app.request(
            Method::POST,
            "/api/v1/documents/validate",
            Some("application/json"),
            json!({ "invoice": "<Invoice" }).to_string(),
        )
        .await,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["validated"], false);
}

#[tokio::test]
async fn validation_reports_a_malformed_request_body() {
    let app = TestApp::new().await;

    for (content_type, body) in [
        (Some("application/json"), "{ not json".to_string()),
        (Some("application/json"), json!({ "document": "<Invoice/>" }).to_string()),
        (Some("text/plain"), json!({ "invoice": "<Invoice/>" }).to_string()),
        (None, String::new()),
    ] {
        let (status, outcome) = read_json(
            app.request(Method::POST, "/api/v1/documents/validate", content_type, body.clone())
                .await,
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(outcome["validated"], false, "{body}");
        assert!(!outcome["message"].as_str().unwrap_or_default().is_empty());
    }
}
