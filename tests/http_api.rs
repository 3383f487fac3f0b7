#![cfg(feature = "sqlite")]

mod common;

use std::error::Error;
use std::path::Path;

use axum::body::Body;
use axum::http::header;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::Router;
use chrono::Duration;
use rust_xlsxwriter::Workbook;
use rx_ledger::prelude::*;
use rx_ledger::server::router;
use rx_ledger::server::AppState;
use rx_ledger::server::UploadSettings;
use serde_json::json;
use serde_json::Value;
use tower::ServiceExt;

use common::ledger;
use common::row;
use common::TestLedger;

const BOUNDARY: &str = "rx-ledger-boundary";

fn app(ledger: &TestLedger, upload_dir: &Path, audit: bool) -> Router {
    let state = AppState::new(
        ledger.store.clone(),
        TokenIssuer::new("http-test-secret", Duration::hours(1)),
        UploadSettings {
            dir:       upload_dir.to_path_buf(),
            max_bytes: 1024 * 1024,
        },
    );
    let state = if audit {
        state.with_audit(ledger.store.clone())
    }
    else {
        state
    };
    router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    }
    else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn upload(token: &str, field: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: \
         application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

/// An order sheet with shuffled headers, an extra column, a blank leading line and a blank line between the rows.
fn order_workbook() -> Result<Vec<u8>, Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let headers = [
        "Wholesaler",
        "Manufacturer",
        "Quantity Ordered",
        "NDC",
        "Drug Name",
        "Dosage/Concentration",
        "Extra",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(1, col as u16, *header)?;
    }

    sheet.write_string(2, 0, "McKesson")?;
    sheet.write_string(2, 1, "Acme")?;
    sheet.write_number(2, 2, 12.0)?;
    sheet.write_number(2, 3, 50_242_040.0)?;
    sheet.write_string(2, 4, "Xolair")?;
    sheet.write_string(2, 5, "150mg")?;
    sheet.write_string(2, 6, "not stored")?;

    sheet.write_string(4, 0, "Cardinal")?;
    sheet.write_number(4, 2, 30.0)?;
    sheet.write_string(4, 3, "0002-1433-80")?;
    sheet.write_string(4, 4, "Trulicity")?;

    Ok(workbook.save_to_buffer()?)
}

/// Register and log in `username`, returning the session token.
async fn sign_in(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/api/register",
            None,
            json!({ "username": username, "password": "pa55word", "pharmacy_code": "PH-7" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!({ "success": true, "username": username }));

    let (status, body) = send(
        app,
        post_json("/api/login", None, json!({ "username": username, "password": "pa55word" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["username"], username);
    body["token"].as_str().unwrap().to_owned()
}

async fn seed(ledger: &TestLedger, username: &str, rows: &[RawRow]) -> Result<(), Box<dyn Error>> {
    let user = ledger.store.find_user(username).await?.unwrap();
    UpsertEngine::new(ledger.store.clone()).reconcile(user.id, rows).await?;
    Ok(())
}

#[tokio::test]
async fn auth_flow() -> Result<(), Box<dyn Error>> {
    let ledger = ledger().await?;
    let app = app(&ledger, ledger.dir.path(), false);

    let token = sign_in(&app, "alice").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/register",
            None,
            json!({ "username": "alice", "password": "other", "pharmacy_code": "PH-8" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({ "error": "Username already exists." }));

    let (status, body) = send(&app, post_json("/api/register", None, json!({ "username": "bob" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "All fields are required." }));

    let (status, body) = send(
        &app,
        post_json("/api/login", None, json!({ "username": "alice", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid credentials." }));

    let (status, body) = send(&app, get("/api/inventory", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "No token provided" }));

    let (status, body) = send(&app, get("/api/inventory", Some("forged.token.value"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid token" }));

    let (status, body) = send(&app, get("/api/inventory", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    Ok(())
}

#[tokio::test]
async fn disposition_and_report() -> Result<(), Box<dyn Error>> {
    let ledger = ledger().await?;
    let app = app(&ledger, ledger.dir.path(), false);
    let alice = sign_in(&app, "alice").await;
    let bob = sign_in(&app, "bob").await;

    seed(&ledger, "alice", &[
        row(2, "111", "Aspirin", 100, "Zeta", "McKesson"),
        row(3, "222", "Ibuprofen", 50, "Acme", "McKesson"),
    ])
    .await?;

    let (status, inventory) = send(&app, get("/api/inventory", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inventory.as_array().unwrap().len(), 2);
    assert!(inventory[0].get("password").is_none());
    let aspirin = inventory[0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        post_json("/api/disposition", Some(&alice), json!({ "inventoryId": aspirin, "quantity": 101 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body,
        json!({
            "success": true,
            "inventoryId": aspirin,
            "quantity": 101,
            "message": "Disposition updated successfully"
        })
    );

    let (status, body) = send(
        &app,
        post_json("/api/disposition", Some(&alice), json!({ "inventoryId": aspirin, "quantity": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Disposition quantity cannot be negative" }));

    let (status, body) = send(&app, post_json("/api/disposition", Some(&alice), json!({ "quantity": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required fields" }));

    let (status, body) = send(
        &app,
        post_json("/api/disposition", Some(&bob), json!({ "inventoryId": aspirin, "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Inventory item not found" }));

    let (status, report) = send(&app, get("/api/report", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    let report = report.as_array().unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report[0]["manufacturer"], "Acme");
    assert_eq!(report[0]["status"], "normal");
    assert_eq!(report[1]["id"], aspirin);
    assert_eq!(report[1]["quantity_disposed"], 101);
    assert_eq!(report[1]["status"], "over-disposed");

    let (status, report) = send(&app, get("/api/report", Some(&bob))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report, json!([]));

    // History is only routed with the audit log enabled.
    let (status, _) = send(&app, get(&format!("/api/inventory/{aspirin}/dispositions"), Some(&alice))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn audited_dispositions_have_history() -> Result<(), Box<dyn Error>> {
    let ledger = ledger().await?;
    let app = app(&ledger, ledger.dir.path(), true);
    let alice = sign_in(&app, "alice").await;

    seed(&ledger, "alice", &[row(2, "111", "Aspirin", 10, "Acme", "Cardinal")]).await?;
    let (_, inventory) = send(&app, get("/api/inventory", Some(&alice))).await;
    let id = inventory[0]["id"].as_i64().unwrap();

    for quantity in [2, 4] {
        let (status, _) = send(
            &app,
            post_json("/api/disposition", Some(&alice), json!({ "inventoryId": id, "quantity": quantity })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, history) = send(&app, get(&format!("/api/inventory/{id}/dispositions"), Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["quantity_disposed"], 2);
    assert_eq!(history[1]["quantity_disposed"], 4);
    assert_eq!(history[1]["wholesaler"], "Cardinal");

    Ok(())
}

#[tokio::test]
async fn failed_upload_leaves_no_artifact() -> Result<(), Box<dyn Error>> {
    let ledger = ledger().await?;
    let uploads = tempfile::tempdir()?;
    let app = app(&ledger, uploads.path(), false);
    let alice = sign_in(&app, "alice").await;

    let (status, body) = send(&app, upload(&alice, "file", "orders.xlsx", b"this is not a workbook")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["error"].as_str().unwrap().starts_with("Unreadable spreadsheet"));
    assert_eq!(std::fs::read_dir(uploads.path())?.count(), 0);

    let (status, body) = send(&app, upload(&alice, "attachment", "orders.xlsx", b"whatever")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No file uploaded" }));

    let (status, inventory) = send(&app, get("/api/inventory", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inventory, json!([]));

    Ok(())
}

#[tokio::test]
async fn workbook_upload_is_reconciled() -> Result<(), Box<dyn Error>> {
    let ledger = ledger().await?;
    let uploads = tempfile::tempdir()?;
    let app = app(&ledger, uploads.path(), false);
    let alice = sign_in(&app, "alice").await;
    let workbook = order_workbook()?;

    let (status, body) = send(&app, upload(&alice, "file", "orders.xlsx", &workbook)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["inserted"], 2);
    assert_eq!(body["updated"], 0);
    assert_eq!(std::fs::read_dir(uploads.path())?.count(), 0);

    let (status, inventory) = send(&app, get("/api/inventory", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    let inventory = inventory.as_array().unwrap();
    assert_eq!(inventory.len(), 2);

    assert_eq!(inventory[0]["ndc"], "50242040");
    assert_eq!(inventory[0]["drug_name"], "Xolair");
    assert_eq!(inventory[0]["quantity_ordered"], 12);
    assert_eq!(inventory[0]["dosage"], "150mg");
    assert_eq!(inventory[0]["manufacturer"], "Acme");
    assert_eq!(inventory[0]["wholesaler"], "McKesson");
    assert!(inventory[0].get("Extra").is_none());

    assert_eq!(inventory[1]["ndc"], "0002-1433-80");
    assert_eq!(inventory[1]["quantity_ordered"], 30);
    assert_eq!(inventory[1]["dosage"], Value::Null);
    assert_eq!(inventory[1]["manufacturer"], Value::Null);
    assert_eq!(inventory[1]["wholesaler"], "Cardinal");

    let (status, body) = send(&app, upload(&alice, "file", "orders.xlsx", &workbook)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!((body["inserted"].as_u64(), body["updated"].as_u64()), (Some(0), Some(2)));
    assert_eq!(std::fs::read_dir(uploads.path())?.count(), 0);

    let (_, inventory) = send(&app, get("/api/inventory", Some(&alice))).await;
    assert_eq!(inventory.as_array().unwrap().len(), 2);

    Ok(())
}
