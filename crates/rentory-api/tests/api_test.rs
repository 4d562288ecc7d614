//! HTTP-level tests for the inventory endpoints
//! Drives the full router against in-memory storage

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::TestApp;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], rentory_api::VERSION);
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let app = TestApp::new();

    let missing = Request::builder()
        .uri("/api/v1/items")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(missing).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "RENTORY_API_AUTH_MISSING");

    let forged = Request::builder()
        .uri("/api/v1/items")
        .header("Authorization", "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "RENTORY_API_AUTH_ERROR");
}

#[tokio::test]
async fn test_item_crud() {
    let app = TestApp::new();
    let id = app.create_item("Folding chair", 10, "2.5").await;

    let (status, item) = app.get(&format!("/api/v1/items/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["name"], "Folding chair");
    assert_eq!(item["daily_rate"], "2.50");
    assert!(item.get("user_id").is_none());

    let (status, item) = app
        .patch(&format!("/api/v1/items/{id}"), json!({ "quantity": 12 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["quantity"], 12);

    let (status, list) = app.get("/api/v1/items?search=chair").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = app.delete(&format!("/api/v1/items/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&format!("/api/v1/items/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "RENTORY_API_NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_item_is_bad_request() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/v1/items",
            json!({ "name": "", "quantity": 1, "daily_rate": "1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["retryable"], false);
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let app = TestApp::new();
    let id = app.create_item("Tent", 1, "40").await;

    let other = app.as_user("user-2");
    let (status, _) = other.get(&format!("/api/v1/items/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = other.get("/api/v1/items").await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_rental_overbooking_conflicts() {
    let app = TestApp::new();
    let item = app.create_item("Projector", 1, "30").await;
    let customer = app.create_customer("Ada").await;

    let request = json!({
        "customer_id": customer,
        "start_date": "2024-06-01",
        "end_date": "2024-06-03",
        "items": [{ "item_id": item, "quantity": 1 }],
    });
    let (status, rental) = app.post("/api/v1/rentals", request).await;
    assert_eq!(status, StatusCode::CREATED, "{rental}");
    assert_eq!(rental["total_price"], "90.00");
    assert_eq!(rental["balance"]["status"], "unpaid");

    // Shares 2024-06-03 with the first rental
    let clash = json!({
        "customer_id": customer,
        "start_date": "2024-06-03",
        "end_date": "2024-06-04",
        "items": [{ "item_id": item, "quantity": 1 }],
    });
    let (status, body) = app.post("/api/v1/rentals", clash).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "RENTORY_API_CONFLICT");

    let (status, availability) = app
        .get(&format!(
            "/api/v1/items/{item}/availability?start=2024-06-02&end=2024-06-02"
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(availability["available"], 0);

    let (status, all) = app
        .get("/api/v1/items/availability?start=2024-06-05&end=2024-06-06")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all[0]["available"], 1);
}

#[tokio::test]
async fn test_oversized_inputs_are_bad_requests() {
    let app = TestApp::new();
    let item = app.create_item("Crane", 3, "5000000000").await;
    let customer = app.create_customer("Ada").await;

    let (status, body) = app
        .post(
            "/api/v1/items",
            json!({ "name": "Yacht", "quantity": 1, "daily_rate": "10000000000" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    // Merged quantity overflows
    let (status, body) = app
        .post(
            "/api/v1/rentals",
            json!({
                "customer_id": customer,
                "start_date": "2024-06-01",
                "end_date": "2024-06-01",
                "items": [
                    { "item_id": item, "quantity": 2147483647 },
                    { "item_id": item, "quantity": 2 },
                ],
                "total_price": "0",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    // 3 x 5e9 does not fit the price column
    let (status, body) = app
        .post(
            "/api/v1/rentals",
            json!({
                "customer_id": customer,
                "start_date": "2024-06-01",
                "end_date": "2024-06-01",
                "items": [{ "item_id": item, "quantity": 3 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, rental) = app
        .post(
            "/api/v1/rentals",
            json!({
                "customer_id": customer,
                "start_date": "2024-06-01",
                "end_date": "2024-06-01",
                "items": [{ "item_id": item, "quantity": 1 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{rental}");
    assert_eq!(rental["total_price"], "5000000000.00");

    let (status, body) = app
        .post(
            &format!("/api/v1/rentals/{}/payments", rental["id"].as_str().unwrap()),
            json!({ "amount": "10000000000" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn test_payments_and_overpayment() {
    let app = TestApp::new();
    let item = app.create_item("Canoe", 2, "25").await;
    let customer = app.create_customer("Grace").await;

    let (_, rental) = app
        .post(
            "/api/v1/rentals",
            json!({
                "customer_id": customer,
                "start_date": "2024-07-01",
                "end_date": "2024-07-02",
                "items": [{ "item_id": item, "quantity": 2 }],
                "advance_payment": "20",
            }),
        )
        .await;
    let rental_id = rental["id"].as_str().unwrap();
    assert_eq!(rental["total_price"], "100.00");

    let (status, payment) = app
        .post(
            &format!("/api/v1/rentals/{rental_id}/payments"),
            json!({ "amount": "50", "method": "cash" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{payment}");

    let (_, balance) = app
        .get(&format!("/api/v1/rentals/{rental_id}/balance"))
        .await;
    assert_eq!(balance["paid"], "70.00");
    assert_eq!(balance["remaining"], "30.00");
    assert_eq!(balance["status"], "partial");

    let (status, body) = app
        .post(
            &format!("/api/v1/rentals/{rental_id}/payments"),
            json!({ "amount": "30.01" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "RENTORY_API_UNPROCESSABLE");

    let payment_id = payment["id"].as_str().unwrap();
    let (status, _) = app
        .delete(&format!(
            "/api/v1/rentals/{rental_id}/payments/{payment_id}"
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, payments) = app
        .get(&format!("/api/v1/rentals/{rental_id}/payments"))
        .await;
    assert!(payments.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_transitions() {
    let app = TestApp::new();
    let item = app.create_item("Ladder", 1, "10").await;
    let customer = app.create_customer("Linus").await;

    let (_, rental) = app
        .post(
            "/api/v1/rentals",
            json!({
                "customer_id": customer,
                "start_date": "2024-08-01",
                "end_date": "2024-08-01",
                "items": [{ "item_id": item, "quantity": 1 }],
            }),
        )
        .await;
    let rental_id = rental["id"].as_str().unwrap();

    assert_eq!(rental["status"], "reserved");

    let (status, _) = app
        .post(
            &format!("/api/v1/rentals/{rental_id}/status"),
            json!({ "status": "returned" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for next in ["active", "returned"] {
        let (status, rental) = app
            .post(
                &format!("/api/v1/rentals/{rental_id}/status"),
                json!({ "status": next }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{rental}");
        assert_eq!(rental["status"], next);
    }

    let (status, _) = app
        .post(
            &format!("/api/v1/rentals/{rental_id}/status"),
            json!({ "status": "active" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_booking_conversion_over_http() {
    let app = TestApp::new();
    let item = app.create_item("Speaker", 2, "15").await;
    let customer = app.create_customer("Margaret").await;

    let (status, booking) = app
        .post(
            "/api/v1/bookings",
            json!({
                "customer_id": customer,
                "start_date": "2024-09-10",
                "end_date": "2024-09-12",
                "items": [{ "item_id": item, "quantity": 2 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{booking}");
    let booking_id = booking["id"].as_str().unwrap();

    let (status, _) = app
        .post(&format!("/api/v1/bookings/{booking_id}/confirm"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, rental) = app
        .send(app.request(
            Method::POST,
            &format!("/api/v1/bookings/{booking_id}/convert"),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{rental}");
    assert_eq!(rental["booking_id"], booking_id);
    assert_eq!(rental["total_price"], "90.00");

    let (_, booking) = app.get(&format!("/api/v1/bookings/{booking_id}")).await;
    assert_eq!(booking["status"], "converted");
}

#[tokio::test]
async fn test_calendar_month_view() {
    let app = TestApp::new();
    let item = app.create_item("Tablecloth", 5, "3").await;
    let customer = app.create_customer("Edsger").await;

    app.post(
        "/api/v1/rentals",
        json!({
            "customer_id": customer,
            "start_date": "2024-02-28",
            "end_date": "2024-03-02",
            "items": [{ "item_id": item, "quantity": 1 }],
        }),
    )
    .await;

    let (status, view) = app.get("/api/v1/calendar?month=2024-02").await;
    assert_eq!(status, StatusCode::OK, "{view}");
    assert_eq!(view["timezone"], "UTC");

    let days = view["days"].as_array().unwrap();
    assert_eq!(days.len(), 29);
    assert!(days[26]["entries"].as_array().unwrap().is_empty());
    let entry = &days[27]["entries"][0];
    assert_eq!(entry["kind"], "rental");
    assert_eq!(entry["is_start"], true);
    assert_eq!(entry["is_end"], false);
    assert_eq!(days[28]["entries"][0]["is_end"], false);

    let (status, _) = app.get("/api/v1/calendar?month=2024-02&start=2024-02-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_timezone_header_shifts_timestamps() {
    let app = TestApp::new();
    let item = app.create_item("Kayak", 1, "20").await;
    let customer = app.create_customer("Barbara").await;

    let body = json!({
        "customer_id": customer,
        "start_date": "2024-03-01T03:00:00Z",
        "end_date": "2024-03-02T03:00:00Z",
        "items": [{ "item_id": item, "quantity": 1 }],
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/rentals")
        .header("Authorization", format!("Bearer {}", common::token_for("user-1")))
        .header("Content-Type", "application/json")
        .header("X-Timezone", "America/New_York")
        .body(Body::from(body.to_string()))
        .unwrap();

    let (status, rental) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED, "{rental}");
    assert_eq!(rental["period"]["start"], "2024-02-29");
    assert_eq!(rental["period"]["end"], "2024-03-01");

    let (status, body) = app.get("/api/v1/calendar?month=2024-03&tz=Mars%2FOlympus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn test_dashboard_counts() {
    let app = TestApp::new();
    app.create_item("Drill", 1, "12").await;
    app.create_customer("Alan").await;

    let (status, summary) = app.get("/api/v1/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["items"], 1);
    assert_eq!(summary["customers"], 1);
    assert_eq!(summary["outstanding_balance"], "0.00");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();

    let (status, doc) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/v1/rentals"].is_object());
}
