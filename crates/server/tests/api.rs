use std::collections::HashMap;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono_tz::Asia::Kolkata;
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use rust_decimal::Decimal;
use tower::ServiceExt;

use migration::MigratorTrait;
use server::{AdminList, AuthGate, Identity, IdentityProvider, app};

async fn test_app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = engine::Engine::builder().database(db).build().await.unwrap();

    let mut tokens = HashMap::new();
    tokens.insert(
        "admin-token".to_string(),
        Identity {
            id: "admin-1".to_string(),
            email: "root@example.com".to_string(),
        },
    );
    tokens.insert(
        "alice-token".to_string(),
        Identity {
            id: "alice".to_string(),
            email: "alice@example.com".to_string(),
        },
    );
    tokens.insert(
        "bob-token".to_string(),
        Identity {
            id: "bob".to_string(),
            email: "bob@example.com".to_string(),
        },
    );
    let gate = AuthGate {
        provider: IdentityProvider::fixed(tokens),
        admins: AdminList::new(vec!["root@example.com".to_string()]),
    };

    app(engine, gate, Kolkata)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_account(router: &Router, editors: Vec<&str>, viewers: Vec<&str>) -> i64 {
    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/accounts",
            Some("admin-token"),
            Some(json!({
                "title": "Household",
                "description": "shared expenses",
                "editors": editors,
                "viewers": viewers,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let router = test_app().await;
    let response = router
        .oneshot(request("GET", "/accounts", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let router = test_app().await;
    let response = router
        .oneshot(request("GET", "/accounts", Some("bogus"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn responses_are_not_cacheable() {
    let router = test_app().await;
    let response = router
        .oneshot(request("GET", "/accounts", Some("alice-token"), None))
        .await
        .unwrap();
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn non_admin_cannot_create_accounts() {
    let router = test_app().await;
    let response = router
        .oneshot(request(
            "POST",
            "/accounts",
            Some("alice-token"),
            Some(json!({"title": "Mine"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn account_crud_roundtrip() {
    let router = test_app().await;
    let id = create_account(&router, vec!["alice"], vec!["bob"]).await;

    let response = router
        .clone()
        .oneshot(request(
            "GET",
            &format!("/accounts/{id}"),
            Some("alice-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["title"], "Household");
    assert_eq!(body["data"]["editors"], json!(["alice"]));
    assert_eq!(body["data"]["viewers"], json!(["bob"]));

    let response = router
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/accounts/{id}"),
            Some("admin-token"),
            Some(json!({"title": "Household 2026", "description": null})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["title"], "Household 2026");
    assert_eq!(body["data"]["description"], Value::Null);

    let response = router
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/accounts/{id}"),
            Some("admin-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(request(
            "GET",
            &format!("/accounts/{id}"),
            Some("admin-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn account_listing_is_scoped_to_memberships() {
    let router = test_app().await;
    create_account(&router, vec!["alice"], vec![]).await;
    create_account(&router, vec!["bob"], vec![]).await;

    let response = router
        .clone()
        .oneshot(request("GET", "/accounts", Some("alice-token"), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], 1);
    assert_eq!(body["perPage"], 50);

    let response = router
        .oneshot(request("GET", "/accounts", Some("admin-token"), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn pagination_echo_matches_the_query_actually_run() {
    let router = test_app().await;
    create_account(&router, vec!["alice"], vec![]).await;

    let response = router
        .oneshot(request(
            "GET",
            "/accounts?page=0&perPage=500",
            Some("alice-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["perPage"], 200);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_sort_field_is_a_bad_request() {
    let router = test_app().await;
    let response = router
        .oneshot(request(
            "GET",
            "/accounts?sort=balance",
            Some("alice-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid sort field: balance");
}

#[tokio::test]
async fn transaction_lifecycle_keeps_balances() {
    let router = test_app().await;
    let id = create_account(&router, vec!["alice"], vec![]).await;

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/accounts/{id}/transactions"),
            Some("alice-token"),
            Some(json!({
                "title": "Salary",
                "amount": "1000.00",
                "transaction_date_time": "2026-01-15T10:30:00+00:00",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let tx_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(decimal(&body["data"]["balance"]), Decimal::new(1000, 0));

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/accounts/{id}/transactions"),
            Some("alice-token"),
            Some(json!({
                "title": "Groceries",
                "amount": "-250.50",
                "transaction_date_time": "2026-01-16T09:00:00+00:00",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(decimal(&body["data"]["balance"]), Decimal::new(7495, 1));

    let response = router
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/accounts/{id}/transactions/{tx_id}"),
            Some("alice-token"),
            Some(json!({"amount": "500.00"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(decimal(&body["data"]["balance"]), Decimal::new(500, 0));

    let response = router
        .clone()
        .oneshot(request(
            "GET",
            &format!("/accounts/{id}/transactions"),
            Some("alice-token"),
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["data"][0]["title"], "Groceries");
    assert_eq!(decimal(&body["data"][0]["balance"]), Decimal::new(2495, 1));

    let response = router
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/accounts/{id}/transactions/{tx_id}"),
            Some("alice-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(request(
            "GET",
            &format!("/accounts/{id}/transactions"),
            Some("alice-token"),
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(decimal(&body["data"][0]["balance"]), Decimal::new(-2505, 1));
}

#[tokio::test]
async fn viewer_reads_but_cannot_write() {
    let router = test_app().await;
    let id = create_account(&router, vec!["alice"], vec!["bob"]).await;

    let response = router
        .clone()
        .oneshot(request(
            "GET",
            &format!("/accounts/{id}/transactions"),
            Some("bob-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(request(
            "POST",
            &format!("/accounts/{id}/transactions"),
            Some("bob-token"),
            Some(json!({"title": "Sneaky", "amount": "1.00"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "forbidden: editor access required");
}

#[tokio::test]
async fn zero_amount_is_a_bad_request() {
    let router = test_app().await;
    let id = create_account(&router, vec!["alice"], vec![]).await;

    let response = router
        .oneshot(request(
            "POST",
            &format!("/accounts/{id}/transactions"),
            Some("alice-token"),
            Some(json!({"title": "Nothing", "amount": "0"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid input: amount must not be zero");
}

#[tokio::test]
async fn naive_timestamp_uses_default_timezone() {
    let router = test_app().await;
    let id = create_account(&router, vec!["alice"], vec![]).await;

    let response = router
        .oneshot(request(
            "POST",
            &format!("/accounts/{id}/transactions"),
            Some("alice-token"),
            Some(json!({
                "title": "Chai",
                "amount": "-30.00",
                "transaction_date_time": "2026-01-15T10:30:00",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    // 10:30 IST is 05:00 UTC.
    assert_eq!(
        body["data"]["transaction_date_time"],
        "2026-01-15T05:00:00Z"
    );
}

#[tokio::test]
async fn deleting_account_with_transactions_conflicts() {
    let router = test_app().await;
    let id = create_account(&router, vec!["alice"], vec![]).await;

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/accounts/{id}/transactions"),
            Some("alice-token"),
            Some(json!({"title": "Salary", "amount": "100.00"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(request(
            "DELETE",
            &format!("/accounts/{id}"),
            Some("admin-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn empty_patch_is_a_bad_request() {
    let router = test_app().await;
    let id = create_account(&router, vec!["alice"], vec![]).await;

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/accounts/{id}/transactions"),
            Some("alice-token"),
            Some(json!({"title": "Salary", "amount": "100.00"})),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let tx_id = body["data"]["id"].as_i64().unwrap();

    let response = router
        .oneshot(request(
            "PATCH",
            &format!("/accounts/{id}/transactions/{tx_id}"),
            Some("alice-token"),
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recompute_endpoint_requires_editor() {
    let router = test_app().await;
    let id = create_account(&router, vec!["alice"], vec!["bob"]).await;

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/accounts/{id}/recompute"),
            Some("bob-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(request(
            "POST",
            &format!("/accounts/{id}/recompute"),
            Some("alice-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
