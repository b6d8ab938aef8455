//! HTTP binding of the trigger, driven through the router in-process.
#![cfg(feature = "transport-http")]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use tower::ServiceExt;

use starcritters::storage::InMemoryStores;
use starcritters::transport::{create_router, AppState};
use starcritters::{EconomicReport, FixtureProvider, GeneratorPolicy, Relic, RelicStore, ReportStore};

const TOKEN: &str = "service-role-key";

fn app(stores: &InMemoryStores) -> Router {
    let generator = stores
        .generator(Arc::new(FixtureProvider::new()), GeneratorPolicy::default())
        .unwrap();
    create_router(AppState::new(Arc::new(generator), Some(TOKEN.to_string())))
}

fn seeded() -> InMemoryStores {
    let stores = InMemoryStores::new();
    stores
        .reports
        .insert(EconomicReport::new(Utc::now().date_naive(), 1000.0).unwrap())
        .unwrap();
    stores
        .relics
        .insert(Relic::new("sunstone", "Sunstone", 120.0, 0.8).unwrap())
        .unwrap();
    stores
        .relics
        .insert(Relic::new("voidshell", "Void Shell", 60.0, 0.4).unwrap())
        .unwrap();
    stores
}

fn post(auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn options_is_ok() {
    let stores = seeded();
    let response = app(&stores)
        .oneshot(Request::builder().method("OPTIONS").uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
    assert!(stores.grids.is_empty().unwrap());
}

#[tokio::test]
async fn get_is_method_not_allowed() {
    let stores = seeded();
    let response = app(&stores)
        .oneshot(Request::builder().uri("/generate-daily-grid").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(response).await["error"], "Method Not Allowed");
    assert!(stores.grids.is_empty().unwrap());
}

#[tokio::test]
async fn post_requires_credential() {
    let stores = seeded();
    let response = app(&stores).oneshot(post(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app(&stores).oneshot(post(Some("Bearer nope"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(stores.grids.is_empty().unwrap());
}

#[tokio::test]
async fn post_generates_then_reports_duplicate() {
    let stores = seeded();
    let auth = format!("Bearer {TOKEN}");

    let response = app(&stores).oneshot(post(Some(&auth))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let today = Utc::now().date_naive();
    assert_eq!(
        json_body(response).await["message"],
        format!("Successfully generated grid for {today}.")
    );
    assert_eq!(stores.grids.len().unwrap(), 1);

    let response = app(&stores).oneshot(post(Some(&auth))).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await["error"],
        format!("A grid for date {today} already exists.")
    );
    assert_eq!(stores.grids.len().unwrap(), 1);
}
