//! HTTP surface tests, driving the router in-process.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use hotel_inference::encoding::EncodingPolicy;
use hotel_inference::server::{build_router, AppState, HealthResponse, INFERENCE_ROUTE};
use hotel_inference::service::PredictionResult;

use common::{assert_approx_eq, booking_service, sigmoid};

fn app(policy: EncodingPolicy) -> axum::Router {
    build_router(AppState::new(booking_service(policy)))
}

fn booking(market_segment_type: &str) -> Value {
    json!({
        "no_of_adults": 0, "no_of_children": 0, "no_of_weekend_nights": 0,
        "no_of_week_nights": 0, "type_of_meal_plan": 0, "required_car_parking_space": 0,
        "room_type_reserved": 0, "lead_time": 0, "arrival_year": 0,
        "arrival_month": 0, "arrival_date": 0, "market_segment_type": market_segment_type,
        "repeated_guest": 0, "no_of_previous_cancellations": 0,
        "no_of_previous_bookings_not_canceled": 0, "no_of_special_requests": 0,
        "booking_status": "Canceled"
    })
}

fn post_json(body: &Value) -> Request<Body> {
    Request::post(INFERENCE_ROUTE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn inference_returns_result() {
    let response = app(EncodingPolicy::Fallback)
        .oneshot(post_json(&booking("Offline")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: PredictionResult = serde_json::from_value(body_json(response).await).unwrap();
    assert_approx_eq!(result.result as f32, sigmoid(-0.2), 1e-6);
}

#[tokio::test]
async fn unknown_segment_falls_back_by_default() {
    let response = app(EncodingPolicy::Fallback)
        .oneshot(post_json(&booking("Unknown")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_approx_eq!(body["result"].as_f64().unwrap() as f32, sigmoid(0.15), 1e-6);
}

#[tokio::test]
async fn strict_policy_answers_422_with_detail() {
    let response = app(EncodingPolicy::Strict)
        .oneshot(post_json(&booking("Unknown")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["detail"], "unknown market_segment_type value \"Unknown\"");
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let mut body = booking("Online");
    body.as_object_mut().unwrap().remove("lead_time");

    let response = app(EncodingPolicy::Fallback).oneshot(post_json(&body)).await.unwrap();
    assert!(response.status().is_client_error());

    let response = app(EncodingPolicy::Fallback)
        .oneshot(
            Request::post(INFERENCE_ROUTE)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn health_reports_model_summary() {
    let response = app(EncodingPolicy::Fallback)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: HealthResponse = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(health.model.trees, 3);
    assert_eq!(health.model.features, 17);
    assert_eq!(health.model.objective, "binary:logistic");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let response = app(EncodingPolicy::Fallback)
        .oneshot(Request::get("/api/v2/inference").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
