//! Ingestion endpoint behavior.

mod common;

use adasim_core::{
    detector::{DetectorResponse, payload::{RawAlert, RawSample}},
    store::RunStore,
};
use adasim_model::{ClientEvent, RunStatus, UserId};
use axum::{
    body::to_bytes,
    http::{Method, StatusCode},
};
use common::{StubDetector, authed_request, caller, pending_run, test_app};
use std::time::Duration;
use tokio::time::timeout;
use tower::ServiceExt;

fn detector_payload() -> DetectorResponse {
    DetectorResponse {
        sensor_data: vec![RawSample {
            timestamp: Some("2026-03-01T12:00:00Z".to_string()),
            frame_index: Some(10),
            track_id: Some(7),
            speed: Some(8.0),
            distance_to_object: Some(15.0),
            lane_status: Some("departing".to_string()),
            obstacle_detected: Some(true),
            ttc: Some(1.8),
            camera_frame_url: None,
        }],
        alerts: vec![RawAlert {
            alert_type: Some("obstacle".to_string()),
            severity: Some("high".to_string()),
            description: Some("pedestrian ahead".to_string()),
            track_id: Some(7),
        }],
        video_url: Some("dashcam_annotated.mp4".to_string()),
        ..DetectorResponse::default()
    }
}

#[tokio::test]
async fn successful_ingestion_returns_completed_run() {
    let app = test_app(StubDetector::ok(detector_payload()));
    let owner = UserId::new();
    let run = pending_run(owner);
    app.store.insert_run(run.clone()).await.unwrap();

    let uri = format!("/api/v1/runs/{}/ingest", run.id);
    let response = app
        .app
        .oneshot(authed_request(Method::POST, &uri, &caller(owner)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["sensor_sample_count"], 1);
    assert_eq!(body["data"]["summary"]["total_alerts"], 1);

    // the alert is linked to the observation that caused it
    let samples = app.store.samples_for_run(run.id).await.unwrap();
    let alerts = app.store.alerts_for_run(run.id).await.unwrap();
    assert_eq!(alerts[0].sample_id, Some(samples[0].id));
}

#[tokio::test]
async fn detector_failure_yields_502_and_failed_run() {
    let app = test_app(StubDetector::failing());
    let owner = UserId::new();
    let run = pending_run(owner);
    app.store.insert_run(run.clone()).await.unwrap();
    let mut events = app.notifier.subscribe(owner);

    let uri = format!("/api/v1/runs/{}/ingest", run.id);
    let response = app
        .app
        .oneshot(authed_request(Method::POST, &uri, &caller(owner)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let stored = app.store.get_run(run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    assert_eq!(app.store.count_samples(run.id).await.unwrap(), 0);

    let event = timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        event,
        ClientEvent::RunStatusChanged {
            status: RunStatus::Failed,
            ..
        }
    ));
}

#[tokio::test]
async fn ingestion_publishes_alert_and_completion_events() {
    let app = test_app(StubDetector::ok(detector_payload()));
    let owner = UserId::new();
    let run = pending_run(owner);
    app.store.insert_run(run.clone()).await.unwrap();
    let mut events = app.notifier.subscribe(owner);

    let uri = format!("/api/v1/runs/{}/ingest", run.id);
    app.app
        .oneshot(authed_request(Method::POST, &uri, &caller(owner)))
        .await
        .unwrap();

    let first = timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    let ClientEvent::AlertCreated { alert } = first else {
        panic!("expected AlertCreated first, got {first:?}");
    };
    assert!(alert.sample_id.is_some());

    let second = timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        second,
        ClientEvent::RunStatusChanged {
            status: RunStatus::Completed,
            ..
        }
    ));
}

#[tokio::test]
async fn unknown_run_is_404() {
    let app = test_app(StubDetector::unused());
    let owner = UserId::new();

    let uri = format!("/api/v1/runs/{}/ingest", adasim_model::RunId::new());
    let response = app
        .app
        .oneshot(authed_request(Method::POST, &uri, &caller(owner)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn garbage_run_id_is_400() {
    let app = test_app(StubDetector::unused());
    let owner = UserId::new();

    let response = app
        .app
        .oneshot(authed_request(
            Method::POST,
            "/api/v1/runs/not-a-uuid/ingest",
            &caller(owner),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completed_run_cannot_be_reingested() {
    let app = test_app(StubDetector::ok(detector_payload()));
    let owner = UserId::new();
    let run = pending_run(owner);
    app.store.insert_run(run.clone()).await.unwrap();

    let uri = format!("/api/v1/runs/{}/ingest", run.id);
    let first = app
        .app
        .clone()
        .oneshot(authed_request(Method::POST, &uri, &caller(owner)))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .app
        .oneshot(authed_request(Method::POST, &uri, &caller(owner)))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}
