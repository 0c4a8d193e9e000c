//! Byte-range streaming endpoint behavior.

mod common;

use adasim_core::store::RunStore;
use adasim_model::{CallerIdentity, Role, UserId};
use axum::{
    body::to_bytes,
    http::{Method, StatusCode, header},
};
use common::{StubDetector, authed_request, caller, pending_run, ranged_request, test_app};
use tower::ServiceExt;

const ASSET: &[u8] = &[0xAB; 1000];

/// Seed a run whose video is a 1000-byte file under the media root.
async fn seeded_app() -> (common::TestApp, String, CallerIdentity) {
    let app = test_app(StubDetector::unused());
    let owner = UserId::new();
    let mut run = pending_run(owner);
    run.video_ref = Some("clip.mp4".to_string());
    std::fs::write(app.media_root.path().join("clip.mp4"), ASSET).unwrap();
    app.store.insert_run(run.clone()).await.unwrap();

    let uri = format!("/api/v1/runs/{}/video", run.id);
    (app, uri, caller(owner))
}

#[tokio::test]
async fn full_response_without_range_header() {
    let (app, uri, identity) = seeded_app().await;

    let response = app
        .app
        .oneshot(authed_request(Method::GET, &uri, &identity))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        "1000"
    );
    assert_eq!(
        response.headers().get(header::ACCEPT_RANGES).unwrap(),
        "bytes"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp4"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 1000);
}

#[tokio::test]
async fn range_yields_exact_span() {
    let (app, uri, identity) = seeded_app().await;

    let response = app
        .app
        .oneshot(ranged_request(&uri, &identity, "bytes=0-99"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 0-99/1000"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        "100"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 100);
    assert_eq!(&body[..], &ASSET[0..100]);
}

#[tokio::test]
async fn omitted_end_runs_to_last_byte() {
    let (app, uri, identity) = seeded_app().await;

    let response = app
        .app
        .oneshot(ranged_request(&uri, &identity, "bytes=900-"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 900-999/1000"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 100);
}

#[tokio::test]
async fn out_of_bounds_start_is_416() {
    let (app, uri, identity) = seeded_app().await;

    let response = app
        .app
        .oneshot(ranged_request(&uri, &identity, "bytes=1000-"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes */1000"
    );
}

#[tokio::test]
async fn malformed_range_is_416() {
    let (app, uri, identity) = seeded_app().await;

    let response = app
        .app
        .oneshot(ranged_request(&uri, &identity, "bytes=oops"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn run_without_video_is_404() {
    let app = test_app(StubDetector::unused());
    let owner = UserId::new();
    let run = pending_run(owner);
    app.store.insert_run(run.clone()).await.unwrap();

    let uri = format!("/api/v1/runs/{}/video", run.id);
    let response = app
        .app
        .oneshot(authed_request(Method::GET, &uri, &caller(owner)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stranger_is_403_and_admin_is_let_through() {
    let (app, uri, _identity) = seeded_app().await;

    let stranger = CallerIdentity::new(UserId::new(), Role::User);
    let response = app
        .app
        .clone()
        .oneshot(authed_request(Method::GET, &uri, &stranger))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = CallerIdentity::new(UserId::new(), Role::Admin);
    let response = app
        .app
        .oneshot(authed_request(Method::GET, &uri, &admin))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_identity_is_401() {
    let (app, uri, _identity) = seeded_app().await;

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri(&uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn concurrent_range_reads_are_independent() {
    let (app, uri, identity) = seeded_app().await;

    let (first, second) = tokio::join!(
        app.app
            .clone()
            .oneshot(ranged_request(&uri, &identity, "bytes=0-499")),
        app.app
            .clone()
            .oneshot(ranged_request(&uri, &identity, "bytes=500-999")),
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(second.status(), StatusCode::PARTIAL_CONTENT);

    let first = to_bytes(first.into_body(), usize::MAX).await.unwrap();
    let second = to_bytes(second.into_body(), usize::MAX).await.unwrap();
    assert_eq!(first.len(), 500);
    assert_eq!(second.len(), 500);
}
