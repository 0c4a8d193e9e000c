//! Shared fixtures for server integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use adasim_core::{
    CoreError, IngestOrchestrator, Notifier,
    detector::{DetectorClient, DetectorResponse, ProcessRequest},
    store::{InMemoryRunStore, RunStore},
};
use adasim_model::{
    CallerIdentity, FileType, Role, Run, RunId, RunStatus, RunSummary,
    UserId, VehicleId,
};
use adasim_server::{
    AppState,
    infra::config::{
        Config, DatabaseConfig, DetectorConfig, MediaConfig, ServerConfig,
    },
    routes,
};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, header},
};
use chrono::Utc;
use tempfile::TempDir;

/// Detector stub returning one scripted outcome per call, newest last.
pub struct StubDetector {
    responses: Mutex<Vec<Result<DetectorResponse, String>>>,
}

impl StubDetector {
    pub fn ok(response: DetectorResponse) -> Self {
        Self {
            responses: Mutex::new(vec![Ok(response)]),
        }
    }

    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(vec![Err("connection refused".into())]),
        }
    }

    pub fn unused() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl DetectorClient for StubDetector {
    async fn process(
        &self,
        _request: ProcessRequest,
    ) -> adasim_core::Result<DetectorResponse> {
        match self.responses.lock().unwrap().pop() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(CoreError::upstream(message)),
            None => Ok(DetectorResponse::default()),
        }
    }
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<InMemoryRunStore>,
    pub notifier: Notifier,
    pub media_root: TempDir,
}

pub fn test_app(detector: StubDetector) -> TestApp {
    let media_root = TempDir::new().expect("temp media root");
    let store = Arc::new(InMemoryRunStore::new());
    let store_dyn: Arc<dyn RunStore> = store.clone();
    let notifier = Notifier::new();

    let orchestrator = Arc::new(IngestOrchestrator::new(
        Arc::clone(&store_dyn),
        Arc::new(detector),
        notifier.clone(),
    ));

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "postgres://unused".into(),
        },
        detector: DetectorConfig {
            url: "http://localhost:5001/".parse().unwrap(),
            timeout: std::time::Duration::from_secs(5),
        },
        media: MediaConfig {
            root: media_root.path().to_path_buf(),
        },
    };

    let state = AppState {
        store: store_dyn,
        orchestrator,
        notifier: notifier.clone(),
        config: Arc::new(config),
    };

    TestApp {
        app: routes::create_app(state),
        store,
        notifier,
        media_root,
    }
}

pub fn pending_run(owner: UserId) -> Run {
    Run {
        id: RunId::new(),
        vehicle_id: VehicleId::new(),
        user_id: owner,
        filename: "dashcam.mp4".to_string(),
        filepath: "uploads/dashcam.mp4".to_string(),
        file_type: FileType::Video,
        status: RunStatus::Pending,
        summary: RunSummary::default(),
        sensor_sample_count: 0,
        video_ref: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn caller(owner: UserId) -> CallerIdentity {
    CallerIdentity::new(owner, Role::User)
}

pub fn authed_request(
    method: Method,
    uri: &str,
    identity: &CallerIdentity,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", identity.id.to_string())
        .header("x-user-role", identity.role.as_str())
        .body(Body::empty())
        .unwrap()
}

pub fn ranged_request(
    uri: &str,
    identity: &CallerIdentity,
    range: &str,
) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("x-user-id", identity.id.to_string())
        .header("x-user-role", identity.role.as_str())
        .header(header::RANGE, range)
        .body(Body::empty())
        .unwrap()
}
