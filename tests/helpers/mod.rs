#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;
use tutormatch::data::seed::{Fixture, apply_fixture};
use tutormatch::matching::CompletionService;
use tutormatch::state::AppState;
use tutormatch::store::MemoryStore;
use tutormatch::web::create_router;

pub const LEARNER: &str = "tok-l1";
pub const OTHER_LEARNER: &str = "tok-l2";
pub const TUTOR_ANA: &str = "tok-t1";
pub const TUTOR_BO: &str = "tok-t2";
pub const TUTOR_CY: &str = "tok-t3";

const FIXTURE: &str = r#"{
    "users": [
        { "id": "l1", "name": "Lina", "role": "Student", "subjects": ["Math"] },
        { "id": "l2", "name": "Leo", "role": "Learner", "subjects": [] },
        { "id": "t1", "name": "Ana", "role": "Tutor", "subjects": ["Math"], "bio": "Calculus and limits" },
        { "id": "t2", "name": "Bo", "role": "Tutor", "subjects": ["Physics"], "bio": "Mechanics" },
        { "id": "t3", "name": "Cy", "role": "Tutor", "subjects": ["Math", "Physics"], "bio": "" }
    ],
    "sessions": [
        { "id": "tok-l1", "uid": "l1" },
        { "id": "tok-l2", "uid": "l2" },
        { "id": "tok-t1", "uid": "t1" },
        { "id": "tok-t2", "uid": "t2" },
        { "id": "tok-t3", "uid": "t3" }
    ]
}"#;

/// Completion stub that returns a fixed reply and counts calls.
pub struct StubCompletion {
    reply: String,
    calls: AtomicUsize,
}

impl StubCompletion {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_owned(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for StubCompletion {
    async fn complete(&self, _prompt: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let fixture: Fixture = serde_json::from_str(FIXTURE).unwrap();
    apply_fixture(store.as_ref(), &fixture).await.unwrap();
    store
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub completion: Arc<StubCompletion>,
}

impl TestApp {
    pub async fn new(reply: &str) -> Self {
        let completion = StubCompletion::new(reply);
        let state = AppState::new(seeded_store().await, completion.clone());
        let router = create_router(state.clone());
        Self {
            state,
            router,
            completion,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Wait for every background matching run spawned so far.
    pub async fn settle(&self) {
        self.state.tasks.close();
        self.state.tasks.wait().await;
        self.state.tasks.reopen();
    }
}
