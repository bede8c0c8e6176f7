//! End-to-end integration tests for CampusFed.
//!
//! These tests drive the full stack over HTTP: gateway router, pipeline,
//! real connectors, a store and an in-process partner catalog. Only the
//! inference backend is scripted.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use campusfed_config::AppConfig;
use campusfed_connectors::{CatalogClient, default_registry};
use campusfed_core::error::ProviderError;
use campusfed_core::query::Query;
use campusfed_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use campusfed_core::store::{NewDocument, StudentStore};
use campusfed_core::student::{NewStudent, ProfileUpdate, StudentId, VerificationStatus};
use campusfed_gateway::{AppState, SharedState, build_router};
use campusfed_store::{InMemoryStore, SqliteStore};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence and records
/// every prompt it was sent.
struct ScriptedProvider {
    responses: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|r| r.to_string()).collect(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompt(&self, i: usize) -> String {
        self.prompts.lock().unwrap()[i].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        let count = prompts.len();
        if count >= self.responses.len() {
            panic!(
                "ScriptedProvider exhausted: call #{}, have {}",
                count,
                self.responses.len()
            );
        }
        prompts.push(request.prompt);
        Ok(ProviderResponse {
            text: self.responses[count].clone(),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock".into(),
        })
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

/// Serve `app` on an ephemeral local port and return its base URL.
async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn partner_catalog() -> Router {
    Router::new()
        .route(
            "/api/jobs",
            get(|| async {
                Json(json!([
                    {"job_id": 1, "job_title": "Junior Data Analyst", "eligibility_criteria": {"required_skills": ["Python"], "min_percentage": 60}},
                    {"job_id": 2, "job_title": "Embedded Engineer", "eligibility_criteria": {"required_skills": ["C"]}}
                ]))
            }),
        )
        .route(
            "/api/scholarships",
            get(|| async {
                Json(json!([
                    {"scholarship_name": "Merit Grant", "eligibility_criteria": {"max_income_pa": 250000, "min_percentage": 75}},
                    {"scholarship_name": "Needs Grant", "eligibility_criteria": {"max_income_pa": 100000}},
                    {"scholarship_name": "Mystery Award", "eligibility": "Open to deserving candidates"}
                ]))
            }),
        )
}

struct Harness {
    app: Router,
    state: SharedState,
    provider: Arc<ScriptedProvider>,
}

async fn harness(
    store: Arc<dyn StudentStore>,
    catalog_url: &str,
    responses: &[&str],
) -> Harness {
    let mut config = AppConfig::default();
    config.catalog.base_url = catalog_url.to_string();
    config.pipeline.tool_timeout_secs = 5;

    let catalog = Arc::new(CatalogClient::from_config(&config.catalog).unwrap());
    let registry = Arc::new(default_registry(store.clone(), catalog));
    let provider = Arc::new(ScriptedProvider::new(responses));
    let state = Arc::new(AppState::new(config, provider.clone(), registry, store));

    Harness {
        app: build_router(state.clone()),
        state,
        provider,
    }
}

async fn student(store: &dyn StudentStore, name: &str, skills: &[&str]) -> StudentId {
    let id = store
        .create_student(NewStudent {
            full_name: name.into(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone_number: None,
        })
        .await
        .unwrap();
    let update = ProfileUpdate {
        skills: skills.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    store.merge_profile(id, &update).await.unwrap();
    id
}

fn titles(listings: &Value, key: &str) -> Vec<String> {
    listings
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l[key].as_str().unwrap().to_string())
        .collect()
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_caller_asks_for_their_name() {
    let store: Arc<dyn StudentStore> = Arc::new(InMemoryStore::new());
    let id = student(store.as_ref(), "Asha Rao", &[]).await;
    let h = harness(
        store,
        "http://127.0.0.1:1",
        &[r#"["GET_STUDENT_PROFILE"]"#, "Your name is Asha Rao."],
    )
    .await;

    let (status, body) = post(&h.app, "/v1/query", json!({"query": "what is my name", "student_id": id.0})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response_text"], "Your name is Asha Rao.");
    assert_eq!(h.provider.calls(), 2);
    assert!(h.provider.prompt(0).contains("student with id"));
    assert!(h.provider.prompt(1).contains("Asha Rao"));
}

#[tokio::test]
async fn e2e_anonymous_count_over_all_profiles() {
    let store: Arc<dyn StudentStore> = Arc::new(InMemoryStore::new());
    student(store.as_ref(), "Asha Rao", &["Python", "SQL"]).await;
    student(store.as_ref(), "Ben Ortiz", &["Java"]).await;
    student(store.as_ref(), "Chen Li", &["python"]).await;
    let h = harness(
        store,
        "http://127.0.0.1:1",
        &[r#"["GET_ALL_STUDENT_PROFILES"]"#, "2 students know Python."],
    )
    .await;

    let (status, body) = post(&h.app, "/v1/query", json!({"query": "how many students know Python"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response_text"], "2 students know Python.");
    let synthesis = h.provider.prompt(1);
    assert!(synthesis.contains("Ben Ortiz"));
    assert!(synthesis.contains("Chen Li"));
    assert!(synthesis.contains("how many students know Python"));
}

#[tokio::test]
async fn e2e_unreachable_catalog_still_answers() {
    let store: Arc<dyn StudentStore> = Arc::new(InMemoryStore::new());
    let id = student(store.as_ref(), "Asha Rao", &["Python"]).await;
    let h = harness(
        store,
        "http://127.0.0.1:1",
        &[r#"["GET_ALL_JOBS"]"#, "Sorry, job listings are unavailable right now."],
    )
    .await;

    let (status, body) = post(
        &h.app,
        "/v1/query",
        json!({"query": "show me jobs I'm eligible for", "student_id": id.0}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response_text"].as_str().unwrap().contains("unavailable"));
    let synthesis = h.provider.prompt(1);
    assert!(synthesis.contains("jobs_list"));
    assert!(synthesis.contains("\"error\""));
}

#[tokio::test]
async fn e2e_greeting_gets_clarification_without_synthesis() {
    let store: Arc<dyn StudentStore> = Arc::new(InMemoryStore::new());
    let h = harness(store, "http://127.0.0.1:1", &["[]"]).await;

    let (status, body) = post(&h.app, "/v1/query", json!({"query": "hello"})).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response_text"].as_str().unwrap().contains("couldn't understand"));
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn e2e_eligible_jobs_are_filtered_against_profile() {
    let base = spawn(partner_catalog()).await;
    let store: Arc<dyn StudentStore> = Arc::new(InMemoryStore::new());
    let id = student(store.as_ref(), "Asha Rao", &["Python"]).await;
    store
        .merge_profile(
            id,
            &ProfileUpdate {
                percentage: Some(72.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let h = harness(
        store,
        &base,
        &[r#"["GET_ALL_JOBS"]"#, "You qualify for Junior Data Analyst."],
    )
    .await;

    let trace = h
        .state
        .pipeline
        .answer_with_trace(&Query::new("which jobs am I eligible for", Some(id)))
        .await;
    assert_eq!(trace.answer.text(), "You qualify for Junior Data Analyst.");

    let context = trace.context.unwrap();
    assert_eq!(titles(context.get("eligible_jobs").unwrap(), "job_title"), ["Junior Data Analyst"]);
    assert_eq!(context.get("jobs_list").unwrap().as_array().unwrap().len(), 2);
    assert!(h.provider.prompt(1).contains("eligible_jobs"));
}

#[tokio::test]
async fn e2e_income_certificate_then_scholarship_query() {
    let base = spawn(partner_catalog()).await;
    let store: Arc<dyn StudentStore> = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
    let id = student(store.as_ref(), "Asha Rao", &[]).await;
    store
        .add_document(NewDocument {
            owner: id,
            document_type: "Income Certificate".into(),
            verification_status: VerificationStatus::Verified,
        })
        .await
        .unwrap();
    let h = harness(
        store.clone(),
        &base,
        &[
            r#"{"income": "1,80,000"}"#,
            r#"{"percentage": 81.5}"#,
            r#"["GET_ALL_SCHOLARSHIPS"]"#,
            "You are eligible for the Merit Grant.",
        ],
    )
    .await;

    let (_, outcome) = post(
        &h.app,
        &format!("/v1/students/{}/extractions", id.0),
        json!({"document_type": "Income Certificate", "extracted_text": "Annual family income Rs 1,80,000"}),
    )
    .await;
    assert_eq!(outcome["status"], "merged");
    assert_eq!(outcome["goal"], "income");

    let (_, outcome) = post(
        &h.app,
        &format!("/v1/students/{}/extractions", id.0),
        json!({"document_type": "Class 12 Marksheet", "extracted_text": "Aggregate 81.5%"}),
    )
    .await;
    assert_eq!(outcome["status"], "merged");

    let profile = store.get_profile(id).await.unwrap().unwrap();
    assert_eq!(profile.annual_income, Some(180_000));
    assert!((profile.highest_percentage - 81.5).abs() < 1e-9);

    let (status, body) = post(
        &h.app,
        "/v1/query",
        json!({"query": "which scholarships can I get", "student_id": id.0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response_text"], "You are eligible for the Merit Grant.");
    assert_eq!(h.state.store.name(), "sqlite");

    let synthesis = h.provider.prompt(3);
    assert!(synthesis.contains("eligible_scholarships"));
    assert!(synthesis.contains("Merit Grant"));
}

#[tokio::test]
async fn e2e_scholarship_eligibility_excludes_over_income_and_unstructured() {
    let base = spawn(partner_catalog()).await;
    let store: Arc<dyn StudentStore> = Arc::new(InMemoryStore::new());
    let id = student(store.as_ref(), "Asha Rao", &[]).await;
    store
        .merge_profile(
            id,
            &ProfileUpdate {
                percentage: Some(81.5),
                annual_income: Some(180_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let h = harness(store, &base, &[r#"["GET_ALL_SCHOLARSHIPS"]"#, "Merit Grant."]).await;

    let trace = h
        .state
        .pipeline
        .answer_with_trace(&Query::new("which scholarships can I get", Some(id)))
        .await;

    let context = trace.context.unwrap();
    assert_eq!(
        titles(context.get("eligible_scholarships").unwrap(), "scholarship_name"),
        ["Merit Grant"]
    );
}

#[tokio::test]
async fn e2e_health_and_status() {
    let store: Arc<dyn StudentStore> = Arc::new(InMemoryStore::new());
    let h = harness(store, "http://127.0.0.1:1", &[]).await;

    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = h
        .app
        .oneshot(Request::builder().uri("/v1/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let status: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(status["provider"], "e2e_mock");
    assert_eq!(status["catalog_url"], "http://127.0.0.1:1");
}
