//! REST API server for evaluating submissions
//!
//! ## Endpoints
//!
//! GET  /health                       - Liveness check
//! POST /api/v1/evaluations           - Evaluate a program against one test case
//! GET  /api/v1/evaluations           - List past evaluations
//! GET  /api/v1/evaluations/{id}      - Get one evaluation
//!
//! The listen address is read from `JUDGE_SERVER_ADDR` (default 127.0.0.1:8080).
//! History is kept in memory, holding at most `JUDGE_SERVER_HISTORY` records
//! (default 1000); the oldest are dropped first.

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use chrono::{DateTime, Utc};
use judge_rs::{
    ComparisonPolicy, ExpectedOutput, Limits, StandardChecker, Submission, Verdict, VerdictEngine,
    DEFAULT_DEBUG_MARKER,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_HISTORY_LIMIT: usize = 1000;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let addr = std::env::var("JUDGE_SERVER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let history_limit = std::env::var("JUDGE_SERVER_HISTORY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);
    let state = web::Data::new(
        AppState::new(VerdictEngine::default()).with_history_limit(history_limit),
    );

    info!(
        "Judge REST API server starting on http://{} (keeping {} evaluations)",
        addr, history_limit
    );

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind(addr)?
        .run()
        .await
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check)).service(
        web::scope("/api/v1")
            .route("/evaluations", web::post().to(create_evaluation))
            .route("/evaluations", web::get().to(list_evaluations))
            .route("/evaluations/{id}", web::get().to(get_evaluation)),
    );
}

// ============ API Types ============

#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// Program to run
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Bytes fed to stdin
    #[serde(default)]
    pub input: String,
    /// Expected output
    pub expected: String,
    /// Wall-clock limit in milliseconds (default 2000)
    pub time_ms: Option<u64>,
    /// Memory limit, e.g. "64M" (default 256M)
    pub memory: Option<String>,
    #[serde(default)]
    pub policy: ComparisonPolicy,
    pub debug_marker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub program: String,
    pub limits: Limits,
    pub policy: ComparisonPolicy,
    pub verdict: Verdict,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    fn error(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

// ============ Application State ============

pub struct AppState {
    engine: VerdictEngine,
    evaluations: Mutex<HashMap<String, EvaluationRecord>>,
    history_limit: usize,
}

impl AppState {
    fn new(engine: VerdictEngine) -> Self {
        Self {
            engine,
            evaluations: Mutex::new(HashMap::new()),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Keep at most `limit` records (at least one)
    fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    fn evaluations(&self) -> MutexGuard<'_, HashMap<String, EvaluationRecord>> {
        self.evaluations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a record, evicting the oldest ones past the history limit
    fn remember(&self, record: EvaluationRecord) {
        let mut evaluations = self.evaluations();
        evaluations.insert(record.id.clone(), record);

        while evaluations.len() > self.history_limit {
            let oldest = evaluations
                .values()
                .min_by_key(|r| r.created_at)
                .map(|r| r.id.clone());
            match oldest {
                Some(id) => {
                    debug!("Dropping evaluation {} from history", id);
                    evaluations.remove(&id);
                }
                None => break,
            }
        }
    }
}

impl EvaluationRequest {
    fn limits(&self) -> judge_rs::Result<Limits> {
        let defaults = Limits::default();
        let time_ms = self.time_ms.unwrap_or(defaults.time_ms);
        match &self.memory {
            Some(memory) => Limits::parse(time_ms, memory),
            None => {
                let limits = Limits::new(time_ms, defaults.memory_bytes);
                limits.validate()?;
                Ok(limits)
            }
        }
    }

    fn submission(&self) -> Submission {
        self.env.iter().fold(
            Submission::new(&self.program).args(self.args.iter().cloned()),
            |submission, (key, value)| submission.env(key, value),
        )
    }
}

// ============ Handlers ============

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "judge-rs",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Evaluate a submission; the verdict is returned and kept for later lookup
async fn create_evaluation(
    req: web::Json<EvaluationRequest>,
    state: web::Data<AppState>,
) -> impl Responder {
    let req = req.into_inner();

    let limits = match req.limits() {
        Ok(limits) => limits,
        Err(e) => {
            return HttpResponse::BadRequest()
                .json(ApiResponse::<()>::error(format!("Invalid limits: {}", e)));
        }
    };
    if let Err(e) = req.policy.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Invalid policy: {}", e)));
    }

    let engine = state.engine.clone();
    let submission = req.submission();
    let input = req.input.clone().into_bytes();
    let expected = ExpectedOutput::new(req.expected.clone());
    let checker = StandardChecker::new(req.policy).with_debug_marker(
        req.debug_marker
            .clone()
            .unwrap_or_else(|| DEFAULT_DEBUG_MARKER.to_string()),
    );

    let verdict = match web::block(move || {
        engine.evaluate_with(submission, &input, &expected, limits, &checker)
    })
    .await
    {
        Ok(verdict) => verdict,
        Err(e) => {
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error(format!("Evaluation failed: {}", e)));
        }
    };

    let record = EvaluationRecord {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        program: req.program,
        limits,
        policy: req.policy,
        verdict,
    };
    info!("Evaluation {}: {}", record.id, record.verdict);

    state.remember(record.clone());

    HttpResponse::Created().json(ApiResponse::ok(
        format!("Verdict: {}", record.verdict.kind),
        record,
    ))
}

/// List evaluations, oldest first
async fn list_evaluations(state: web::Data<AppState>) -> impl Responder {
    let mut records: Vec<EvaluationRecord> = state.evaluations().values().cloned().collect();
    records.sort_by_key(|r| r.created_at);

    HttpResponse::Ok().json(ApiResponse::ok(
        format!("Found {} evaluations", records.len()),
        records,
    ))
}

async fn get_evaluation(id: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    match state.evaluations().get(id.as_str()) {
        Some(record) => HttpResponse::Ok().json(ApiResponse::ok("Evaluation found", record)),
        None => HttpResponse::NotFound().json(ApiResponse::<()>::error(format!(
            "Evaluation not found: {}",
            id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web};
    use judge_rs::{ResourceUsage, VerdictKind};
    use serde_json::Value;

    fn status_of<R: Responder>(resp: R) -> StatusCode {
        resp.respond_to(&test::TestRequest::default().to_http_request())
            .status()
    }

    fn request(program: &str, input: &str, expected: &str) -> EvaluationRequest {
        EvaluationRequest {
            program: program.to_string(),
            args: Vec::new(),
            env: HashMap::new(),
            input: input.to_string(),
            expected: expected.to_string(),
            time_ms: Some(2000),
            memory: Some("64M".to_string()),
            policy: ComparisonPolicy::ExactToken,
            debug_marker: None,
        }
    }

    fn record(id: &str, created_at: DateTime<Utc>) -> EvaluationRecord {
        EvaluationRecord {
            id: id.to_string(),
            created_at,
            program: "/bin/true".to_string(),
            limits: Limits::default(),
            policy: ComparisonPolicy::ExactToken,
            verdict: Verdict::new(VerdictKind::Accepted, "", ResourceUsage::default()),
        }
    }

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState::new(VerdictEngine::default()))
    }

    #[actix_web::test]
    async fn health_endpoint_works() {
        assert_eq!(status_of(health_check().await), StatusCode::OK);
    }

    #[actix_web::test]
    async fn evaluation_is_created_and_stored() {
        let state = state();
        let resp = create_evaluation(web::Json(request("/bin/cat", "42\n", "42")), state.clone()).await;
        assert_eq!(status_of(resp), StatusCode::CREATED);

        let records = state.evaluations();
        assert_eq!(records.len(), 1);
        let record = records.values().next().unwrap();
        assert!(record.verdict.is_accepted(), "{}", record.verdict);
        assert_eq!(record.limits.memory_bytes, 64 * 1024 * 1024);
    }

    #[actix_web::test]
    async fn history_drops_the_oldest_evaluations() {
        let state = web::Data::new(
            AppState::new(VerdictEngine::default()).with_history_limit(2),
        );
        for n in 1..=3 {
            let input = format!("{}\n", n);
            let resp = create_evaluation(
                web::Json(request("/bin/cat", &input, &n.to_string())),
                state.clone(),
            )
            .await;
            assert_eq!(status_of(resp), StatusCode::CREATED);
        }

        let records = state.evaluations();
        assert_eq!(records.len(), 2);
        assert!(records.values().all(|r| r.verdict.is_accepted()));
    }

    #[core::prelude::v1::test]
    fn remember_evicts_by_creation_time() {
        let state = AppState::new(VerdictEngine::default()).with_history_limit(2);
        let base = Utc::now();
        for (id, age_secs) in [("b", 20), ("a", 30), ("c", 10)] {
            state.remember(record(id, base - chrono::Duration::seconds(age_secs)));
        }

        let evaluations = state.evaluations();
        let mut ids: Vec<&str> = evaluations.keys().map(String::as_str).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[actix_web::test]
    async fn invalid_memory_is_bad_request() {
        let mut req = request("/bin/cat", "", "");
        req.memory = Some("lots".to_string());
        let resp = create_evaluation(web::Json(req), state()).await;
        assert_eq!(status_of(resp), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn invalid_policy_is_bad_request() {
        let mut req = request("/bin/cat", "", "");
        req.policy = ComparisonPolicy::tolerance(-1.0, 0.0);
        let state = state();
        let resp = create_evaluation(web::Json(req), state.clone()).await;
        assert_eq!(status_of(resp), StatusCode::BAD_REQUEST);
        assert!(state.evaluations().is_empty());
    }

    #[actix_web::test]
    async fn get_evaluation_not_found() {
        let resp = get_evaluation(web::Path::from("nonexistent".to_string()), state()).await;
        assert_eq!(status_of(resp), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn list_evaluations_empty() {
        assert_eq!(status_of(list_evaluations(state()).await), StatusCode::OK);
    }

    #[actix_web::test]
    async fn evaluation_round_trip_over_http() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let mut body = request("/bin/cat", "1 2\n", "1 3");
        body.env.insert("LANG".to_string(), "C".to_string());
        let req = test::TestRequest::post()
            .uri("/api/v1/evaluations")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["success"], true);
        assert_eq!(created["data"]["verdict"]["kind"], "wrong_answer");
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/evaluations/{}", id))
            .to_request();
        let fetched: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["data"]["id"], id.as_str());
        assert_eq!(fetched["data"]["policy"]["type"], "exact-token");

        let req = test::TestRequest::get().uri("/api/v1/evaluations").to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn request_defaults_apply() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/evaluations")
            .set_json(serde_json::json!({"program": "/bin/cat", "expected": ""}))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(created["data"]["verdict"]["kind"], "accepted");
        assert_eq!(created["data"]["limits"]["time_ms"], 2000);
        assert_eq!(created["data"]["limits"]["memory_bytes"], 256 * 1024 * 1024);
    }
}
