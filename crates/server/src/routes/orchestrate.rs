use std::{convert::Infallible, time::Duration};

use axum::{
    Router,
    extract::{Query, State},
    response::{
        Json as ResponseJson,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::{Stream, StreamExt};
use orchestra::{OrchestrationEvent, OrchestrationResult};
use serde::Deserialize;
use ts_rs::TS;

use crate::{AppState, error::ApiError, response::ApiResponse};

#[derive(Debug, Deserialize)]
pub struct OrchestrateQuery {
    #[serde(default)]
    pub scenario: String,
    /// Overrides the configured model for this run only
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct OrchestrateRequest {
    pub scenario: String,
    #[serde(default)]
    pub model: Option<String>,
}

fn require_scenario(scenario: &str) -> Result<&str, ApiError> {
    let scenario = scenario.trim();
    if scenario.is_empty() {
        return Err(ApiError::BadRequest("Scenario must not be empty".to_string()));
    }
    Ok(scenario)
}

/// Unnamed SSE message carrying the `{event, data}` JSON envelope
fn to_sse(event: &OrchestrationEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            tracing::error!("Failed to serialize {} event: {}", event.kind(), e);
            Event::default().comment("unserializable event")
        }
    }
}

/// Stream a run as server-sent events; always ends with `done`
pub async fn stream_orchestration(
    State(state): State<AppState>,
    Query(query): Query<OrchestrateQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let scenario = require_scenario(&query.scenario)?;
    tracing::info!("Streaming orchestration for scenario: {}", scenario);

    let events = state.runtime().stream(scenario, query.model.as_deref());
    let stream = events.map(|event| Ok(to_sse(&event)));

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}

/// Run a scenario to completion and return the aggregate
pub async fn run_orchestration(
    State(state): State<AppState>,
    ResponseJson(request): ResponseJson<OrchestrateRequest>,
) -> Result<ResponseJson<ApiResponse<OrchestrationResult>>, ApiError> {
    let scenario = require_scenario(&request.scenario)?;
    tracing::info!("Running orchestration for scenario: {}", scenario);

    let result = state
        .runtime()
        .run(scenario, request.model.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/orchestrate",
        get(stream_orchestration).post(run_orchestration),
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use orchestra::{
        WorkSpec,
        testing::{ScriptedProvider, analysis_json, runtime},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{AppState, routes};

    fn app(provider: ScriptedProvider) -> axum::Router {
        routes::router(AppState::new(runtime(provider)))
    }

    fn specs() -> Vec<WorkSpec> {
        vec![
            WorkSpec::new("Intake", "Reception").with_responsibility("record the incident"),
            WorkSpec::new("Responder", "Field ops")
                .with_responsibility("dispatch a crew")
                .depends_on("Intake"),
        ]
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sse_payloads(body: &str) -> Vec<Value> {
        body.lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(ScriptedProvider::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn test_stream_emits_envelopes_until_done() {
        let app = app(ScriptedProvider::new().analysis(analysis_json(&specs())));
        let response = app
            .oneshot(
                Request::get("/api/orchestrate?scenario=Gas%20leak%20on%20Elm%20street")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payloads = sse_payloads(&String::from_utf8_lossy(&bytes));

        assert_eq!(payloads.first().unwrap()["event"], "status");
        assert_eq!(payloads.last().unwrap()["event"], "done");
        let completed = payloads
            .iter()
            .find(|p| p["event"] == "orchestration_completed")
            .unwrap();
        assert_eq!(completed["data"]["execution_order"][1], "Responder");
    }

    #[tokio::test]
    async fn test_stream_reports_failures_in_band() {
        let app = app(
            ScriptedProvider::new()
                .analysis(analysis_json(&specs()))
                .fail_for("Responder"),
        );
        let response = app
            .oneshot(
                Request::get("/api/orchestrate?scenario=Gas%20leak")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let events: Vec<String> = sse_payloads(&String::from_utf8_lossy(&bytes))
            .iter()
            .map(|p| p["event"].as_str().unwrap().to_string())
            .collect();

        assert_eq!(&events[events.len() - 2..], &["error", "done"]);
    }

    #[tokio::test]
    async fn test_stream_rejects_empty_scenario() {
        let response = app(ScriptedProvider::new())
            .oneshot(
                Request::get("/api/orchestrate?scenario=%20%20")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_post_returns_aggregate() {
        let app = app(ScriptedProvider::new().analysis(analysis_json(&specs())));
        let response = app
            .oneshot(
                Request::post("/api/orchestrate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"scenario": "Gas leak", "model": "llama-3.1-8b-instant"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["agents_created"], 2);
        assert_eq!(json["data"]["results"][0]["agent"], "Intake");
    }

    #[tokio::test]
    async fn test_post_cycle_is_unprocessable() {
        let cyclic = vec![
            WorkSpec::new("A", "x").depends_on("B"),
            WorkSpec::new("B", "y").depends_on("A"),
        ];
        let response = app(ScriptedProvider::new().analysis(analysis_json(&cyclic)))
            .oneshot(
                Request::post("/api/orchestrate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"scenario": "Deadlock"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .contains("Circular dependency")
        );
    }

    #[tokio::test]
    async fn test_post_unreachable_service_is_bad_gateway() {
        let response = app(ScriptedProvider::new().fail_analysis())
            .oneshot(
                Request::post("/api/orchestrate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"scenario": "Anything"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
