//! HTTP surface: `POST /ask` and a liveness probe on `GET /`.
//!
//! The handlers are thin: extract a video id, run the resolver (when the
//! configured locator backend wants a transcript), delegate to the locator,
//! map the error taxonomy onto status codes. Anything stateful lives in
//! [`AppState`], built once at startup.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use topicmark_core::{Error, Result, VideoId};
use topicmark_local::{
    default_resolver, http_client, GeminiClient, LocatorBackend, TopicLocator, TranscriptResolver,
};

pub struct AppState {
    pub resolver: TranscriptResolver,
    pub locator: TopicLocator,
    pub backend: LocatorBackend,
}

/// Build the serving state from the environment. Fails (startup-fatal for
/// `serve`) when the generation credential is missing.
pub fn build_state() -> Result<Arc<AppState>> {
    let client = http_client()?;
    let gemini = GeminiClient::from_env(client.clone())?;
    Ok(Arc::new(AppState {
        resolver: default_resolver(&client),
        locator: TopicLocator::new(gemini),
        backend: LocatorBackend::from_env(),
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/ask", post(ask))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub video_url: String,
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub timestamp: String,
    pub video_url: String,
    pub topic: String,
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "topicmark is running"
    }))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> std::result::Result<Json<AskResponse>, (StatusCode, String)> {
    let timestamp = answer(&state, &req.video_url, &req.topic)
        .await
        .map_err(|e| {
            tracing::warn!(video_url = %req.video_url, error = %e, "ask failed");
            (status_for(&e), e.to_string())
        })?;
    Ok(Json(AskResponse {
        timestamp,
        video_url: req.video_url,
        topic: req.topic,
    }))
}

/// The whole request flow, shared by the HTTP handler and the one-shot CLI.
pub async fn answer(state: &AppState, video_url: &str, topic: &str) -> Result<String> {
    // Reject malformed URLs before any network or tool is touched,
    // whichever backend is configured.
    let video_id = VideoId::from_url(video_url)?;

    match state.backend {
        LocatorBackend::Transcript => {
            let transcript = state.resolver.resolve(&video_id).await?;
            tracing::debug!(entries = transcript.len(), "transcript resolved");
            state.locator.locate_in_transcript(&transcript, topic).await
        }
        LocatorBackend::VideoUrl => state.locator.locate_in_video_url(video_url, topic).await,
        LocatorBackend::MediaUpload => {
            state.locator.locate_via_media_upload(video_url, topic).await
        }
    }
}

/// Input and upstream-unavailability problems are the caller's 400s;
/// generation/config problems are our 500s.
fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::InvalidUrl(_)
        | Error::NoCaptions(_)
        | Error::UnparseableCaptions(_)
        | Error::AllStrategiesFailed(_)
        | Error::Strategy(_) => StatusCode::BAD_REQUEST,
        Error::Generation(_) | Error::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use tower::ServiceExt;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn state_with_gemini_at(base: &str) -> Arc<AppState> {
        std::env::set_var("TOPICMARK_GEMINI_API_KEY", "test-key");
        std::env::set_var("TOPICMARK_GEMINI_BASE_URL", base);
        let state = build_state().unwrap();
        std::env::remove_var("TOPICMARK_GEMINI_BASE_URL");
        std::env::remove_var("TOPICMARK_GEMINI_API_KEY");
        state
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    #[allow(clippy::await_holding_lock)]
    async fn liveness_probe_answers() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let app = router(state_with_gemini_at("http://127.0.0.1:1"));
        let resp = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["status"], "ok");
    }

    #[tokio::test]
    #[allow(clippy::await_holding_lock)]
    async fn invalid_url_is_a_400_before_any_network() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        // Unroutable Gemini base: the request must fail on URL validation,
        // never reaching the resolver or the model.
        let app = router(state_with_gemini_at("http://127.0.0.1:1"));
        let req = Request::post("/ask")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"video_url": "https://example.com/nope", "topic": "rust"}"#,
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[allow(clippy::await_holding_lock)]
    async fn missing_credential_refuses_to_build() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let prev_a = std::env::var("TOPICMARK_GEMINI_API_KEY").ok();
        let prev_b = std::env::var("GEMINI_API_KEY").ok();
        std::env::remove_var("TOPICMARK_GEMINI_API_KEY");
        std::env::remove_var("GEMINI_API_KEY");
        match build_state() {
            Err(Error::NotConfigured(_)) => {}
            other => panic!("expected NotConfigured, got {:?}", other.map(|_| ())),
        }
        if let Some(v) = prev_a {
            std::env::set_var("TOPICMARK_GEMINI_API_KEY", v);
        }
        if let Some(v) = prev_b {
            std::env::set_var("GEMINI_API_KEY", v);
        }
    }

    #[tokio::test]
    #[allow(clippy::await_holding_lock)]
    async fn video_url_backend_round_trips_through_the_model() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let app_model = axum::Router::new().route(
            "/v1beta/models/gemini-2.0-flash:generateContent",
            axum::routing::post(|| async {
                Json(serde_json::json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "{\"timestamp\": \"00:05:47\"}"}]}
                    }]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app_model).await.unwrap();
        });

        std::env::set_var("TOPICMARK_LOCATOR_BACKEND", "video-url");
        let app = router(state_with_gemini_at(&format!("http://{addr}")));
        std::env::remove_var("TOPICMARK_LOCATOR_BACKEND");

        let req = Request::post("/ask")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"video_url": "https://youtu.be/dQw4w9WgXcQ", "topic": "the chorus"}"#,
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["timestamp"], "00:05:47");
        assert_eq!(v["video_url"], "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(v["topic"], "the chorus");
    }
}
