//! Gemini text/multimodal backend.
//!
//! One small client for the three generation paths the locator can take:
//! - text prompt (transcript rendering) with a JSON response schema,
//! - a `file_data` part pointing straight at a public video URL,
//! - a `file_data` part pointing at a file uploaded via the Files API
//!   (upload, poll until ACTIVE, generate, delete).
//!
//! Wire shapes are kept to the minimum we consume; everything else in the
//! provider's responses is ignored.

use serde::Serialize;
use std::time::Duration;
use topicmark_core::{Error, Result};

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn api_key_from_env() -> Option<String> {
    env("TOPICMARK_GEMINI_API_KEY").or_else(|| env("GEMINI_API_KEY"))
}

pub fn model_from_env() -> String {
    env("TOPICMARK_GEMINI_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string())
}

fn base_url_from_env() -> String {
    env("TOPICMARK_GEMINI_BASE_URL")
        .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string())
}

fn generate_timeout_from_env() -> Duration {
    let ms = env("TOPICMARK_GEMINI_TIMEOUT_MS")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(30_000)
        .clamp(200, 300_000);
    Duration::from_millis(ms)
}

fn poll_interval_from_env() -> Duration {
    let ms = env("TOPICMARK_UPLOAD_POLL_INTERVAL_MS")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(5_000)
        .clamp(10, 60_000);
    Duration::from_millis(ms)
}

fn upload_ready_timeout_from_env() -> Duration {
    let ms = env("TOPICMARK_UPLOAD_READY_TIMEOUT_MS")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(120_000)
        .clamp(100, 600_000);
    Duration::from_millis(ms)
}

#[derive(Debug, Serialize)]
struct ReqPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

#[derive(Debug, Serialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct ReqContent {
    parts: Vec<ReqPart>,
}

#[derive(Debug, Serialize)]
struct GenCfg {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateReq {
    contents: Vec<ReqContent>,
    generation_config: GenCfg,
}

/// Handle to a file living in the provider's Files API. Must be deleted on
/// every exit path; see `media_upload` in the locator.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub name: String,
    pub uri: String,
    pub state: String,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base: String,
}

impl GeminiClient {
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = api_key_from_env().ok_or_else(|| {
            Error::NotConfigured(
                "missing TOPICMARK_GEMINI_API_KEY (or GEMINI_API_KEY)".to_string(),
            )
        })?;
        Ok(Self {
            client,
            api_key,
            model: model_from_env(),
            base: base_url_from_env().trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base, self.model, self.api_key
        )
    }

    fn timestamp_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "timestamp": {
                    "type": "string",
                    "description": "Timestamp in HH:MM:SS format"
                }
            },
            "required": ["timestamp"]
        })
    }

    async fn generate(&self, parts: Vec<ReqPart>, timeout: Duration) -> Result<String> {
        let req = GenerateReq {
            contents: vec![ReqContent { parts }],
            generation_config: GenCfg {
                response_mime_type: "application/json",
                response_schema: Self::timestamp_schema(),
                temperature: 0.0,
            },
        };

        let resp = self
            .client
            .post(self.generate_endpoint())
            .timeout(timeout)
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("gemini request: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Generation(format!("gemini HTTP {status}")));
        }
        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Generation(format!("gemini bad json: {e}")))?;

        let out = response_text(&v);
        if out.trim().is_empty() {
            return Err(Error::Generation("gemini empty output".to_string()));
        }
        Ok(out)
    }

    /// Text-only generation; returns the model's raw (JSON-shaped) answer.
    pub async fn generate_from_text(&self, prompt: &str) -> Result<String> {
        self.generate(
            vec![ReqPart {
                text: Some(prompt.to_string()),
                file_data: None,
            }],
            generate_timeout_from_env(),
        )
        .await
    }

    /// Generation over a remote media reference (public video URL or an
    /// uploaded-file URI). Longer timeout: the provider fetches and watches
    /// the media server-side.
    pub async fn generate_from_file_uri(
        &self,
        file_uri: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<String> {
        self.generate(
            vec![
                ReqPart {
                    text: None,
                    file_data: Some(FileData {
                        mime_type: mime_type.to_string(),
                        file_uri: file_uri.to_string(),
                    }),
                },
                ReqPart {
                    text: Some(prompt.to_string()),
                    file_data: None,
                },
            ],
            generate_timeout_from_env().max(Duration::from_secs(120)),
        )
        .await
    }

    /// Single-shot raw upload into the Files API.
    pub async fn upload_file(&self, bytes: Vec<u8>, mime_type: &str) -> Result<RemoteFile> {
        let url = format!("{}/upload/v1beta/files?key={}", self.base, self.api_key);
        let resp = self
            .client
            .post(url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .timeout(generate_timeout_from_env().max(Duration::from_secs(120)))
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("file upload: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Generation(format!("file upload HTTP {status}")));
        }
        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Generation(format!("file upload bad json: {e}")))?;
        remote_file_from_value(v.get("file").unwrap_or(&v))
            .ok_or_else(|| Error::Generation("file upload response missing file".to_string()))
    }

    /// Block until the uploaded file is ready to reference.
    ///
    /// Explicit bounded loop with fixed backoff (not recursion) so the
    /// timeout behavior is testable in isolation: poll every interval,
    /// fail on state FAILED, give up at the deadline.
    pub async fn wait_until_active(&self, file: &RemoteFile) -> Result<()> {
        if file.state == "ACTIVE" {
            return Ok(());
        }
        let interval = poll_interval_from_env();
        let deadline = tokio::time::Instant::now() + upload_ready_timeout_from_env();
        loop {
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Generation(format!(
                    "file {} not ready before deadline",
                    file.name
                )));
            }
            tokio::time::sleep(interval).await;

            let url = format!("{}/v1beta/{}?key={}", self.base, file.name, self.api_key);
            let resp = self
                .client
                .get(url)
                .timeout(generate_timeout_from_env())
                .send()
                .await
                .map_err(|e| Error::Generation(format!("file poll: {e}")))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(Error::Generation(format!("file poll HTTP {status}")));
            }
            let v: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| Error::Generation(format!("file poll bad json: {e}")))?;
            match v.get("state").and_then(|s| s.as_str()).unwrap_or("") {
                "ACTIVE" => return Ok(()),
                "FAILED" => {
                    return Err(Error::Generation(format!(
                        "file {} failed server-side processing",
                        file.name
                    )))
                }
                _ => {}
            }
        }
    }

    /// Best-effort remote cleanup; callers ignore the result on failure
    /// paths but must always invoke it.
    pub async fn delete_file(&self, file: &RemoteFile) -> Result<()> {
        let url = format!("{}/v1beta/{}?key={}", self.base, file.name, self.api_key);
        let resp = self
            .client
            .delete(url)
            .timeout(generate_timeout_from_env())
            .send()
            .await
            .map_err(|e| Error::Generation(format!("file delete: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Generation(format!("file delete HTTP {status}")));
        }
        Ok(())
    }
}

fn remote_file_from_value(v: &serde_json::Value) -> Option<RemoteFile> {
    let name = v.get("name")?.as_str()?.to_string();
    let uri = v.get("uri").and_then(|u| u.as_str()).unwrap_or("").to_string();
    let state = v
        .get("state")
        .and_then(|s| s.as_str())
        .unwrap_or("PROCESSING")
        .to_string();
    Some(RemoteFile { name, uri, state })
}

/// candidates[0].content.parts[*].text, newline-joined.
fn response_text(v: &serde_json::Value) -> String {
    let mut out = String::new();
    if let Some(cands) = v.get("candidates").and_then(|x| x.as_array()) {
        if let Some(c0) = cands.first() {
            if let Some(parts) = c0
                .get("content")
                .and_then(|x| x.get("parts"))
                .and_then(|x| x.as_array())
            {
                for p in parts {
                    if let Some(t) = p.get("text").and_then(|x| x.as_str()) {
                        if !out.is_empty() {
                            out.push('\n');
                        }
                        out.push_str(t);
                    }
                }
            }
        }
    }
    out
}
