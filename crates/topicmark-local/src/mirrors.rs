//! Last-resort strategy: public caption re-hosts.
//!
//! These endpoints are unaffiliated with the platform, so they keep working
//! when every first-party path is fingerprint-blocked; the cost is latency
//! and freshness. Each endpoint is tried independently and in order, and
//! responses may be either the JSON events shape or entity-encoded XML,
//! so both go through the shared caption parser.

use crate::captions::parse_captions;
use std::time::Duration;
use topicmark_core::{Error, Result, Transcript, TranscriptStrategy, VideoId};

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn timeout_from_env() -> Duration {
    let ms = env("TOPICMARK_STRATEGY_TIMEOUT_MS")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(15_000)
        .clamp(200, 120_000);
    Duration::from_millis(ms)
}

/// Endpoint templates; `{video_id}` is substituted per request.
///
/// Allow a comma/whitespace-separated override list so a blocked or dead
/// mirror can be swapped out without a rebuild.
pub fn mirror_endpoints_from_env() -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    if let Ok(v) = std::env::var("TOPICMARK_MIRROR_ENDPOINTS") {
        for raw in v.split(|c: char| c == ',' || c.is_whitespace()) {
            let s = raw.trim();
            if s.is_empty() {
                continue;
            }
            let s = s.to_string();
            if !out.contains(&s) {
                out.push(s);
            }
        }
    }
    if out.is_empty() {
        out = vec![
            "https://youtubetranscript.com/?server_vid2={video_id}".to_string(),
            "https://video.google.com/timedtext?lang=en&v={video_id}".to_string(),
        ];
    }
    out
}

pub struct MirrorStrategy {
    client: reqwest::Client,
    endpoints: Vec<String>,
}

impl MirrorStrategy {
    pub fn from_env(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoints: mirror_endpoints_from_env(),
        }
    }

    async fn fetch_one(&self, endpoint: &str, video_id: &VideoId) -> Result<Transcript> {
        let url = endpoint.replace("{video_id}", video_id.as_str());
        let resp = self
            .client
            .get(&url)
            .timeout(timeout_from_env())
            .send()
            .await
            .map_err(|e| Error::Strategy(format!("mirror request: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Strategy(format!("mirror HTTP {status}")));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Strategy(format!("mirror body: {e}")))?;
        parse_captions(&body)
    }
}

#[async_trait::async_trait]
impl TranscriptStrategy for MirrorStrategy {
    fn name(&self) -> &'static str {
        "mirrors"
    }

    async fn attempt(&self, video_id: &VideoId) -> Result<Transcript> {
        let mut failures: Vec<String> = Vec::new();
        for endpoint in &self.endpoints {
            match self.fetch_one(endpoint, video_id).await {
                Ok(t) if !t.is_empty() => return Ok(t),
                Ok(_) => failures.push("empty transcript".to_string()),
                Err(e) => failures.push(e.to_string()),
            }
        }
        Err(Error::Strategy(format!(
            "all mirrors failed ({})",
            failures.join(" | ")
        )))
    }
}
