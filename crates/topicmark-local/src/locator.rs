//! Topic location: transcript (or media) + topic phrase -> first `HH:MM:SS`.
//!
//! The transcript backend renders one `[HH:MM:SS] text` line per entry,
//! bounds the prompt, and asks the model for a JSON-shaped answer. Parsing
//! is deliberately lenient: a malformed model answer degrades to
//! `00:00:00` instead of failing the request, because a wrong-but-well-
//! formed answer serves this product better than a hard error.

use crate::gemini::{GeminiClient, RemoteFile};
use crate::media;
use topicmark_core::timestamp::{hms_from_seconds, normalize_timestamp};
use topicmark_core::{Error, Result, Transcript};

/// Rendered-transcript budget inside the prompt. Bounds external-call cost
/// and latency; anything beyond it is cut with a visible marker.
const TRANSCRIPT_PROMPT_MAX_CHARS: usize = 12_000;
const TRUNCATION_MARKER: &str = "\n[transcript truncated]";

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Which generation path answers the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorBackend {
    /// Resolve a transcript first, send its rendering as text. Default.
    Transcript,
    /// Hand the public video URL straight to the model as media.
    VideoUrl,
    /// Extract audio locally, upload it, reference the uploaded file.
    MediaUpload,
}

impl LocatorBackend {
    pub fn from_env() -> Self {
        match env("TOPICMARK_LOCATOR_BACKEND").as_deref() {
            Some("video-url") => Self::VideoUrl,
            Some("media-upload") => Self::MediaUpload,
            _ => Self::Transcript,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::VideoUrl => "video-url",
            Self::MediaUpload => "media-upload",
        }
    }

    /// Only the transcript backend needs the resolver to run at all.
    pub fn needs_transcript(&self) -> bool {
        matches!(self, Self::Transcript)
    }
}

pub struct TopicLocator {
    gemini: GeminiClient,
}

impl TopicLocator {
    pub fn new(gemini: GeminiClient) -> Self {
        Self { gemini }
    }

    pub async fn locate_in_transcript(&self, transcript: &Transcript, topic: &str) -> Result<String> {
        let prompt = transcript_prompt(transcript, topic);
        let raw = self.gemini.generate_from_text(&prompt).await?;
        Ok(parse_model_timestamp(&raw))
    }

    pub async fn locate_in_video_url(&self, video_url: &str, topic: &str) -> Result<String> {
        let raw = self
            .gemini
            .generate_from_file_uri(video_url, "video/*", &media_prompt(topic))
            .await?;
        Ok(parse_model_timestamp(&raw))
    }

    pub async fn locate_via_media_upload(&self, video_url: &str, topic: &str) -> Result<String> {
        let timeout = media::audio_timeout_from_env();
        let url = video_url.to_string();
        let audio = tokio::task::spawn_blocking(move || media::extract_audio(&url, timeout))
            .await
            .map_err(|e| Error::Generation(format!("audio extraction join: {e}")))??;
        let bytes = tokio::fs::read(&audio.path)
            .await
            .map_err(|e| Error::Generation(format!("audio read: {e}")))?;
        // `audio` still owns the temp dir here; it drops (and cleans up)
        // when this function returns, on every path.
        self.locate_with_uploaded_bytes(bytes, audio.mime_type, topic)
            .await
    }

    /// Upload, wait for readiness, generate, and always delete the remote
    /// handle afterwards, success or not.
    pub(crate) async fn locate_with_uploaded_bytes(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        topic: &str,
    ) -> Result<String> {
        let file = self.gemini.upload_file(bytes, mime_type).await?;
        let generated = self.generate_for_remote_file(&file, mime_type, topic).await;
        if let Err(e) = self.gemini.delete_file(&file).await {
            tracing::warn!(file = %file.name, error = %e, "remote file cleanup failed");
        }
        Ok(parse_model_timestamp(&generated?))
    }

    async fn generate_for_remote_file(
        &self,
        file: &RemoteFile,
        mime_type: &str,
        topic: &str,
    ) -> Result<String> {
        self.gemini.wait_until_active(file).await?;
        self.gemini
            .generate_from_file_uri(&file.uri, mime_type, &media_prompt(topic))
            .await
    }
}

/// One `[HH:MM:SS] text` line per entry, in transcript order.
pub fn render_transcript(transcript: &Transcript) -> String {
    let mut out = String::new();
    for e in &transcript.entries {
        out.push('[');
        out.push_str(&hms_from_seconds(e.start));
        out.push_str("] ");
        out.push_str(&e.text);
        out.push('\n');
    }
    out
}

fn bounded_rendering(transcript: &Transcript) -> String {
    let rendered = render_transcript(transcript);
    if rendered.chars().count() <= TRANSCRIPT_PROMPT_MAX_CHARS {
        return rendered;
    }
    let mut cut: String = rendered.chars().take(TRANSCRIPT_PROMPT_MAX_CHARS).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

fn transcript_prompt(transcript: &Transcript, topic: &str) -> String {
    format!(
        r#"You are given a timestamped transcript of a YouTube video.
Find the FIRST moment where the topic or phrase "{topic}" is spoken or discussed.

Transcript:
{rendering}
Return ONLY a JSON object in this exact format:
{{"timestamp": "HH:MM:SS"}}

Rules:
- HH:MM:SS format ONLY (e.g. "00:05:47", "01:23:45")
- Always include hours (even if zero: "00:")
- Return ONLY the JSON, nothing else"#,
        rendering = bounded_rendering(transcript),
    )
}

fn media_prompt(topic: &str) -> String {
    format!(
        r#"Watch this video and find the FIRST moment where the topic or phrase "{topic}" is spoken or discussed.

Return ONLY a JSON object in this exact format:
{{"timestamp": "HH:MM:SS"}}

Rules:
- HH:MM:SS format ONLY (e.g. "00:05:47", "01:23:45")
- Always include hours (even if zero: "00:")
- Return ONLY the JSON, nothing else"#
    )
}

#[derive(Debug, serde::Deserialize)]
struct TimestampAnswer {
    timestamp: Option<String>,
}

/// Strict JSON parse first, then a scan for the first `H{1,2}:MM:SS` run,
/// then the `00:00:00` default. Always normalized.
pub fn parse_model_timestamp(raw: &str) -> String {
    if let Ok(ans) = serde_json::from_str::<TimestampAnswer>(raw.trim()) {
        if let Some(ts) = ans.timestamp {
            return normalize_timestamp(&ts);
        }
    }
    if let Some(ts) = scan_timestamp(raw) {
        return normalize_timestamp(&ts);
    }
    "00:00:00".to_string()
}

/// First `H{1,2}:MM:SS` shaped run in free text.
fn scan_timestamp(text: &str) -> Option<String> {
    let b = text.as_bytes();
    let d = |i: usize| i < b.len() && b[i].is_ascii_digit();
    let c = |i: usize| i < b.len() && b[i] == b':';

    let try_at = |i: usize, hour_len: usize| -> Option<String> {
        let mut j = i;
        for _ in 0..hour_len {
            if !d(j) {
                return None;
            }
            j += 1;
        }
        if c(j) && d(j + 1) && d(j + 2) && c(j + 3) && d(j + 4) && d(j + 5) {
            return Some(text[i..j + 6].to_string());
        }
        None
    };

    for i in 0..b.len() {
        // Greedy hour width, like the pattern it mirrors.
        if let Some(m) = try_at(i, 2).or_else(|| try_at(i, 1)) {
            return Some(m);
        }
    }
    None
}
