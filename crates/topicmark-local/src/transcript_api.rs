//! Primary acquisition strategy: the maintained `yt-transcript-rs` client.
//!
//! Highest fidelity when it works (it tracks the platform's moving target
//! logic upstream), but also the first thing the platform blocks, so every
//! failure here is recorded and the chain moves on.

use std::time::Duration;
use topicmark_core::{Error, Result, Transcript, TranscriptEntry, TranscriptStrategy, VideoId};
use yt_transcript_rs::api::YouTubeTranscriptApi;

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn languages_from_env() -> Vec<String> {
    let s = env("TOPICMARK_LANGS").unwrap_or_else(|| "en,en-US".to_string());
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn timeout_from_env() -> Duration {
    let ms = env("TOPICMARK_STRATEGY_TIMEOUT_MS")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(15_000)
        .clamp(200, 120_000);
    Duration::from_millis(ms)
}

pub struct TranscriptApiStrategy {
    languages: Vec<String>,
}

impl TranscriptApiStrategy {
    pub fn from_env() -> Self {
        Self {
            languages: languages_from_env(),
        }
    }
}

#[async_trait::async_trait]
impl TranscriptStrategy for TranscriptApiStrategy {
    fn name(&self) -> &'static str {
        "transcript_api"
    }

    async fn attempt(&self, video_id: &VideoId) -> Result<Transcript> {
        // The library owns its own HTTP client; construct per attempt so a
        // poisoned session never outlives one resolution.
        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| Error::Strategy(format!("transcript api init: {e}")))?;
        let langs: Vec<&str> = self.languages.iter().map(|s| s.as_str()).collect();

        let fetched = tokio::time::timeout(
            timeout_from_env(),
            api.fetch_transcript(video_id.as_str(), &langs, false),
        )
        .await
        .map_err(|_| Error::Strategy("transcript api timeout".to_string()))?
        .map_err(|e| Error::Strategy(format!("transcript api fetch: {e}")))?;

        let entries: Vec<TranscriptEntry> = fetched
            .snippets
            .into_iter()
            .map(|s| TranscriptEntry {
                text: s.text,
                start: s.start,
            })
            .filter(|e| !e.text.trim().is_empty())
            .collect();

        if entries.is_empty() {
            return Err(Error::Strategy(
                "transcript api returned no entries".to_string(),
            ));
        }
        Ok(Transcript { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn languages_default_to_english_variants() {
        std::env::remove_var("TOPICMARK_LANGS");
        assert_eq!(languages_from_env(), vec!["en", "en-US"]);
    }

    #[test]
    fn strategy_label_is_stable() {
        assert_eq!(TranscriptApiStrategy::from_env().name(), "transcript_api");
    }
}
