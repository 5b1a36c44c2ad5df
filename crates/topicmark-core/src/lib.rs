use serde::{Deserialize, Serialize};

pub mod timestamp;
pub mod video;

pub use video::VideoId;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("no captions available: {0}")]
    NoCaptions(String),
    #[error("unparseable captions: {0}")]
    UnparseableCaptions(String),
    #[error("all transcript strategies failed: {0}")]
    AllStrategiesFailed(String),
    #[error("strategy failed: {0}")]
    Strategy(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One caption line: text plus its offset from the start of the video in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub text: String,
    pub start: f64,
}

/// Ordered caption entries, in the order the source emitted them (not re-sorted).
///
/// An empty transcript is never a success value: strategies must return
/// `Error` rather than `Transcript::default()` when nothing was found.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A single language/style variant of timed captions, referenced by a fetchable URL.
/// Transient: only lives while a strategy resolves caption metadata into a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub language_code: String,
    pub base_url: String,
}

/// One self-contained method of acquiring a transcript for a video id.
///
/// Strategies carry no persistent state and are invoked at most once per
/// resolution attempt. The resolver owns the ordering and error aggregation.
#[async_trait::async_trait]
pub trait TranscriptStrategy: Send + Sync {
    /// Short stable label used in aggregated failure reports.
    fn name(&self) -> &'static str;
    async fn attempt(&self, video_id: &VideoId) -> Result<Transcript>;
}
