//! Video identifier extraction.
//!
//! YouTube ids are 11 characters of `[0-9A-Za-z_-]`. We recognize the URL
//! shapes the service has actually seen in the wild, tried in a fixed
//! order with the first match winning. Ambiguous URLs resolve to the first
//! matching pattern, not the most specific one.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

const ID_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    /// Extract an id from a raw URL string.
    ///
    /// Patterns, in order: `v=<id>` / `/<id>` (any path segment),
    /// `youtu.be/<id>`, `embed/<id>`. The capture is always the first
    /// 11-character id-charset run after the matched marker.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        for marker in ["v=", "/", "youtu.be/", "embed/"] {
            if let Some(id) = id_after(url, marker) {
                return Ok(Self(id));
            }
        }
        Err(Error::InvalidUrl(format!(
            "no video id found in {url:?} (expected watch?v=, youtu.be/, or embed/ form)"
        )))
    }

    /// Accept a bare 11-character id without URL wrapping.
    pub fn from_raw(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.len() == ID_LEN && raw.chars().all(is_id_char) {
            return Ok(Self(raw.to_string()));
        }
        Err(Error::InvalidUrl(format!(
            "{raw:?} is not an 11-character video id"
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// First 11-char id-charset run following any occurrence of `marker`.
fn id_after(s: &str, marker: &str) -> Option<String> {
    let mut from = 0;
    while let Some(i) = s[from..].find(marker) {
        let tail = &s[from + i + marker.len()..];
        let run: String = tail.chars().take_while(|c| is_id_char(*c)).collect();
        if run.len() >= ID_LEN {
            return Some(run[..ID_LEN].to_string());
        }
        from += i + marker.len();
    }
    None
}
