//! Caption payload parsing.
//!
//! Caption bodies come back in one of two shapes depending on which
//! strategy produced them:
//! - the JSON "events" shape (`events[].segs[].utf8`, offsets in ms), or
//! - the XML timedtext shape (`<text start="..." ...>...</text>` runs,
//!   entity-escaped).
//!
//! We try JSON first and fall back to XML scanning. We use quick-xml for
//! the XML shape because caption payloads nest markup inside cue text and
//! regex scanning over that is brittle.

use quick_xml::events::Event;
use topicmark_core::{CaptionTrack, Error, Result, Transcript, TranscriptEntry};

#[derive(Debug, serde::Deserialize)]
struct EventsBody {
    events: Option<Vec<CaptionEvent>>,
}

#[derive(Debug, serde::Deserialize)]
struct CaptionEvent {
    #[serde(rename = "tStartMs")]
    t_start_ms: Option<f64>,
    segs: Option<Vec<CaptionSeg>>,
}

#[derive(Debug, serde::Deserialize)]
struct CaptionSeg {
    utf8: Option<String>,
}

/// Parse a raw caption body into a transcript.
///
/// Fails with `UnparseableCaptions` when neither shape yields any entry.
pub fn parse_captions(raw: &str) -> Result<Transcript> {
    if let Some(t) = parse_events_json(raw) {
        if !t.is_empty() {
            return Ok(t);
        }
    }
    let t = parse_timedtext_xml(raw);
    if t.is_empty() {
        return Err(Error::UnparseableCaptions(format!(
            "no caption entries in {} byte body",
            raw.len()
        )));
    }
    Ok(t)
}

/// Among available tracks, prefer an English one, else the first listed.
pub fn select_caption_track(tracks: &[CaptionTrack]) -> Result<&CaptionTrack> {
    let track = tracks
        .iter()
        .find(|t| t.language_code.to_ascii_lowercase().starts_with("en"))
        .or_else(|| tracks.first())
        .ok_or_else(|| Error::NoCaptions("empty caption track list".to_string()))?;
    if track.base_url.trim().is_empty() {
        return Err(Error::NoCaptions(format!(
            "caption track {} has no fetchable url",
            track.language_code
        )));
    }
    Ok(track)
}

fn parse_events_json(raw: &str) -> Option<Transcript> {
    let body: EventsBody = serde_json::from_str(raw).ok()?;
    let events = body.events?;
    let mut entries = Vec::new();
    for ev in events {
        let Some(segs) = ev.segs else { continue };
        let text: String = segs.into_iter().filter_map(|s| s.utf8).collect();
        let text = text.trim().to_string();
        if text.is_empty() {
            continue;
        }
        entries.push(TranscriptEntry {
            text,
            start: ev.t_start_ms.unwrap_or(0.0) / 1000.0,
        });
    }
    Some(Transcript { entries })
}

fn parse_timedtext_xml(raw: &str) -> Transcript {
    let mut reader = quick_xml::Reader::from_str(raw);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut entries = Vec::new();
    let mut in_text = false;
    let mut start = 0.0f64;
    let mut cur = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) if e.name().as_ref() == b"text" => {
                in_text = true;
                start = 0.0;
                cur.clear();
                for a in e.attributes().flatten() {
                    if a.key.as_ref() == b"start" {
                        let v = a
                            .unescape_value()
                            .map(|v| v.to_string())
                            .unwrap_or_default();
                        start = v.trim().parse::<f64>().unwrap_or(0.0);
                    }
                }
            }
            Ok(Event::Text(t)) if in_text => {
                let piece = match t.unescape() {
                    Ok(cow) => cow.into_owned(),
                    // Payloads occasionally carry HTML-only entities
                    // (&nbsp;) the XML unescaper rejects.
                    Err(_) => String::from_utf8_lossy(t.as_ref()).into_owned(),
                };
                cur.push_str(&piece);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"text" => {
                in_text = false;
                // Some sources double-escape cue text; decode once more.
                let text = decode_entities(&cur).trim().to_string();
                if !text.is_empty() && start >= 0.0 {
                    entries.push(TranscriptEntry { text, start });
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
        buf.clear();
    }

    Transcript { entries }
}

/// Decode the caption-payload entity escapes (the five standard ones plus
/// the HTML-only `&nbsp;`).
fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&nbsp;", " ")
}
