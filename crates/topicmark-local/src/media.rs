//! Bounded audio extraction via `yt-dlp`.
//!
//! Only used by the media-upload locator backend. The extraction is
//! blocking (spawn + coarse wait loop); async callers wrap it in
//! `spawn_blocking`. The audio lands in a scoped temp dir owned by the
//! returned handle, so cleanup happens on every exit path, including
//! the failure ones.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use topicmark_core::{Error, Result};

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn ytdlp_bin_from_env() -> String {
    env("TOPICMARK_YTDLP_BIN").unwrap_or_else(|| "yt-dlp".to_string())
}

pub fn audio_timeout_from_env() -> Duration {
    let ms = env("TOPICMARK_AUDIO_TIMEOUT_MS")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(300_000)
        .clamp(1_000, 600_000);
    Duration::from_millis(ms)
}

/// Is the extraction tool reachable? Used by `doctor`, never as a gate:
/// callers surface the spawn failure itself when the tool is missing.
pub fn ytdlp_available() -> bool {
    let bin = ytdlp_bin_from_env();
    if bin.contains(std::path::MAIN_SEPARATOR) {
        return std::path::Path::new(&bin).is_file();
    }
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(&bin).is_file())
}

/// Extracted audio plus the temp dir that owns it. Dropping this removes
/// the directory and everything in it.
#[derive(Debug)]
pub struct ExtractedAudio {
    _dir: tempfile::TempDir,
    pub path: PathBuf,
    pub mime_type: &'static str,
}

pub fn extract_audio(url: &str, timeout: Duration) -> Result<ExtractedAudio> {
    let tmpdir = tempfile::tempdir()
        .map_err(|e| Error::Generation(format!("audio tempdir: {e}")))?;
    let out_tmpl = tmpdir.path().join("%(id)s.%(ext)s");

    let mut cmd = Command::new(ytdlp_bin_from_env());
    cmd.arg("-x")
        .arg("--audio-format")
        .arg("m4a")
        .arg("--no-playlist")
        .arg("--no-warnings")
        .arg("-o")
        .arg(out_tmpl.to_string_lossy().to_string())
        .arg(url);

    // std::process::Command has no builtin timeout; spawn and wait with a
    // coarse sleep loop, killing on deadline.
    let mut child = cmd
        .spawn()
        .map_err(|e| Error::Generation(format!("audio tool spawn: {e}")))?;
    let start = std::time::Instant::now();
    loop {
        if let Some(st) = child
            .try_wait()
            .map_err(|e| Error::Generation(format!("audio tool wait: {e}")))?
        {
            if !st.success() {
                return Err(Error::Generation("audio tool nonzero exit".to_string()));
            }
            break;
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            return Err(Error::Generation("audio tool timeout".to_string()));
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let mut found: Option<PathBuf> = None;
    if let Ok(rd) = std::fs::read_dir(tmpdir.path()) {
        for ent in rd.flatten() {
            let p = ent.path();
            if p.extension().and_then(|s| s.to_str()) == Some("m4a") {
                found = Some(p);
                break;
            }
        }
    }
    let Some(path) = found else {
        return Err(Error::Generation("audio tool produced no output".to_string()));
    };

    Ok(ExtractedAudio {
        _dir: tmpdir,
        path,
        mime_type: "audio/mp4",
    })
}
