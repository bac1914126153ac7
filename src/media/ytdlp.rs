use std::{path::Path, process::Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    types::{AudioFormat, AudioQuality, AudioSource, Candidate},
};

use super::{FetchRequest, MediaBackend};

/// Format selector: audio-only streams first, low-resolution muxed streams
/// as a fallback so the download stays small.
const FORMAT_SELECTOR: &str = "bestaudio[acodec!=none]/best[height<=720]";

/// Media backend that shells out to `yt-dlp`.
///
/// Searching uses `--flat-playlist --dump-json`, which prints one JSON object
/// per result without resolving streams. Fetching uses `-x` so yt-dlp hands
/// the stream to ffmpeg and leaves exactly one file with the requested
/// extension.
pub struct YtDlpBackend {
    executable: String,
    source: AudioSource,
}

impl YtDlpBackend {
    pub fn new(executable: impl Into<String>, source: AudioSource) -> Self {
        Self {
            executable: executable.into(),
            source,
        }
    }

    fn search_args(&self, query: &str, limit: usize) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
            "--ignore-errors".to_string(),
        ];

        match self.source {
            AudioSource::Youtube => {
                args.push(format!("ytsearch{}:{}", limit, query));
            }
            AudioSource::YoutubeMusic => {
                args.push("--playlist-end".to_string());
                args.push(limit.to_string());
                args.push(format!(
                    "https://music.youtube.com/search?q={}#songs",
                    urlencoding::encode(query)
                ));
            }
        }
        args
    }

    async fn run(&self, args: &[String]) -> Result<std::process::Output> {
        debug!(executable = %self.executable, ?args, "running media backend");
        Command::new(&self.executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Download(format!("cannot run {}: {}", self.executable, e)))
    }
}

#[async_trait]
impl MediaBackend for YtDlpBackend {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        let output = self.run(&self.search_args(query, limit)).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() && stdout.trim().is_empty() {
            return Err(Error::Download(format!(
                "search failed: {}",
                last_error_line(&output.stderr)
            )));
        }

        let mut candidates = parse_search_output(&stdout);
        candidates.truncate(limit);
        debug!(query, found = candidates.len(), "search finished");
        Ok(candidates)
    }

    async fn fetch(&self, request: FetchRequest<'_>) -> Result<()> {
        let args = fetch_args(&request)?;
        let output = self.run(&args).await?;

        if output.status.success() {
            return Ok(());
        }

        let message = last_error_line(&output.stderr);
        warn!(source = %request.candidate.source, error = %message, "yt-dlp failed");
        if is_postprocessing_error(&message) {
            Err(Error::Transcode(message))
        } else {
            Err(Error::Download(message))
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    url: Option<String>,
    webpage_url: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
}

/// Parses `--dump-json` output, one JSON object per line. Lines that do not
/// describe a playable entry are skipped; rank follows output order.
pub fn parse_search_output(stdout: &str) -> Vec<Candidate> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str::<SearchEntry>(l).ok())
        .filter_map(|entry| {
            let source = entry
                .webpage_url
                .clone()
                .or_else(|| entry.url.clone())
                .or_else(|| {
                    entry
                        .id
                        .as_ref()
                        .map(|id| format!("https://www.youtube.com/watch?v={}", id))
                })?;
            let title = display_title(&entry)?;
            Some((title, entry.duration, source))
        })
        .enumerate()
        .map(|(rank, (title, duration, source))| Candidate {
            title,
            duration_secs: duration.filter(|d| *d > 0.0).map(|d| d.round() as u32),
            source,
            rank,
        })
        .collect()
}

/// Prefixes the channel name when the title does not mention it, so
/// `"Around the World"` on `"Daft Punk - Topic"` reads like a full
/// `"artist - title"` line.
fn display_title(entry: &SearchEntry) -> Option<String> {
    let title = entry.title.as_deref()?.trim();
    if title.is_empty() {
        return None;
    }

    let channel = entry
        .channel
        .as_deref()
        .or(entry.uploader.as_deref())
        .map(|c| c.trim_end_matches(" - Topic").trim())
        .filter(|c| !c.is_empty());

    match channel {
        Some(c) if !title.to_lowercase().contains(&c.to_lowercase()) => {
            Some(format!("{} - {}", c, title))
        }
        _ => Some(title.to_string()),
    }
}

fn fetch_args(request: &FetchRequest<'_>) -> Result<Vec<String>> {
    let template = output_template(request.output)?;

    Ok(vec![
        "-f".to_string(),
        FORMAT_SELECTOR.to_string(),
        "-x".to_string(),
        "--audio-format".to_string(),
        request.format.extension().to_string(),
        "--audio-quality".to_string(),
        quality_arg(request.format, request.quality),
        "--no-playlist".to_string(),
        "--no-progress".to_string(),
        "--no-warnings".to_string(),
        "--no-embed-thumbnail".to_string(),
        "--no-write-thumbnail".to_string(),
        "-o".to_string(),
        template,
        request.candidate.source.clone(),
    ])
}

/// yt-dlp output template producing `output` once the extension is applied.
pub fn output_template(output: &Path) -> Result<String> {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Download(format!("invalid output path {}", output.display())))?;
    // '%' starts a template field
    let escaped = stem.replace('%', "%%");
    let file = format!("{}.%(ext)s", escaped);

    Ok(match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir.join(file).to_string_lossy().into_owned(),
        None => file,
    })
}

pub fn quality_arg(format: AudioFormat, quality: AudioQuality) -> String {
    match quality {
        _ if format.is_lossless() => "0".to_string(),
        AudioQuality::Best => "0".to_string(),
        AudioQuality::Kbps(k) => format!("{}K", k),
    }
}

fn is_postprocessing_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("postprocessing") || lower.contains("ffmpeg") || lower.contains("ffprobe")
}

fn last_error_line(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .or_else(|| text.lines().rev().find(|l| !l.trim().is_empty()))
        .unwrap_or("no error output")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn parses_search_lines_in_rank_order() {
        let stdout = r#"
{"id": "abc", "title": "Daft Punk - Around The World (Official Audio)", "duration": 429.4, "url": "https://www.youtube.com/watch?v=abc", "channel": "Daft Punk"}
not json
{"id": "def", "title": "Around the World", "duration": 431.0, "channel": "Daft Punk - Topic"}
{"id": "ghi", "title": "", "duration": 10.0}
{"id": "jkl", "title": "Stream", "duration": null, "webpage_url": "https://www.youtube.com/watch?v=jkl"}
"#;
        let candidates = parse_search_output(stdout);

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].rank, 0);
        assert_eq!(candidates[0].title, "Daft Punk - Around The World (Official Audio)");
        assert_eq!(candidates[0].duration_secs, Some(429));
        assert_eq!(candidates[1].title, "Daft Punk - Around the World");
        assert_eq!(candidates[1].source, "https://www.youtube.com/watch?v=def");
        assert_eq!(candidates[2].duration_secs, None);
        assert_eq!(candidates[2].rank, 2);
    }

    #[test]
    fn output_template_escapes_percent() {
        let template = output_template(&PathBuf::from("out/100% Pure - Song.flac")).unwrap();
        assert_eq!(
            template,
            PathBuf::from("out")
                .join("100%% Pure - Song.%(ext)s")
                .to_string_lossy()
        );
    }

    #[test]
    fn lossless_formats_ignore_bitrate() {
        assert_eq!(quality_arg(AudioFormat::Flac, AudioQuality::Kbps(128)), "0");
        assert_eq!(quality_arg(AudioFormat::Mp3, AudioQuality::Best), "0");
        assert_eq!(quality_arg(AudioFormat::Mp3, AudioQuality::Kbps(320)), "320K");
    }

    #[test]
    fn youtube_music_search_uses_search_url() {
        let backend = YtDlpBackend::new("yt-dlp", AudioSource::YoutubeMusic);
        let args = backend.search_args("Daft Punk - Around the World", 5);
        assert!(args.contains(&"5".to_string()));
        assert!(
            args.last()
                .unwrap()
                .starts_with("https://music.youtube.com/search?q=Daft%20Punk")
        );

        let backend = YtDlpBackend::new("yt-dlp", AudioSource::Youtube);
        let args = backend.search_args("query", 3);
        assert_eq!(args.last().unwrap(), "ytsearch3:query");
    }

    #[test]
    fn classifies_postprocessing_errors() {
        assert!(is_postprocessing_error("ERROR: Postprocessing: ffprobe and ffmpeg not found"));
        assert!(!is_postprocessing_error("ERROR: [youtube] abc: Video unavailable"));
    }

    #[test]
    fn picks_last_error_line() {
        let stderr = b"[youtube] abc: Downloading\nERROR: first\nWARNING: x\nERROR: Video unavailable\n";
        assert_eq!(last_error_line(stderr), "ERROR: Video unavailable");
        assert_eq!(last_error_line(b""), "no error output");
    }
}
