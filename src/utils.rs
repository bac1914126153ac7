use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::types::AudioQuality;

/// Longest file stem we hand to the filesystem, in characters.
pub const MAX_FILENAME_CHARS: usize = 200;

static RESERVED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

pub fn sanitize_filename(name: &str) -> String {
    let replaced = RESERVED_CHARS.replace_all(name, "_");
    let collapsed = WHITESPACE.replace_all(&replaced, " ");
    // trailing dots and spaces are rejected on Windows
    let trimmed = collapsed.trim().trim_end_matches(['.', ' ']);

    let truncated: String = trimmed.chars().take(MAX_FILENAME_CHARS).collect();
    let truncated = truncated.trim_end_matches(['.', ' ']).to_string();

    if truncated.is_empty() {
        "untitled".to_string()
    } else {
        truncated
    }
}

/// Lowercases, folds diacritics, turns punctuation into spaces and collapses
/// whitespace. `"Beyoncé – Halo (Live!)"` becomes `"beyonce halo live"`.
pub fn normalize_text(s: &str) -> String {
    let folded: String = s
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts the year from Spotify's `release_date`, which may be `YYYY`,
/// `YYYY-MM` or `YYYY-MM-DD`.
pub fn year_from_release_date(date: &str) -> Option<i32> {
    date.get(..4).and_then(|y| y.parse::<i32>().ok())
}

pub fn parse_audio_quality(s: &str) -> Result<AudioQuality, String> {
    let value = s.trim().to_ascii_lowercase();
    if value == "best" || value == "0" {
        return Ok(AudioQuality::Best);
    }

    let digits = value.trim_end_matches('k');
    match digits.parse::<u32>() {
        Ok(kbps) if (32..=320).contains(&kbps) => Ok(AudioQuality::Kbps(kbps)),
        Ok(kbps) => Err(format!("bitrate {} out of range (32-320)", kbps)),
        Err(_) => Err(format!(
            "invalid quality '{}'. Expected 'best' or a bitrate like 320",
            s
        )),
    }
}

pub fn parse_score(s: &str) -> Result<f64, String> {
    match s.trim().parse::<f64>() {
        Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
        Ok(v) => Err(format!("score {} out of range (0.0-1.0)", v)),
        Err(_) => Err(format!("invalid score '{}'", s)),
    }
}

/// Zero-padded position prefix for archive entries; width follows the
/// playlist length with a minimum of two digits.
pub fn position_prefix(position: usize, total: usize) -> String {
    let width = total.to_string().len().max(2);
    format!("{:0width$}", position, width = width)
}
