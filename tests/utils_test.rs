use spotgrab::types::{AudioQuality, TrackMetadata};
use spotgrab::utils::*;

// Helper function to create test track metadata
fn create_test_track(title: &str, artists: &[&str]) -> TrackMetadata {
    TrackMetadata {
        id: "id1".to_string(),
        title: title.to_string(),
        artists: artists.iter().map(|a| a.to_string()).collect(),
        album: "Album".to_string(),
        track_number: 1,
        duration_secs: 200,
        release_year: Some(2020),
        artwork_url: None,
    }
}

#[test]
fn test_sanitize_filename_replaces_reserved_characters() {
    let sanitized = sanitize_filename("AC/DC - Who: Made <Who>? \"Live\" | *2*");

    for c in ['/', '\\', ':', '<', '>', '?', '"', '|', '*'] {
        assert!(!sanitized.contains(c), "{} still contains {}", sanitized, c);
    }
    assert!(sanitized.starts_with("AC_DC - Who_ Made"));
}

#[test]
fn test_sanitize_filename_collapses_whitespace_and_trims() {
    assert_eq!(sanitize_filename("  Artist \t -   Song\n "), "Artist - Song");
    assert_eq!(sanitize_filename("Song..."), "Song");
}

#[test]
fn test_sanitize_filename_truncates_on_char_boundary() {
    let long = "é".repeat(MAX_FILENAME_CHARS + 50);
    let sanitized = sanitize_filename(&long);

    assert_eq!(sanitized.chars().count(), MAX_FILENAME_CHARS);
}

#[test]
fn test_sanitize_filename_never_empty() {
    assert_eq!(sanitize_filename("   "), "untitled");
    assert_eq!(sanitize_filename("..."), "untitled");
}

#[test]
fn test_file_stem_is_deterministic() {
    let track = create_test_track("Halo / Remix", &["Beyoncé", "Someone"]);

    assert_eq!(track.file_stem(), "Beyoncé, Someone - Halo _ Remix");
    assert_eq!(track.file_stem(), track.file_stem());
}

#[test]
fn test_normalize_text_folds_case_diacritics_and_punctuation() {
    assert_eq!(normalize_text("Beyoncé – Halo (Live!)"), "beyonce halo live");
    assert_eq!(normalize_text("  Sigur Rós:  Hoppípolla "), "sigur ros hoppipolla");
    assert_eq!(normalize_text("!!!"), "");
}

#[test]
fn test_year_from_release_date() {
    assert_eq!(year_from_release_date("1997-01-20"), Some(1997));
    assert_eq!(year_from_release_date("2004-05"), Some(2004));
    assert_eq!(year_from_release_date("1988"), Some(1988));
    assert_eq!(year_from_release_date("88"), None);
    assert_eq!(year_from_release_date("unknown"), None);
}

#[test]
fn test_parse_audio_quality() {
    assert_eq!(parse_audio_quality("best"), Ok(AudioQuality::Best));
    assert_eq!(parse_audio_quality("BEST"), Ok(AudioQuality::Best));
    assert_eq!(parse_audio_quality("320"), Ok(AudioQuality::Kbps(320)));
    assert_eq!(parse_audio_quality("192k"), Ok(AudioQuality::Kbps(192)));
    assert!(parse_audio_quality("999").is_err());
    assert!(parse_audio_quality("loud").is_err());
}

#[test]
fn test_position_prefix() {
    assert_eq!(position_prefix(1, 3), "01");
    assert_eq!(position_prefix(7, 99), "07");
    assert_eq!(position_prefix(7, 120), "007");
    assert_eq!(position_prefix(120, 120), "120");
}

#[test]
fn test_parse_score_bounds() {
    assert_eq!(parse_score("0.6"), Ok(0.6));
    assert_eq!(parse_score("1"), Ok(1.0));
    assert!(parse_score("1.5").is_err());
    assert!(parse_score("-0.1").is_err());
    assert!(parse_score("high").is_err());
}
