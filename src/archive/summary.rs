use std::fmt::Write;

use chrono::{DateTime, Local};

use crate::{
    config::Settings,
    management::RunReport,
    types::{DownloadOutcome, PlaylistMetadata},
};

/// Renders the Markdown summary stored in the playlist archive. Every track
/// of the run is listed with its outcome, not only the archived ones.
pub fn render(
    playlist: &PlaylistMetadata,
    report: &RunReport,
    settings: &Settings,
    generated_at: DateTime<Local>,
) -> String {
    let total = playlist.tracks.len();
    let mut doc = String::new();

    let _ = writeln!(doc, "# {}", playlist.name);
    let _ = writeln!(doc);
    if let Some(description) = playlist.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(doc, "> {}", description);
        let _ = writeln!(doc);
    }

    let _ = writeln!(doc, "- **Spotify playlist:** `{}`", playlist.id);
    let _ = writeln!(
        doc,
        "- **Generated:** {}",
        generated_at.format("%Y-%m-%d %H:%M:%S %Z")
    );
    let _ = writeln!(
        doc,
        "- **Audio:** {} ({}) from {}",
        settings.format.to_string().to_uppercase(),
        settings.quality,
        settings.source
    );
    let _ = writeln!(
        doc,
        "- **Tracks:** {} total, {} downloaded, {} skipped, {} failed",
        total,
        report.succeeded(),
        report.skipped(),
        report.failed()
    );
    if playlist.unavailable > 0 {
        let _ = writeln!(
            doc,
            "- **Unavailable on Spotify:** {} item(s) not downloadable",
            playlist.unavailable
        );
    }
    let _ = writeln!(doc);

    let _ = writeln!(doc, "## Tracks");
    let _ = writeln!(doc);
    let _ = writeln!(doc, "| # | Track | Album | Duration | Outcome | Detail |");
    let _ = writeln!(doc, "|---|-------|-------|----------|---------|--------|");

    for entry in report.entries() {
        let detail = match &entry.outcome {
            DownloadOutcome::Success(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            other => other.detail(),
        };
        let mut detail = detail;
        for note in &entry.notes {
            let _ = write!(detail, " (warning: {})", note);
        }

        let _ = writeln!(
            doc,
            "| {} | {} | {} | {} | {} | {} |",
            entry.index,
            cell(&entry.track.display_name()),
            cell(&entry.track.album),
            duration(entry.track.duration_secs),
            entry.outcome.label(),
            cell(&detail)
        );
    }

    doc
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn duration(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
