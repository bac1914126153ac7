//! Playlist Archiver.
//!
//! Packs the successful tracks of a playlist run into
//! `<output>/<playlist name>.zip` together with a generated cover image and
//! a Markdown summary of every track's outcome. Audio entries are prefixed
//! with their playlist position so archive order matches playlist order.

pub mod cover;
pub mod summary;

use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::Local;
use tracing::{debug, info, warn};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    config::Settings,
    error::{Error, Result},
    management::RunReport,
    types::{DownloadOutcome, PlaylistMetadata},
    utils,
};

pub const COVER_ENTRY: &str = "Playlist Cover.png";
pub const SUMMARY_ENTRY: &str = "Playlist Info.md";

/// Archive location for `playlist` inside `output_dir`.
pub fn archive_path(output_dir: &Path, playlist: &PlaylistMetadata) -> PathBuf {
    output_dir.join(format!("{}.zip", utils::sanitize_filename(&playlist.name)))
}

/// Builds the playlist archive and removes the archived staging files.
///
/// Returns `Ok(None)` without touching the filesystem when no track
/// succeeded. On failure the partial archive is removed and every staged
/// file is left in place.
pub fn build(
    playlist: &PlaylistMetadata,
    report: &RunReport,
    staging_dir: &Path,
    settings: &Settings,
) -> Result<Option<PathBuf>> {
    if report.succeeded() == 0 {
        info!(playlist = %playlist.id, "nothing to archive");
        return Ok(None);
    }

    let path = archive_path(&settings.output_dir, playlist);
    if let Err(e) = write_archive(&path, playlist, report, settings) {
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
        return Err(e);
    }

    info!(path = %path.display(), tracks = report.succeeded(), "archive written");
    remove_archived(report, staging_dir);
    Ok(Some(path))
}

fn write_archive(
    path: &Path,
    playlist: &PlaylistMetadata,
    report: &RunReport,
    settings: &Settings,
) -> Result<()> {
    let archive_err = |e: &dyn std::fmt::Display| {
        Error::Archive(format!("cannot write {}: {}", path.display(), e))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| archive_err(&e))?;
    }
    let file = File::create(path).map_err(|e| archive_err(&e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let total = playlist.tracks.len().max(report.len());
    for entry in report.successes() {
        let DownloadOutcome::Success(source) = &entry.outcome else {
            continue;
        };
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Archive(format!("invalid staged path {}", source.display())))?;
        let name = format!("{} - {}", utils::position_prefix(entry.index, total), file_name);

        debug!(entry = %name, "adding to archive");
        zip.start_file(name, options).map_err(|e| archive_err(&e))?;
        let mut input = File::open(source).map_err(|e| archive_err(&e))?;
        io::copy(&mut input, &mut zip).map_err(|e| archive_err(&e))?;
    }

    let generated_at = Local::now();
    let cover = cover::render(playlist, generated_at)?;
    zip.start_file(COVER_ENTRY, options)
        .map_err(|e| archive_err(&e))?;
    zip.write_all(&cover).map_err(|e| archive_err(&e))?;

    let doc = summary::render(playlist, report, settings, generated_at);
    zip.start_file(SUMMARY_ENTRY, options)
        .map_err(|e| archive_err(&e))?;
    zip.write_all(doc.as_bytes()).map_err(|e| archive_err(&e))?;

    zip.finish().map_err(|e| archive_err(&e))?;
    Ok(())
}

/// Deletes archived staging files, then the staging directory when nothing
/// else is left in it.
fn remove_archived(report: &RunReport, staging_dir: &Path) {
    for entry in report.successes() {
        if let DownloadOutcome::Success(path) = &entry.outcome {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "cannot remove staged file");
            }
        }
    }

    let is_empty = std::fs::read_dir(staging_dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if is_empty {
        if let Err(e) = std::fs::remove_dir(staging_dir) {
            warn!(path = %staging_dir.display(), error = %e, "cannot remove staging directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use tempfile::tempdir;
    use zip::ZipArchive;

    use super::*;
    use crate::{management::TrackReport, types::TrackMetadata};

    fn track(index: usize) -> TrackMetadata {
        TrackMetadata {
            id: format!("t{}", index),
            title: format!("Song {}", index),
            artists: vec!["Band".into()],
            album: "Album".into(),
            track_number: index as u32,
            duration_secs: 200,
            release_year: None,
            artwork_url: None,
        }
    }

    fn playlist(n: usize) -> PlaylistMetadata {
        PlaylistMetadata {
            id: "pl".into(),
            name: "Mix: Best/Of".into(),
            description: None,
            tracks: (1..=n).map(track).collect(),
            unavailable: 0,
        }
    }

    fn settings(output: &Path) -> Settings {
        Settings {
            output_dir: output.to_path_buf(),
            ..Settings::default()
        }
    }

    fn staged(dir: &Path, index: usize) -> PathBuf {
        let path = dir.join(format!("{}.flac", track(index).file_stem()));
        std::fs::write(&path, format!("audio {}", index)).unwrap();
        path
    }

    #[test]
    fn archives_successes_in_playlist_order() {
        let out = tempdir().unwrap();
        let staging = out.path().join("temp_pl");
        std::fs::create_dir_all(&staging).unwrap();

        let playlist = playlist(3);
        let mut report = RunReport::new();
        report.add(TrackReport {
            index: 3,
            track: track(3),
            outcome: DownloadOutcome::Success(staged(&staging, 3)),
            notes: Vec::new(),
        });
        report.add(TrackReport {
            index: 1,
            track: track(1),
            outcome: DownloadOutcome::Success(staged(&staging, 1)),
            notes: Vec::new(),
        });
        report.add(TrackReport {
            index: 2,
            track: track(2),
            outcome: DownloadOutcome::Failed {
                kind: "NoMatchFound".into(),
                detail: "no candidates".into(),
            },
            notes: Vec::new(),
        });

        let path = build(&playlist, &report, &staging, &settings(out.path()))
            .unwrap()
            .unwrap();
        assert_eq!(path, out.path().join("Mix_ Best_Of.zip"));

        let mut zip = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "01 - Band - Song 1.flac",
                "03 - Band - Song 3.flac",
                COVER_ENTRY,
                SUMMARY_ENTRY,
            ]
        );

        let mut doc = String::new();
        zip.by_name(SUMMARY_ENTRY)
            .unwrap()
            .read_to_string(&mut doc)
            .unwrap();
        assert!(doc.contains("Band - Song 1"));
        assert!(doc.contains("Band - Song 2"));
        assert!(doc.contains("Band - Song 3"));
        assert!(doc.contains("NoMatchFound"));

        assert!(!staging.exists());
    }

    #[test]
    fn no_successes_means_no_archive() {
        let out = tempdir().unwrap();
        let staging = out.path().join("temp_pl");
        let mut report = RunReport::new();
        report.add(TrackReport {
            index: 1,
            track: track(1),
            outcome: DownloadOutcome::Failed {
                kind: "DownloadError".into(),
                detail: "gone".into(),
            },
            notes: Vec::new(),
        });

        let result = build(&playlist(1), &report, &staging, &settings(out.path())).unwrap();
        assert!(result.is_none());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn keeps_skipped_files_in_staging() {
        let out = tempdir().unwrap();
        let staging = out.path().join("temp_pl");
        std::fs::create_dir_all(&staging).unwrap();
        let skipped = staged(&staging, 2);

        let mut report = RunReport::new();
        report.add(TrackReport {
            index: 1,
            track: track(1),
            outcome: DownloadOutcome::Success(staged(&staging, 1)),
            notes: Vec::new(),
        });
        report.add(TrackReport {
            index: 2,
            track: track(2),
            outcome: DownloadOutcome::Skipped("already exists".into()),
            notes: Vec::new(),
        });

        build(&playlist(2), &report, &staging, &settings(out.path())).unwrap();
        assert!(skipped.exists());
        assert!(!staging.join("Band - Song 1.flac").exists());
    }

    #[test]
    fn failure_removes_partial_archive_and_keeps_staging() {
        let out = tempdir().unwrap();
        let staging = out.path().join("temp_pl");
        std::fs::create_dir_all(&staging).unwrap();
        let present = staged(&staging, 1);

        let mut report = RunReport::new();
        report.add(TrackReport {
            index: 1,
            track: track(1),
            outcome: DownloadOutcome::Success(present.clone()),
            notes: Vec::new(),
        });
        report.add(TrackReport {
            index: 2,
            track: track(2),
            outcome: DownloadOutcome::Success(staging.join("missing.flac")),
            notes: Vec::new(),
        });

        let err = build(&playlist(2), &report, &staging, &settings(out.path())).unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
        assert!(!out.path().join("Mix_ Best_Of.zip").exists());
        assert!(present.exists());
    }
}
