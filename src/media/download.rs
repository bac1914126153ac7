use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use futures::StreamExt;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    types::{AudioFormat, AudioQuality, Candidate},
};

use super::{FetchRequest, MediaBackend};

/// Path a track with `stem` ends up at inside `dir`.
pub fn staging_path(dir: &Path, stem: &str, format: AudioFormat) -> PathBuf {
    dir.join(format!("{}.{}", stem, format.extension()))
}

/// Fetches `candidate` and encodes it to `<dir>/<stem>.<ext>`.
///
/// Exactly one file exists at the returned path on success. On any failure
/// the files this attempt left behind for the stem are removed and the error
/// is reported as [`Error::Download`] or [`Error::Transcode`]. Files that
/// were already there, such as the same track in another format, are kept.
pub async fn download(
    backend: &dyn MediaBackend,
    candidate: &Candidate,
    dir: &Path,
    stem: &str,
    format: AudioFormat,
    quality: AudioQuality,
) -> Result<PathBuf> {
    async_fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Download(format!("cannot create {}: {}", dir.display(), e)))?;

    let output = staging_path(dir, stem, format);
    let request = FetchRequest {
        candidate,
        output: &output,
        format,
        quality,
    };

    let existing = stem_files(dir, stem).await;

    debug!(source = %candidate.source, output = %output.display(), "fetching");
    let result = match backend.fetch(request).await {
        Ok(()) => verify_output(&output).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Ok(output),
        Err(e) => {
            cleanup_partials(dir, stem, &existing).await;
            Err(match e {
                Error::Transcode(msg) => Error::Transcode(msg),
                Error::Download(msg) => Error::Download(msg),
                other => Error::Download(other.to_string()),
            })
        }
    }
}

async fn verify_output(output: &Path) -> Result<()> {
    match async_fs::metadata(output).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        Ok(_) => Err(Error::Transcode(format!(
            "{} is empty",
            output.display()
        ))),
        Err(_) => Err(Error::Transcode(format!(
            "backend finished but {} was not produced",
            output.display()
        ))),
    }
}

/// Whether `name` is a file the backend may have produced for `stem`:
/// `<stem>.<ext>`, `<stem>.<ext>.part`, `<stem>.f251.webm` and the like.
fn is_partial_for(name: &str, stem: &str) -> bool {
    name.strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|rest| {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        })
}

/// Names in `dir` the backend may have produced for `stem`.
pub async fn stem_files(dir: &Path, stem: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    let Ok(mut entries) = async_fs::read_dir(dir).await else {
        return names;
    };

    while let Some(entry) = entries.next().await {
        let Ok(entry) = entry else {
            continue;
        };
        if let Some(name) = entry.file_name().to_str() {
            if is_partial_for(name, stem) {
                names.insert(name.to_string());
            }
        }
    }
    names
}

/// Removes the files for `stem` that appeared in `dir` since `existing`
/// was taken.
pub async fn cleanup_partials(dir: &Path, stem: &str, existing: &HashSet<String>) {
    for name in stem_files(dir, stem).await {
        if existing.contains(&name) {
            continue;
        }
        let path = dir.join(&name);
        match async_fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "removed partial file"),
            Err(e) => warn!(path = %path.display(), error = %e, "cannot remove partial file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tempfile::tempdir;

    use super::*;

    enum Behaviour {
        Write,
        WriteNothing,
        FailAfterPartial,
        FailTranscode,
    }

    struct FakeBackend(Behaviour);

    #[async_trait]
    impl MediaBackend for FakeBackend {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Candidate>> {
            Ok(Vec::new())
        }

        async fn fetch(&self, request: FetchRequest<'_>) -> Result<()> {
            match self.0 {
                Behaviour::Write => {
                    std::fs::write(request.output, b"audio")?;
                    Ok(())
                }
                Behaviour::WriteNothing => Ok(()),
                Behaviour::FailAfterPartial => {
                    let part = request.output.with_extension("webm.part");
                    std::fs::write(part, b"par")?;
                    Err(Error::Download("connection reset".into()))
                }
                Behaviour::FailTranscode => {
                    let raw = request.output.with_extension("webm");
                    std::fs::write(raw, b"raw")?;
                    Err(Error::Transcode("ffmpeg not found".into()))
                }
            }
        }
    }

    fn candidate() -> Candidate {
        Candidate {
            title: "Artist - Song".into(),
            duration_secs: Some(200),
            source: "https://www.youtube.com/watch?v=abc".into(),
            rank: 0,
        }
    }

    #[tokio::test]
    async fn writes_single_file() {
        let dir = tempdir().unwrap();
        let backend = FakeBackend(Behaviour::Write);

        let path = download(
            &backend,
            &candidate(),
            dir.path(),
            "Artist - Song",
            AudioFormat::Mp3,
            AudioQuality::Best,
        )
        .await
        .unwrap();

        assert_eq!(path, dir.path().join("Artist - Song.mp3"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn missing_output_is_transcode_error() {
        let dir = tempdir().unwrap();
        let backend = FakeBackend(Behaviour::WriteNothing);

        let err = download(
            &backend,
            &candidate(),
            dir.path(),
            "Artist - Song",
            AudioFormat::Flac,
            AudioQuality::Best,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Transcode(_)));
    }

    #[tokio::test]
    async fn failure_removes_partials_only_for_stem() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Other - Track.flac"), b"keep").unwrap();
        std::fs::write(dir.path().join("Artist - Song (Live).flac"), b"keep").unwrap();

        let err = download(
            &FakeBackend(Behaviour::FailAfterPartial),
            &candidate(),
            dir.path(),
            "Artist - Song",
            AudioFormat::Flac,
            AudioQuality::Best,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Download(_)));

        let err = download(
            &FakeBackend(Behaviour::FailTranscode),
            &candidate(),
            dir.path(),
            "Artist - Song",
            AudioFormat::Flac,
            AudioQuality::Best,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Transcode(_)));

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Artist - Song (Live).flac", "Other - Track.flac"]);
    }

    #[tokio::test]
    async fn failure_keeps_files_from_earlier_runs() {
        let dir = tempdir().unwrap();
        let earlier_mp3 = dir.path().join("Daft Punk - Around the World.mp3");
        let lyrics = dir.path().join("Daft Punk - Around the World.lrc");
        std::fs::write(&earlier_mp3, b"finished").unwrap();
        std::fs::write(&lyrics, b"[00:01.00] around the world").unwrap();

        let err = download(
            &FakeBackend(Behaviour::FailAfterPartial),
            &candidate(),
            dir.path(),
            "Daft Punk - Around the World",
            AudioFormat::Flac,
            AudioQuality::Best,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Download(_)));

        assert_eq!(std::fs::read(&earlier_mp3).unwrap(), b"finished");
        assert!(lyrics.exists());
        assert!(!dir
            .path()
            .join("Daft Punk - Around the World.webm.part")
            .exists());
    }

    #[test]
    fn partial_name_matching() {
        assert!(is_partial_for("A - B.flac", "A - B"));
        assert!(is_partial_for("A - B.f251.webm.part", "A - B"));
        assert!(!is_partial_for("A - B (Live).flac", "A - B"));
        assert!(!is_partial_for("A - B", "A - B"));
        assert!(!is_partial_for("A - Bc.flac", "A - B"));
    }
}
