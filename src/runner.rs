//! Run Controller.
//!
//! Drives one invocation through its phases:
//!
//! ```text
//! Idle → Resolving → Processing → Finalizing → Done
//!           │             │
//!           └ fatal       └ per-track outcomes, never fatal
//! ```
//!
//! Resolving parses the link and fetches metadata; any error there aborts the
//! run. Processing handles tracks one at a time in playlist order:
//! resume check, search, match, download, tag. Finalizing only exists for
//! playlists and builds the archive.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::{
    archive,
    config::Settings,
    error::{Error, Result},
    management::{RunReport, TrackReport},
    media::{MediaBackend, download, matcher},
    spotify::{MetadataSource, link},
    tagging,
    types::{ContentKind, DownloadOutcome, MatchResult, PlaylistMetadata, TrackMetadata},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Resolving,
    Processing,
    Finalizing,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Resolving => "resolving",
            RunState::Processing => "processing",
            RunState::Finalizing => "finalizing",
            RunState::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub kind: ContentKind,
    /// Track display name or playlist name.
    pub title: String,
    pub report: RunReport,
    pub archive: Option<PathBuf>,
    /// Playlist items Spotify listed but that cannot be downloaded.
    pub unavailable: usize,
    /// Set when Finalizing failed; loose files stay in staging.
    pub finalize_error: Option<Error>,
    /// Whether the run was meant to end in an archive.
    pub archive_requested: bool,
}

impl RunSummary {
    /// A run succeeds when no track failed and finalizing went through. An
    /// archiving playlist run also needs at least one downloaded track, since
    /// skipped files never reach the archive; without archiving, files that
    /// were already present count as output.
    pub fn is_success(&self) -> bool {
        if self.report.has_failures() || self.finalize_error.is_some() {
            return false;
        }
        match self.kind {
            ContentKind::Track => true,
            ContentKind::Playlist => self.produced_output(),
        }
    }

    /// Whether a playlist run left the user with something to keep.
    pub fn produced_output(&self) -> bool {
        if self.archive_requested {
            self.report.succeeded() > 0
        } else {
            self.report.succeeded() + self.report.skipped() > 0
        }
    }
}

pub struct Runner<'a> {
    metadata: &'a dyn MetadataSource,
    backend: &'a dyn MediaBackend,
    settings: &'a Settings,
    state: RunState,
}

impl<'a> Runner<'a> {
    pub fn new(
        metadata: &'a dyn MetadataSource,
        backend: &'a dyn MediaBackend,
        settings: &'a Settings,
    ) -> Self {
        Self {
            metadata,
            backend,
            settings,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Runs the whole pipeline for a Spotify link.
    ///
    /// Returns `Err` only for run-level failures during Resolving. Track
    /// failures and archive problems are part of the returned summary.
    pub async fn run(&mut self, input: &str) -> Result<RunSummary> {
        self.transition(RunState::Resolving);
        let reference = link::parse(input)?;
        info!(kind = %reference.kind, id = %reference.id, "resolving");

        let spinner = self.spinner(format!("Fetching {} metadata...", reference.kind));
        let summary = match reference.kind {
            ContentKind::Track => {
                let track = self.metadata.track(&reference.id).await;
                spinner.finish_and_clear();
                self.run_track(track?).await
            }
            ContentKind::Playlist => {
                let playlist = self.metadata.playlist(&reference.id).await;
                spinner.finish_and_clear();
                self.run_playlist(playlist?).await
            }
        };

        self.transition(RunState::Done);
        Ok(summary)
    }

    async fn run_track(&mut self, track: TrackMetadata) -> RunSummary {
        self.transition(RunState::Processing);
        let title = track.display_name();

        let bar = self.progress_bar(1);
        let entry = self
            .process_track(1, track, &self.settings.output_dir, &bar)
            .await;
        bar.finish_and_clear();

        let mut report = RunReport::new();
        report.add(entry);

        RunSummary {
            kind: ContentKind::Track,
            title,
            report,
            archive: None,
            unavailable: 0,
            finalize_error: None,
            archive_requested: false,
        }
    }

    async fn run_playlist(&mut self, playlist: PlaylistMetadata) -> RunSummary {
        self.transition(RunState::Processing);
        let staging_dir = self.playlist_dir(&playlist);
        let total = playlist.tracks.len();
        info!(playlist = %playlist.id, name = %playlist.name, total, "processing playlist");

        let bar = self.progress_bar(total as u64);
        let mut report = RunReport::new();

        for (i, track) in playlist.tracks.iter().enumerate() {
            let index = i + 1;
            let entry = self
                .process_track(index, track.clone(), &staging_dir, &bar)
                .await;
            let skipped = matches!(entry.outcome, DownloadOutcome::Skipped(_));
            report.add(entry);

            if index < total && !skipped && !self.settings.track_delay.is_zero() {
                tokio::time::sleep(self.settings.track_delay).await;
            }
        }
        bar.finish_and_clear();

        let mut summary = RunSummary {
            kind: ContentKind::Playlist,
            title: playlist.name.clone(),
            report,
            archive: None,
            unavailable: playlist.unavailable,
            finalize_error: None,
            archive_requested: self.settings.create_archive,
        };

        if self.settings.create_archive {
            self.transition(RunState::Finalizing);
            match archive::build(&playlist, &summary.report, &staging_dir, self.settings) {
                Ok(path) => summary.archive = path,
                Err(e) => {
                    warn!(playlist = %playlist.id, error = %e, "finalizing failed");
                    summary.finalize_error = Some(e);
                }
            }
        }

        summary
    }

    /// Directory tracks of `playlist` are written to before archiving.
    pub fn playlist_dir(&self, playlist: &PlaylistMetadata) -> PathBuf {
        if self.settings.create_archive {
            self.settings
                .output_dir
                .join(format!("temp_{}", playlist.id))
        } else {
            self.settings.output_dir.clone()
        }
    }

    async fn process_track(
        &self,
        index: usize,
        track: TrackMetadata,
        dir: &Path,
        bar: &ProgressBar,
    ) -> TrackReport {
        bar.set_message(track.display_name());
        let mut notes = Vec::new();
        let outcome = self.track_outcome(&track, dir, &mut notes).await;

        match &outcome {
            DownloadOutcome::Success(path) => {
                info!(index, track_id = %track.id, path = %path.display(), "track done")
            }
            DownloadOutcome::Skipped(reason) => {
                info!(index, track_id = %track.id, reason = %reason, "track skipped")
            }
            DownloadOutcome::Failed { kind, detail } => {
                warn!(index, track_id = %track.id, kind = %kind, detail = %detail, "track failed")
            }
        }
        bar.inc(1);

        TrackReport {
            index,
            track,
            outcome,
            notes,
        }
    }

    async fn track_outcome(
        &self,
        track: &TrackMetadata,
        dir: &Path,
        notes: &mut Vec<String>,
    ) -> DownloadOutcome {
        let stem = track.file_stem();
        let path = download::staging_path(dir, &stem, self.settings.format);
        if path.exists() {
            return DownloadOutcome::Skipped(format!("already exists: {}", path.display()));
        }

        let query = track.display_name();
        debug!(track_id = %track.id, phase = "match", query = %query, "searching");
        let candidates = match self.backend.search(&query, self.settings.max_results).await {
            Ok(c) => c,
            Err(e) => return failed(&e),
        };

        let candidate = match matcher::select(track, &candidates, &self.settings.match_policy) {
            MatchResult::Matched { candidate, score } => {
                debug!(track_id = %track.id, candidate = %candidate.title, score, "matched");
                candidate
            }
            MatchResult::NoMatch => {
                let e = Error::NoMatchFound(query);
                return DownloadOutcome::Failed {
                    kind: e.kind().to_string(),
                    detail: format!(
                        "no acceptable candidate among {} search result(s)",
                        candidates.len()
                    ),
                };
            }
        };

        debug!(track_id = %track.id, phase = "download", "downloading");
        let path = match download::download(
            self.backend,
            &candidate,
            dir,
            &stem,
            self.settings.format,
            self.settings.quality,
        )
        .await
        {
            Ok(p) => p,
            Err(e) => return failed(&e),
        };

        let cover = match &track.artwork_url {
            Some(url) => match self.metadata.artwork(url).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(track_id = %track.id, error = %e, "artwork unavailable");
                    notes.push(format!("artwork unavailable: {}", e));
                    None
                }
            },
            None => None,
        };

        debug!(track_id = %track.id, phase = "tag", "writing tags");
        if let Err(e) = tagging::write_tags(&path, track, cover.as_deref()) {
            warn!(track_id = %track.id, error = %e, "tags incomplete");
            notes.push(format!("tags incomplete: {}", e));
        }

        DownloadOutcome::Success(path)
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "run state");
        self.state = next;
    }

    fn spinner(&self, message: String) -> ProgressBar {
        if !self.settings.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        pb
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.settings.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.blue} [{bar:30.green/white}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

fn failed(e: &Error) -> DownloadOutcome {
    DownloadOutcome::Failed {
        kind: e.kind().to_string(),
        detail: e.to_string(),
    }
}
