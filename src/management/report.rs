use crate::types::{DownloadOutcome, OutcomeTableRow, TrackMetadata};

/// Terminal result for one track, plus any warnings raised along the way
/// (tagging or artwork problems that did not fail the track).
#[derive(Debug, Clone)]
pub struct TrackReport {
    /// 1-based position in the playlist.
    pub index: usize,
    pub track: TrackMetadata,
    pub outcome: DownloadOutcome,
    pub notes: Vec<String>,
}

/// The in-memory outcome list of a run. Entries are kept in playlist order
/// regardless of the order they were recorded in.
#[derive(Debug, Default)]
pub struct RunReport {
    entries: Vec<TrackReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, report: TrackReport) {
        let at = self.entries.partition_point(|e| e.index <= report.index);
        self.entries.insert(at, report);
    }

    pub fn entries(&self) -> &[TrackReport] {
        &self.entries
    }

    /// Successful entries in playlist order.
    pub fn successes(&self) -> impl Iterator<Item = &TrackReport> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, DownloadOutcome::Success(_)))
    }

    pub fn succeeded(&self) -> usize {
        self.count("Success")
    }

    pub fn skipped(&self) -> usize {
        self.count("Skipped")
    }

    pub fn failed(&self) -> usize {
        self.count("Failed")
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn table_rows(&self) -> Vec<OutcomeTableRow> {
        self.entries
            .iter()
            .map(|e| {
                let mut detail = e.outcome.detail();
                for note in &e.notes {
                    detail.push_str(&format!(" (warning: {})", note));
                }
                OutcomeTableRow {
                    index: e.index,
                    track: e.track.display_name(),
                    outcome: e.outcome.label().to_string(),
                    detail,
                }
            })
            .collect()
    }

    fn count(&self, label: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.label() == label)
            .count()
    }
}
