use tabled::{Table, settings::Style};
use tracing::debug;

use crate::{
    config::{self, Settings},
    error, info,
    media::YtDlpBackend,
    runner::{RunSummary, Runner},
    spotify::SpotifyClient,
    success,
    types::ContentKind,
    warning,
};

/// Downloads a Spotify track or playlist and prints the run summary.
///
/// Returns the process exit code: 0 when no track failed, the archive was
/// written and, for an archived playlist, at least one track was downloaded.
/// Fatal run-level errors print a message and exit immediately.
pub async fn download(url: &str, settings: Settings) -> i32 {
    let creds = match config::spotify_credentials() {
        Ok(c) => c,
        Err(e) => error!("{}", e),
    };

    debug!(?settings, "resolved settings");
    info!("Resolving {}", url);

    let client = SpotifyClient::new(creds).await;
    let backend = YtDlpBackend::new(&settings.ytdlp_path, settings.source);
    let mut runner = Runner::new(&client, &backend, &settings);

    let summary = match runner.run(url).await {
        Ok(s) => s,
        Err(e) if e.is_fatal() => error!("{}", e),
        Err(e) => {
            warning!("Run stopped during {}: {}", runner.state(), e);
            return 1;
        }
    };
    debug!(state = %runner.state(), "run finished");

    print_summary(&summary);
    if summary.is_success() { 0 } else { 1 }
}

fn print_summary(summary: &RunSummary) {
    let report = &summary.report;

    if !report.is_empty() {
        let mut table = Table::new(report.table_rows());
        table.with(Style::rounded());
        println!("{}", table);
    }

    if summary.unavailable > 0 {
        warning!(
            "{} playlist item(s) are not available for download",
            summary.unavailable
        );
    }

    let tally = format!(
        "{} downloaded, {} skipped, {} failed",
        report.succeeded(),
        report.skipped(),
        report.failed()
    );

    if let Some(e) = &summary.finalize_error {
        warning!("{}", e);
        warning!("Downloaded files were kept in the staging folder");
    }

    match summary.kind {
        ContentKind::Playlist => {
            if let Some(path) = &summary.archive {
                success!("Archive written to {}", path.display());
            } else if !summary.produced_output() {
                warning!("Nothing was downloaded for playlist '{}'", summary.title);
            }
        }
        ContentKind::Track => {}
    }

    if summary.is_success() {
        success!("{}: {}", summary.title, tally);
    } else {
        warning!("{}: {}", summary.title, tally);
    }
}
