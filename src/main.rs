use std::{path::PathBuf, time::Duration};

use clap::{
    CommandFactory, Parser,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotgrab::{
    cli,
    config::{self, Settings},
    error, logging,
    media::{MatchPolicy, matcher},
    types::{AudioFormat, AudioQuality, AudioSource},
    utils,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Spotify track or playlist URL (or spotify: URI)
    #[clap(required_unless_present = "completions")]
    url: Option<String>,

    /// Output directory
    #[clap(short, long, env = "DOWNLOAD_FOLDER", default_value = "./downloads")]
    output: PathBuf,

    /// Audio format to encode to
    #[clap(short, long, env = "AUDIO_FORMAT", value_enum, default_value = "flac")]
    format: AudioFormat,

    /// Audio quality: best, or a bitrate such as 320, 256, 192, 128
    #[clap(
        short,
        long,
        env = "AUDIO_QUALITY",
        default_value = "best",
        value_parser = utils::parse_audio_quality
    )]
    quality: AudioQuality,

    /// Where to search for audio
    #[clap(long, env = "AUDIO_SOURCE", value_enum, default_value = "youtube")]
    source: AudioSource,

    /// Path to the yt-dlp executable
    #[clap(long, env = "YTDLP_PATH", default_value = "yt-dlp")]
    ytdlp: String,

    /// Number of search results considered per track
    #[clap(long, env = "MAX_SEARCH_RESULTS", default_value_t = 5)]
    max_results: usize,

    /// Maximum difference in seconds between track and candidate duration
    #[clap(long, env = "MATCH_DURATION_TOLERANCE", default_value_t = matcher::DEFAULT_DURATION_TOLERANCE_SECS)]
    duration_tolerance: u32,

    /// Minimum match score (0.0 - 1.0) a candidate needs to be accepted
    #[clap(
        long,
        env = "MATCH_MIN_SCORE",
        default_value_t = matcher::DEFAULT_MIN_SCORE,
        value_parser = utils::parse_score
    )]
    min_score: f64,

    /// Pause between tracks in milliseconds
    #[clap(long, env = "TRACK_DELAY_MS", default_value_t = 1000)]
    delay_ms: u64,

    /// Write playlist tracks as loose files instead of a zip archive
    #[clap(long)]
    no_archive: bool,

    /// Also write debug logs to this file
    #[clap(long, env = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Verbose console logging
    #[clap(long)]
    debug: bool,

    /// Print shell completions and exit
    #[clap(long, value_enum)]
    completions: Option<Shell>,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            output_dir: self.output.clone(),
            format: self.format,
            quality: self.quality,
            source: self.source,
            ytdlp_path: self.ytdlp.clone(),
            max_results: self.max_results.max(1),
            match_policy: MatchPolicy {
                duration_tolerance_secs: self.duration_tolerance,
                min_score: self.min_score,
            },
            track_delay: Duration::from_millis(self.delay_ms),
            create_archive: !self.no_archive,
            show_progress: true,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    if let Err(e) = logging::init(cli.debug, cli.log_file.as_deref()) {
        error!("{}", e);
    }

    let Some(url) = cli.url.as_deref() else {
        error!("A Spotify track or playlist URL is required");
    };

    let code = cli::download(url, cli.settings()).await;
    std::process::exit(code);
}
