//! # CLI Module
//!
//! User-facing command layer. It wires the real adapters (Spotify client,
//! yt-dlp backend) into the run controller and turns the result into
//! console output and an exit code.
//!
//! ```text
//! CLI Layer (console output, exit code)
//!     ↓
//! Run Controller
//!     ↓
//! Spotify client · media backend · tagger · archiver
//! ```
//!
//! ## Usage
//!
//! ```bash
//! spotgrab https://open.spotify.com/track/<id>
//! spotgrab spotify:playlist:<id> --format mp3 --quality 320
//! spotgrab <playlist-url> --no-archive --output ~/Music
//! ```

mod download;

pub use download::download;
