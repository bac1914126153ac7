use std::{fs::OpenOptions, io, path::Path, sync::Mutex};

use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::error::{Error, Result};

/// Installs the global tracing subscriber.
///
/// The console layer writes to stderr at `warn` (`debug` with `debug`), and
/// `RUST_LOG` overrides it. When `log_file` is given, a second layer appends
/// everything from `debug` up to that file without colour codes.
pub fn init(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if debug { "spotgrab=debug" } else { "spotgrab=warn" };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(debug)
        .with_filter(console_filter);

    let file = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new("spotgrab=debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| Error::Config(format!("cannot initialise logging: {}", e)))
}
