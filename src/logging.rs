//! Tracing subscriber setup.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Where log lines go.
pub(crate) enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
    /// The TUI owns the terminal; logs must not touch it.
    Discard,
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub(crate) fn init(target: LogTarget<'_>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("exam_proctor_cli=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // try_init: a second init (e.g. from tests) keeps the first subscriber.
    match target {
        LogTarget::Stderr => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
        LogTarget::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        LogTarget::Discard => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }
    Ok(())
}
