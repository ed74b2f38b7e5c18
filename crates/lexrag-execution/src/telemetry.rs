//! Subscriber installation.

use crate::tracing_layer::RefinementEvent;
use crate::tracing_layer::RefinementEventLayer;
use lexrag_core::error::{LexragError, Result};
use tokio::sync::mpsc::UnboundedSender;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding an `EnvFilter` directive string.
pub const LOG_ENV: &str = "LEXRAG_LOG";

const CRATES: &[&str] = &[
    "lexrag_core",
    "lexrag_infrastructure",
    "lexrag_interaction",
    "lexrag_application",
    "lexrag_execution",
    "lexrag_cli",
];

/// Maps a `-v` count to a level for the workspace crates.
pub fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Directives that silence dependencies and set our crates to `level`.
pub fn default_directives(verbose: u8) -> String {
    let level = level_for(verbose).to_string().to_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(CRATES.iter().map(|krate| format!("{krate}={level}")));
    directives.join(",")
}

/// `LEXRAG_LOG` when set and valid, otherwise the `-v` derived default.
pub fn build_filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Installs the global subscriber: a compact stderr formatter and, when
/// `events` is given, a [`RefinementEventLayer`] feeding that channel.
///
/// # Errors
///
/// `LexragError::Internal` if a global subscriber is already installed.
pub fn init_tracing(verbose: u8, events: Option<UnboundedSender<RefinementEvent>>) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(build_filter(verbose));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(events.map(RefinementEventLayer::new))
        .try_init()
        .map_err(|e| LexragError::internal(format!("Failed to install tracing subscriber: {e}")))
}
