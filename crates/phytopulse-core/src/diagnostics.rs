use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

pub const DEFAULT_LOG_FILTER: &str = "info,phytopulse_core=debug,phytopulse_server_lib=debug";
pub const DEFAULT_FILE_PREFIX: &str = "phytopulse";

/// Where and how much to log. `RUST_LOG` takes precedence over `filter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub log_dir: PathBuf,
    pub file_prefix: String,
    pub filter: String,
}

impl LogSettings {
    #[must_use]
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    fn log_file_name(&self, session_id: Uuid) -> String {
        let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
        let session = session_id.simple().to_string();
        format!("{}-{timestamp}-{}.log", self.file_prefix, &session[..8])
    }

    fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.filter)
                .with_context(|| format!("invalid log filter '{}'", self.filter)),
        }
    }
}

/// Holds the non-blocking file writer open; drop it only at shutdown.
pub struct TelemetryGuard {
    pub session_id: Uuid,
    pub log_file: PathBuf,
    _file_guard: WorkerGuard,
}

/// Installs compact stdout logging plus a JSON log file for this session.
pub fn init_tracing(settings: &LogSettings) -> anyhow::Result<TelemetryGuard> {
    let log_dir: &Path = &settings.log_dir;
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

    let session_id = Uuid::new_v4();
    let file_name = settings.log_file_name(session_id);
    let log_file = log_dir.join(&file_name);
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, file_name));

    let stdout_layer = tracing_subscriber::fmt::layer().compact().with_target(true);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .json()
        .with_current_span(true)
        .with_writer(file_writer);

    match tracing_subscriber::registry()
        .with(settings.env_filter()?)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        Ok(()) => info!(%session_id, log_file = %log_file.display(), "tracing initialized"),
        Err(error) => warn!(?error, "global tracing subscriber already initialized"),
    }

    Ok(TelemetryGuard {
        session_id,
        log_file,
        _file_guard: file_guard,
    })
}
