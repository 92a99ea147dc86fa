pub mod api;
pub mod config;
pub mod error;
pub mod form;
pub mod media;
pub mod status;
pub mod transcode;

pub use api::{HttpVideoApi, UploadedVideo, VideoApi, VideoId};
pub use config::Config;
pub use error::SubmitError;
pub use form::{FormController, SubmitOutcome};
pub use media::{AudioFile, Preview, VideoFile};
pub use status::{Stage, Status};
pub use transcode::{FfmpegTranscoder, Transcoder};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Application-specific environment variable for log filtering (overrides config).
pub const LOG_ENV_VAR: &str = "UPLOAD_AI_LOG";

/// Route tracing output to the log file in the XDG state directory.
///
/// Keep the returned guard alive for the lifetime of the process; dropping it
/// flushes and stops the background writer.
pub fn init_logging(config: &config::LoggingConfig) -> Result<WorkerGuard> {
    let log_path = upload_ai_common::dirs::log_path().context("Failed to determine log path")?;
    let log_dir = log_path.parent().context("Log path has no parent")?;
    let log_filename = log_path.file_name().context("Log path has no filename")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // UPLOAD_AI_LOG env var overrides config file level
    let filter = match EnvFilter::try_from_env(LOG_ENV_VAR) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.level.as_directive())
            .context("Invalid log level directive")?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
