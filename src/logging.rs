use crate::config::{Config, DebugLogRotation};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "seeker-debug";
const LOG_FILE_SUFFIX: &str = "log";
const DEBUG_FILTER: &str = "seeker=debug,warn";

/// Keeps the background log writer alive; drop it last.
#[allow(dead_code)]
pub struct LogGuard(WorkerGuard);

/// Initialize logging.
///
/// By default warnings go to stderr and `RUST_LOG` can raise the level. With
/// `debug` enabled, everything from this crate goes to a rolling file in the
/// debug log directory instead.
pub fn init(config: &Config) -> Result<Option<LogGuard>> {
    if !config.debug {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
            .ok();
        return Ok(None);
    }

    let dir = debug_log_dir(config)?;
    let appender = file_appender(config, &dir)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(DEBUG_FILTER))
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer)
        .try_init()
        .ok(); // Already initialized (e.g. in tests).

    tracing::info!(
        dir = %dir.display(),
        rotation = ?config.debug_log_rotation,
        keep = config.debug_log_keep,
        "debug logging enabled"
    );

    Ok(Some(LogGuard(guard)))
}

impl From<DebugLogRotation> for Rotation {
    fn from(rotation: DebugLogRotation) -> Self {
        match rotation {
            DebugLogRotation::Never => Rotation::NEVER,
            DebugLogRotation::Hourly => Rotation::HOURLY,
            DebugLogRotation::Daily => Rotation::DAILY,
        }
    }
}

fn file_appender(config: &Config, dir: &std::path::Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    RollingFileAppender::builder()
        .rotation(config.debug_log_rotation.into())
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(config.debug_log_keep.max(1))
        .build(dir)
        .with_context(|| format!("Failed to open debug log in {}", dir.display()))
}

/// `debug_log_dir` with a leading `~/` expanded, else the config directory.
fn debug_log_dir(config: &Config) -> Result<PathBuf> {
    let Some(raw) = config.debug_log_dir.as_deref() else {
        let config_file = crate::config::config_path()?;
        return config_file
            .parent()
            .map(PathBuf::from)
            .context("Config path has no parent directory");
    };

    match raw.strip_prefix("~/") {
        Some(rest) => Ok(dirs::home_dir()
            .context("Failed to get home directory")?
            .join(rest)),
        None => Ok(PathBuf::from(raw)),
    }
}

/// Key prefixes used by the providers we talk to.
const SECRET_PREFIXES: [&str; 3] = ["sk-", "gsk_", "xai-"];
/// Shorter tails are left alone ("task-list", "sk-short").
const MIN_SECRET_LEN: usize = 8;
const REDACTED: &str = "***REDACTED***";

/// Mask API keys (`sk-...`, `gsk_...`, `xai-...`) in provider error bodies
/// before they reach a log line or an error message.
pub fn redact_secrets(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some((pos, prefix)) = next_secret_prefix(rest) {
        let tail = &rest[pos + prefix.len()..];
        let key_len = tail
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(tail.len());

        out.push_str(&rest[..pos + prefix.len()]);
        if key_len >= MIN_SECRET_LEN {
            out.push_str(REDACTED);
        } else {
            out.push_str(&tail[..key_len]);
        }
        rest = &tail[key_len..];
    }

    out.push_str(rest);
    out
}

fn next_secret_prefix(text: &str) -> Option<(usize, &'static str)> {
    SECRET_PREFIXES
        .iter()
        .filter_map(|prefix| text.find(prefix).map(|pos| (pos, *prefix)))
        .min_by_key(|(pos, _)| *pos)
}
