// src/logging.rs

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use directories::ProjectDirs;
use lazy_static::lazy_static;
use tracing_error::ErrorLayer;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", *PROJECT_NAME);
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

/// Per-user data directory, or `./.data` when the platform has none.
pub fn get_data_dir() -> PathBuf {
    ProjectDirs::from("com", "recon-graph", env!("CARGO_PKG_NAME"))
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".data"))
}

/// Where the log goes: the explicit path if given, else `<data dir>/recon-graph.log`.
pub fn resolve_log_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => get_data_dir().join(LOG_FILE.as_str()),
    }
}

/// Filter directive: `RUST_LOG`, then `<CRATE>_LOGLEVEL`, then `<crate>=info`.
fn log_filter() -> String {
    std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.as_str()))
        .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")))
}

/// Installs the global subscriber.
///
/// Events are appended to the log file so consecutive scans share one history.
/// With `mirror_stderr`, warnings and above are also printed to stderr; stdout
/// is never written, it carries the JSON report.
///
/// # Arguments
/// * `log_path` - Explicit log file; see [`resolve_log_path`].
/// * `mirror_stderr` - Also show warnings on the terminal.
///
/// # Returns
/// The path of the log file being written.
pub fn initialize_logging(log_path: Option<&Path>, mirror_stderr: bool) -> Result<PathBuf> {
    let log_path = resolve_log_path(log_path);
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).wrap_err_with(|| format!("creating {}", parent.display()))?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .wrap_err_with(|| format!("opening log file {}", log_path.display()))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(log_filter()));

    let stderr_layer = mirror_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .with_filter(EnvFilter::new("warn"))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(ErrorLayer::default())
        .init();

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_log_path_wins() {
        let path = Path::new("/tmp/recon/run.log");
        assert_eq!(resolve_log_path(Some(path)), path);
    }

    #[test]
    fn default_log_path_lives_in_data_dir() {
        let path = resolve_log_path(None);
        assert!(path.starts_with(get_data_dir()));
        assert_eq!(path.file_name().unwrap(), "recon-graph.log");
    }

    #[test]
    fn env_var_names_derive_from_crate() {
        assert_eq!(PROJECT_NAME.as_str(), "RECON_GRAPH");
        assert_eq!(LOG_ENV.as_str(), "RECON_GRAPH_LOGLEVEL");
    }
}
