use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_LEVEL_ENV: &str = "TASKBOARD_LOG_LEVEL";
const LOG_FILE_PREFIX: &str = "taskboard-";

pub fn init_logging() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let log_dir = get_log_directory()?;
    fs::create_dir_all(&log_dir)?;

    let log_file_path = get_log_file_path(&log_dir);

    let file = fs::File::create(&log_file_path)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    std::mem::forget(guard);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(build_log_filter())
        .with(file_layer)
        .try_init()?;

    tracing::info!("Logging initialized. Log file: {}", log_file_path.display());

    Ok(log_file_path)
}

fn build_log_filter() -> EnvFilter {
    let level = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|raw| normalize_log_level(raw.as_str()))
        .unwrap_or("warn");
    EnvFilter::new(format!("{level},taskboard={level}"))
}

fn normalize_log_level(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

pub fn get_log_directory() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let data_dir = dirs::data_local_dir().ok_or("Failed to determine local data directory")?;
    Ok(data_dir.join("taskboard").join("logs"))
}

pub fn get_log_file_path(log_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    log_dir.join(format!("{LOG_FILE_PREFIX}{timestamp}.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_file_path() {
        let path = get_log_file_path(Path::new("/tmp/test-logs"));
        let name = path
            .file_name()
            .expect("log path should have a file name")
            .to_string_lossy();
        assert!(name.starts_with("taskboard-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_normalize_log_level() {
        assert_eq!(normalize_log_level("TRACE"), Some("trace"));
        assert_eq!(normalize_log_level(" warning "), Some("warn"));
        assert_eq!(normalize_log_level("nope"), None);
    }
}
