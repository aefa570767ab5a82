use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;
use weft_common::action::Action;

use crate::client::GenError;

/// Milliseconds since the Unix epoch, for artifact names. Reads 0 on a clock
/// set before the epoch rather than failing.
pub(crate) fn stamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Write the log as pretty-printed JSON to an explicit path, creating parent
/// directories as needed.
pub async fn export_log(path: &Path, log: &[Action]) -> Result<(), GenError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_string_pretty(log)?;
    tokio::fs::write(path, json).await?;
    debug!(path = %path.display(), actions = log.len(), "log exported");
    Ok(())
}

/// Write the log under `dir` with a timestamped name, returning the path.
pub async fn export_log_to_dir(dir: &Path, log: &[Action]) -> Result<PathBuf, GenError> {
    let path = dir.join(format!("tracking-log-{}.json", stamp_ms()));
    export_log(&path, log).await?;
    Ok(path)
}
