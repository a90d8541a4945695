//! Process lifecycle: shutdown signalling and the leftover-directory sweep
//!
//! Per-request cleanup lives with the snippet environment itself. This module
//! holds the process-level backstop: on exit or interruption every directory
//! carrying an environment prefix under the temp root is deleted.

pub mod shutdown;

pub use shutdown::ShutdownSignal;

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::environment::EnvironmentKind;

/// What a sweep removed and what it could not
#[derive(Debug, Default)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every template and snippet directory directly under `root`
///
/// Best effort: a directory that cannot be removed is recorded and the sweep
/// moves on. Entries without an environment prefix are never touched, and
/// symlinks are skipped even when their names match.
pub async fn sweep(root: &Path) -> SweepReport {
    let mut report = SweepReport::default();

    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(root = %root.display(), "Cannot read temp root for sweep: {}", e);
            report.failed.push((root.to_path_buf(), e.to_string()));
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Sweep stopped reading temp root: {}", e);
                report.failed.push((root.to_path_buf(), e.to_string()));
                break;
            }
        };

        let name = entry.file_name();
        let Some(kind) = name.to_str().and_then(EnvironmentKind::from_dir_name) else {
            continue;
        };

        match entry.file_type().await {
            Ok(file_type) if file_type.is_dir() => {}
            _ => continue,
        }

        let path = entry.path();
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), ?kind, "Swept environment");
                report.removed.push(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), "Failed to sweep environment: {}", e);
                report.failed.push((path, e.to_string()));
            }
        }
    }

    info!(
        removed = report.removed.len(),
        failed = report.failed.len(),
        "Sweep finished"
    );
    report
}
