//! Collaborators injected into the download queue and the export manager.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{Progress, SaveError, Severity};

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str, severity: Severity, duration: Duration);
}

/// The progress area. Only the active transfer drives it.
pub trait ProgressSink: Send + Sync {
    fn set_active(&self, active: bool);
    fn report(&self, progress: Progress);
}

/// A control disabled while its job runs.
pub trait UiHandle: Send + Sync {
    fn set_enabled(&self, enabled: bool);
}

#[async_trait]
pub trait FileSaver: Send + Sync {
    /// Persist `bytes` under `file_name`, returning where they ended up.
    async fn save(&self, file_name: &str, bytes: Bytes) -> Result<PathBuf, SaveError>;
}
