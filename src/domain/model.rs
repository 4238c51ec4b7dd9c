use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::application::ports::UiHandle;
use crate::domain::JobError;
use crate::utils::get_timestamp_millis;

/// One requested file transfer and its eventual local save.
///
/// Immutable once queued: the builder methods consume `self`.
#[derive(Clone)]
pub struct DownloadJob {
    pub id: String,
    pub target: String,
    pub file_name: String,
    /// A JSON string is sent raw; any other value is serialized.
    pub body: Option<Value>,
    pub headers: HashMap<String, String>,
    pub control: Option<Arc<dyn UiHandle>>,
}

impl DownloadJob {
    pub fn new(target: impl Into<String>, file_name: impl Into<String>) -> Result<Self, JobError> {
        let target = target.into();
        let file_name = file_name.into();

        if target.trim().is_empty() {
            return Err(JobError::EmptyTarget);
        }
        if file_name.trim().is_empty() {
            return Err(JobError::EmptyFileName);
        }

        let id = format!("{}::{}::{}", target, file_name, get_timestamp_millis());

        Ok(Self {
            id,
            target,
            file_name,
            body: None,
            headers: HashMap::new(),
            control: None,
        })
    }

    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_control(mut self, control: Arc<dyn UiHandle>) -> Self {
        self.control = Some(control);
        self
    }

    /// Request body text, if the job carries one.
    pub fn payload(&self) -> Option<String> {
        self.body.as_ref().map(|body| match body {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        })
    }
}

impl fmt::Debug for DownloadJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadJob")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("file_name", &self.file_name)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("control", &self.control.is_some())
            .finish()
    }
}

/// Total size announced by the response, if any.
///
/// A present `content-length: 0` is `Known(0)`, not `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedSize {
    Unknown,
    Known(u64),
}

impl ExpectedSize {
    /// Parses a raw header value. Non-numeric and negative values are unknown.
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map_or(ExpectedSize::Unknown, ExpectedSize::Known)
    }

    /// Percentage of the total covered by `received`, clamped to 100.
    pub fn percent_of(&self, received: u64) -> Option<u8> {
        match *self {
            ExpectedSize::Unknown => None,
            ExpectedSize::Known(0) => Some(100),
            ExpectedSize::Known(total) => {
                let pct = (u128::from(received) * 100 / u128::from(total)).min(100);
                Some(pct as u8)
            }
        }
    }
}

/// State reported to the progress indicator while a transfer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Preparing,
    Percent(u8),
    /// Total unknown; only the received byte count is shown.
    Working { received: u64 },
    Done,
}

impl Progress {
    pub fn percent(&self) -> Option<u8> {
        match self {
            Progress::Preparing => Some(0),
            Progress::Percent(pct) => Some(*pct),
            Progress::Working { .. } => None,
            Progress::Done => Some(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}
