//! In-memory collaborators for queue and export tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::Notify;

use crate::application::download_queue::DownloadQueue;
use crate::application::ports::{FileSaver, Notifier, ProgressSink, UiHandle};
use crate::application::transport::{
    ResponseBody, TransferRequest, Transport, TransportResponse, CONTENT_LENGTH,
};
use crate::domain::{DownloadJob, Progress, SaveError, Severity, TransferError};

/// Ordered record of transport and saver calls.
pub type Log = Arc<Mutex<Vec<String>>>;

#[derive(Clone)]
pub struct Scripted {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub chunks: Vec<Result<Bytes, TransferError>>,
    pub buffered: bool,
    pub send_error: Option<TransferError>,
    pub gate: Option<Arc<Notify>>,
}

impl Scripted {
    pub fn ok(chunks: &[&'static [u8]]) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            chunks: chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect(),
            buffered: false,
            send_error: None,
            gate: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::ok(&[])
        }
    }

    pub fn length(mut self, len: &str) -> Self {
        self.headers.push((CONTENT_LENGTH, len.to_string()));
        self
    }

    /// Hold the response until the gate is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Scripted by URL; unknown URLs answer 404.
pub struct FakeTransport {
    pub scripts: HashMap<String, Scripted>,
    pub requests: Mutex<Vec<TransferRequest>>,
    pub log: Log,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: TransferRequest) -> Result<TransportResponse, TransferError> {
        self.log.lock().unwrap().push(format!("send {}", request.url));
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Scripted::status(404));

        if let Some(gate) = &script.gate {
            gate.notified().await;
        }
        if let Some(err) = script.send_error {
            return Err(err);
        }

        let body = if script.buffered {
            let joined: Vec<u8> = script
                .chunks
                .into_iter()
                .flat_map(|c| c.unwrap().to_vec())
                .collect();
            ResponseBody::buffered(Bytes::from(joined))
        } else {
            ResponseBody::Stream(futures::stream::iter(script.chunks).boxed())
        };

        Ok(TransportResponse {
            status: script.status,
            headers: script
                .headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            body,
        })
    }
}

pub struct MemorySaver {
    pub saved: Mutex<Vec<(String, Bytes)>>,
    /// File name whose save fails with a write error.
    pub fail_on: Mutex<Option<String>>,
    pub log: Log,
}

#[async_trait]
impl FileSaver for MemorySaver {
    async fn save(&self, file_name: &str, bytes: Bytes) -> Result<PathBuf, SaveError> {
        self.log.lock().unwrap().push(format!("save {}", file_name));
        if self.fail_on.lock().unwrap().as_deref() == Some(file_name) {
            return Err(SaveError::Write {
                path: file_name.to_string(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.saved
            .lock()
            .unwrap()
            .push((file_name.to_string(), bytes));
        Ok(PathBuf::from(file_name))
    }
}

impl MemorySaver {
    pub fn fail_on(&self, file_name: &str) {
        *self.fail_on.lock().unwrap() = Some(file_name.to_string());
    }

    pub fn text_of(&self, file_name: &str) -> Option<String> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, bytes)| String::from_utf8_lossy(bytes).into_owned())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notes: Mutex<Vec<(String, String, Severity)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str, severity: Severity, _duration: Duration) {
        self.notes
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string(), severity));
    }
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _, _)| t.clone())
            .collect()
    }

    pub fn titled(&self, title: &str) -> Vec<String> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _, _)| t == title)
            .map(|(_, m, _)| m.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Active(bool),
    Report(Progress),
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<SinkEvent>>,
}

impl ProgressSink for RecordingSink {
    fn set_active(&self, active: bool) {
        self.events.lock().unwrap().push(SinkEvent::Active(active));
    }

    fn report(&self, progress: Progress) {
        self.events.lock().unwrap().push(SinkEvent::Report(progress));
    }
}

impl RecordingSink {
    pub fn percents(&self) -> Vec<u8> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Report(Progress::Percent(p)) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn last(&self) -> Option<SinkEvent> {
        self.events.lock().unwrap().last().cloned()
    }
}

#[derive(Default)]
pub struct RecordingControl {
    pub states: Mutex<Vec<bool>>,
}

impl UiHandle for RecordingControl {
    fn set_enabled(&self, enabled: bool) {
        self.states.lock().unwrap().push(enabled);
    }
}

pub struct Harness {
    pub queue: DownloadQueue,
    pub transport: Arc<FakeTransport>,
    pub saver: Arc<MemorySaver>,
    pub notifier: Arc<RecordingNotifier>,
    pub sink: Arc<RecordingSink>,
    pub log: Log,
}

pub fn harness(scripts: Vec<(&str, Scripted)>) -> Harness {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let transport = Arc::new(FakeTransport {
        scripts: scripts
            .into_iter()
            .map(|(url, s)| (url.to_string(), s))
            .collect(),
        requests: Mutex::new(Vec::new()),
        log: log.clone(),
    });
    let saver = Arc::new(MemorySaver {
        saved: Mutex::new(Vec::new()),
        fail_on: Mutex::new(None),
        log: log.clone(),
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let sink = Arc::new(RecordingSink::default());
    let queue = DownloadQueue::new(
        transport.clone(),
        saver.clone(),
        notifier.clone(),
        sink.clone(),
    );
    Harness {
        queue,
        transport,
        saver,
        notifier,
        sink,
        log,
    }
}

pub fn job(target: &str, file: &str) -> DownloadJob {
    DownloadJob::new(target, file).unwrap()
}
