use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::application::ports::{FileSaver, Notifier, ProgressSink, UiHandle};
use crate::application::transport::{ResponseBody, TransferRequest, Transport, CONTENT_LENGTH};
use crate::domain::{DownloadJob, ExpectedSize, Progress, Severity, TransferError};

pub const QUEUED_NOTICE: Duration = Duration::from_millis(2200);
pub const START_NOTICE: Duration = Duration::from_millis(1400);
pub const DEFAULT_NOTICE: Duration = Duration::from_millis(2600);
/// How long "Done" stays visible before the progress area is hidden.
pub const COMPLETION_LINGER: Duration = Duration::from_millis(900);

// Upper bound on buffer preallocation from content-length.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

struct QueueState {
    jobs: VecDeque<DownloadJob>,
    active: bool,
}

struct QueueInner {
    state: Mutex<QueueState>,
    idle: Notify,
    transfer_seq: AtomicU64,
    linger: Duration,
    transport: Arc<dyn Transport>,
    saver: Arc<dyn FileSaver>,
    notifier: Arc<dyn Notifier>,
    progress: Arc<dyn ProgressSink>,
}

/// FIFO download queue running at most one transfer at a time.
///
/// Cheap to clone; all clones share the same queue.
#[derive(Clone)]
pub struct DownloadQueue {
    inner: Arc<QueueInner>,
}

impl DownloadQueue {
    pub fn new(
        transport: Arc<dyn Transport>,
        saver: Arc<dyn FileSaver>,
        notifier: Arc<dyn Notifier>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    jobs: VecDeque::new(),
                    active: false,
                }),
                idle: Notify::new(),
                transfer_seq: AtomicU64::new(0),
                linger: COMPLETION_LINGER,
                transport,
                saver,
                notifier,
                progress,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a job and start draining if nothing is running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, job: DownloadJob) {
        let file_name = job.file_name.clone();
        let ahead = {
            let mut state = self.lock_state();
            let ahead = state.jobs.len() + usize::from(state.active);
            debug!(job_id = %job.id, ahead, "Enqueue download");
            state.jobs.push_back(job);
            ahead
        };

        if ahead > 0 {
            self.inner.notifier.notify(
                "Queued",
                &format!("{} added to downloads queue ({} ahead).", file_name, ahead),
                Severity::Success,
                QUEUED_NOTICE,
            );
        }

        self.process_next();
    }

    pub fn is_active(&self) -> bool {
        self.lock_state().active
    }

    /// Jobs waiting behind the active one.
    pub fn pending(&self) -> usize {
        self.lock_state().jobs.len()
    }

    fn is_idle(&self) -> bool {
        let state = self.lock_state();
        !state.active && state.jobs.is_empty()
    }

    /// Resolves once the queue is empty and no transfer is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn process_next(&self) {
        let Some(job) = self.take_next() else {
            return;
        };
        let queue = self.clone();
        tokio::spawn(async move { queue.drain(job).await });
    }

    /// Pop the head and raise the active flag, unless a transfer is running.
    fn take_next(&self) -> Option<DownloadJob> {
        let mut state = self.lock_state();
        if state.active {
            return None;
        }
        let job = state.jobs.pop_front()?;
        state.active = true;
        Some(job)
    }

    fn finish_active(&self) {
        let mut state = self.lock_state();
        state.active = false;
        if state.jobs.is_empty() {
            self.inner.idle.notify_waiters();
        }
    }

    async fn drain(self, mut job: DownloadJob) {
        loop {
            self.run_job(job).await;
            self.finish_active();
            match self.take_next() {
                Some(next) => job = next,
                None => break,
            }
        }
    }

    async fn run_job(&self, job: DownloadJob) {
        let _control = ControlGuard::engage(job.control.clone());
        let notifier = &self.inner.notifier;

        info!(job_id = %job.id, target = %job.target, "Starting download");
        notifier.notify(
            "Starting download",
            &job.file_name,
            Severity::Success,
            START_NOTICE,
        );

        match self.execute_transfer(&job).await {
            Ok(received) => {
                info!(job_id = %job.id, bytes = received, "Download saved");
                notifier.notify(
                    "Download ready",
                    &format!("{} saved.", job.file_name),
                    Severity::Success,
                    DEFAULT_NOTICE,
                );
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Download failed");
                self.inner.progress.set_active(false);
                notifier.notify(
                    "Download failed",
                    &e.to_string(),
                    Severity::Error,
                    DEFAULT_NOTICE,
                );
            }
        }
    }

    /// Request, stream with progress, and save one job. Returns the byte count.
    async fn execute_transfer(&self, job: &DownloadJob) -> Result<u64, TransferError> {
        let sink = self.inner.progress.as_ref();
        let seq = self.inner.transfer_seq.fetch_add(1, Ordering::SeqCst) + 1;

        sink.set_active(true);
        sink.report(Progress::Preparing);

        let request = TransferRequest::from_job(job);
        let response = self.inner.transport.send(request).await?;
        if !response.is_success() {
            return Err(TransferError::RequestFailed {
                status: response.status,
            });
        }

        let expected = ExpectedSize::from_header(response.header(CONTENT_LENGTH));
        debug!(job_id = %job.id, ?expected, "Response headers received");

        let bytes = read_with_progress(response.body, expected, sink).await?;
        let received = bytes.len() as u64;

        let path = self.inner.saver.save(&job.file_name, bytes).await?;
        debug!(job_id = %job.id, path = %path.display(), "Saved download");

        sink.report(Progress::Done);
        self.schedule_clear(seq);

        Ok(received)
    }

    /// Hide the progress area after the linger, unless another transfer has
    /// started in the meantime.
    fn schedule_clear(&self, seq: u64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.linger).await;
            if inner.transfer_seq.load(Ordering::SeqCst) == seq {
                inner.progress.set_active(false);
            }
        });
    }
}

/// Read the body into one buffer, reporting progress along the way.
///
/// A buffered body has no intermediate steps: it reports 100% once the
/// payload is in, whatever the announced size.
pub async fn read_with_progress(
    body: ResponseBody,
    expected: ExpectedSize,
    sink: &dyn ProgressSink,
) -> Result<Bytes, TransferError> {
    let mut chunks = match body {
        ResponseBody::Buffered(whole) => {
            let bytes = whole.await?;
            sink.report(Progress::Percent(100));
            return Ok(bytes);
        }
        ResponseBody::Stream(chunks) => chunks,
    };

    let capacity = match expected {
        ExpectedSize::Known(total) => total.min(MAX_PREALLOCATION) as usize,
        ExpectedSize::Unknown => 0,
    };
    let mut buffer = BytesMut::with_capacity(capacity);
    let mut last_pct: Option<u8> = None;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        buffer.extend_from_slice(&chunk);
        let received = buffer.len() as u64;

        match expected.percent_of(received) {
            Some(pct) if last_pct.map_or(true, |last| pct > last) => {
                sink.report(Progress::Percent(pct));
                last_pct = Some(pct);
            }
            Some(_) => {}
            None => sink.report(Progress::Working { received }),
        }
    }

    // Empty body: no chunk ever reported.
    if last_pct.is_none() {
        if let Some(pct) = expected.percent_of(buffer.len() as u64) {
            sink.report(Progress::Percent(pct));
        }
    }

    Ok(buffer.freeze())
}

/// Disables a control for the lifetime of the guard.
struct ControlGuard(Option<Arc<dyn UiHandle>>);

impl ControlGuard {
    fn engage(control: Option<Arc<dyn UiHandle>>) -> Self {
        if let Some(control) = &control {
            control.set_enabled(false);
        }
        Self(control)
    }
}

impl Drop for ControlGuard {
    fn drop(&mut self) {
        if let Some(control) = &self.0 {
            control.set_enabled(true);
        }
    }
}
