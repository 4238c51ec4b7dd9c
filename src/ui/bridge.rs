//! Forwards queue and export callbacks into the iced update loop.

use std::sync::Arc;
use std::time::Duration;

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::application::ports::{Notifier, ProgressSink, UiHandle};
use crate::application::ExportFormat;
use crate::domain::{Progress, Severity};

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Toast {
        title: String,
        message: String,
        severity: Severity,
        duration: Duration,
    },
    ProgressActive(bool),
    Progress(Progress),
    ControlEnabled(ExportFormat, bool),
}

#[derive(Clone)]
pub struct UiBridge {
    tx: UnboundedSender<UiEvent>,
}

impl UiBridge {
    pub fn channel() -> (Self, UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded();
        (Self { tx }, rx)
    }

    /// Handle for the button that triggered a server export.
    pub fn control(&self, format: ExportFormat) -> Arc<dyn UiHandle> {
        Arc::new(ExportControl {
            format,
            tx: self.tx.clone(),
        })
    }

    fn send(&self, event: UiEvent) {
        // The receiver only goes away when the window closes.
        let _ = self.tx.unbounded_send(event);
    }
}

impl Notifier for UiBridge {
    fn notify(&self, title: &str, message: &str, severity: Severity, duration: Duration) {
        self.send(UiEvent::Toast {
            title: title.to_string(),
            message: message.to_string(),
            severity,
            duration,
        });
    }
}

impl ProgressSink for UiBridge {
    fn set_active(&self, active: bool) {
        self.send(UiEvent::ProgressActive(active));
    }

    fn report(&self, progress: Progress) {
        self.send(UiEvent::Progress(progress));
    }
}

struct ExportControl {
    format: ExportFormat,
    tx: UnboundedSender<UiEvent>,
}

impl UiHandle for ExportControl {
    fn set_enabled(&self, enabled: bool) {
        let _ = self
            .tx
            .unbounded_send(UiEvent::ControlEnabled(self.format, enabled));
    }
}
