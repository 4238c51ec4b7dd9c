use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use iced::{Subscription, Task};
use tracing::{info, warn};

use crate::api::{response_text, ApiClient, ReqwestTransport};
use crate::application::download_queue::DEFAULT_NOTICE;
use crate::application::ports::Notifier;
use crate::application::{DownloadQueue, ExportManager};
use crate::config::AppConfig;
use crate::domain::{AppError, Book, Severity};
use crate::platform::DirectorySaver;
use crate::ui::{ExportMessage, ExportView, UiBridge, UiEvent};

pub struct BookBuilderApp {
    view: ExportView,
    api_client: ApiClient,
    exports: ExportManager,
    queue: DownloadQueue,
    saver: Arc<DirectorySaver>,
    bridge: UiBridge,
}

impl BookBuilderApp {
    pub fn new(config: AppConfig) -> (Self, Task<Message>) {
        let (bridge, events) = UiBridge::channel();
        let saver = Arc::new(DirectorySaver::new(config.download_dir.clone()));
        let notifier = Arc::new(bridge.clone());

        let queue = DownloadQueue::new(
            Arc::new(ReqwestTransport::new(config.streaming)),
            saver.clone(),
            notifier.clone(),
            Arc::new(bridge.clone()),
        );
        let exports = ExportManager::new(config.api.clone(), queue.clone(), saver.clone(), notifier);
        let api_client = ApiClient::new(config.api.clone());

        let mut view = ExportView::default();
        view.download_dir = saver.dir().display().to_string();

        let health = {
            let client = api_client.clone();
            Task::perform(
                async move {
                    client
                        .health()
                        .await
                        .map(|_| ())
                        .map_err(|e| AppError::Api(e.to_string()))
                },
                Message::BackendChecked,
            )
        };

        let app = Self {
            view,
            api_client,
            exports,
            queue,
            saver,
            bridge,
        };
        (
            app,
            Task::batch([Task::stream(events.map(Message::Bridge)), health]),
        )
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(ExportMessage),
    Bridge(UiEvent),
    BackendChecked(Result<(), AppError>),
    /// `None` when the dialog was dismissed
    BookLoaded(Option<Result<Book, AppError>>),
    FolderSelected(Option<PathBuf>),
    ToastExpired(u64),
    ExportFinished,
    Ingested(Result<(), AppError>),
    Generated(Result<String, AppError>),
    CloseRequested,
    QueueDrained,
}

/// Read and parse a book JSON file.
pub async fn load_book(path: &Path) -> Result<Book, AppError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Io(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| AppError::InvalidBook(e.to_string()))
}

pub fn update(app: &mut BookBuilderApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                ExportMessage::LoadBookPressed => {
                    return Task::perform(
                        async {
                            let handle = rfd::AsyncFileDialog::new()
                                .add_filter("Book", &["json"])
                                .pick_file()
                                .await?;
                            Some(load_book(handle.path()).await)
                        },
                        Message::BookLoaded,
                    );
                }
                ExportMessage::ChooseFolderPressed => {
                    let start = app.saver.dir();
                    return Task::perform(
                        async move {
                            rfd::AsyncFileDialog::new()
                                .set_directory(start)
                                .pick_folder()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::FolderSelected,
                    );
                }
                ExportMessage::ExportPressed(format) => {
                    let exports = app.exports.clone();
                    // Only server exports hold their button while queued.
                    let control = format.server().map(|_| app.bridge.control(format));
                    app.view.status_message = format!("Exporting {}...", format.label());
                    return Task::perform(
                        async move { exports.export(format, control).await },
                        |_| Message::ExportFinished,
                    );
                }
                ExportMessage::IngestPressed => {
                    let Some(book) = app.exports.book() else {
                        return Task::none();
                    };
                    let payload = match serde_json::to_value(book) {
                        Ok(payload) => payload,
                        Err(e) => {
                            app.bridge
                                .notify("Ingest", &e.to_string(), Severity::Error, DEFAULT_NOTICE);
                            return Task::none();
                        }
                    };
                    let client = app.api_client.clone();
                    return Task::perform(
                        async move {
                            client
                                .ingest(&payload)
                                .await
                                .map(|_| ())
                                .map_err(|e| AppError::Api(e.to_string()))
                        },
                        Message::Ingested,
                    );
                }
                ExportMessage::GeneratePressed => {
                    let prompt = app.view.prompt.trim().to_string();
                    let client = app.api_client.clone();
                    app.view.generating = true;
                    return Task::perform(
                        async move {
                            client
                                .generate(&prompt, None)
                                .await
                                .map(|value| response_text(&value))
                                .map_err(|e| AppError::Api(e.to_string()))
                        },
                        Message::Generated,
                    );
                }
                ExportMessage::TabSelected(_)
                | ExportMessage::DismissToast(_)
                | ExportMessage::PromptChanged(_) => {}
            }
        }
        Message::Bridge(event) => {
            app.view.queued = app.queue.pending();
            if let Some((id, duration)) = app.view.apply_event(event) {
                return Task::perform(tokio::time::sleep(duration), move |_| {
                    Message::ToastExpired(id)
                });
            }
        }
        Message::BackendChecked(result) => match result {
            Ok(()) => {
                let base_url = &app.api_client.config().base_url;
                info!(base_url = %base_url, "Backend reachable");
                app.view.status_message = "Backend connected".to_string();
                app.bridge.notify(
                    "Backend",
                    &format!("Connected to {}", base_url),
                    Severity::Info,
                    DEFAULT_NOTICE,
                );
            }
            Err(e) => {
                warn!(error = %e, "Backend health check failed");
                app.view.status_message = format!("Backend unavailable: {}", e);
                app.bridge.notify(
                    "Backend",
                    "Server exports need a running backend",
                    Severity::Warning,
                    DEFAULT_NOTICE,
                );
            }
        },
        Message::BookLoaded(None) => {}
        Message::BookLoaded(Some(Ok(book))) => {
            info!(title = book.display_title(), chapters = book.chapters.len(), "Book loaded");
            app.view.book_title = Some(book.display_title().to_string());
            app.exports.set_book(book);
            app.view.statistics = app.exports.statistics();
            app.view.status_message = "Book loaded".to_string();
        }
        Message::BookLoaded(Some(Err(e))) => {
            warn!(error = %e, "Failed to load book");
            app.view.status_message = e.to_string();
        }
        Message::FolderSelected(Some(dir)) => {
            app.saver.set_dir(dir);
            app.view.download_dir = app.saver.dir().display().to_string();
        }
        Message::FolderSelected(None) => {}
        Message::ToastExpired(id) => {
            app.view.dismiss_toast(id);
        }
        // The outcome arrives as a notification through the bridge.
        Message::ExportFinished => {}
        Message::Ingested(result) => match result {
            Ok(()) => app.bridge.notify(
                "Ingest",
                "Book sent to the backend",
                Severity::Info,
                DEFAULT_NOTICE,
            ),
            Err(e) => {
                warn!(error = %e, "Ingest failed");
                app.bridge
                    .notify("Ingest", &e.to_string(), Severity::Error, DEFAULT_NOTICE);
            }
        },
        Message::Generated(result) => {
            app.view.generating = false;
            match result {
                Ok(text) => app.view.generated = Some(text),
                Err(e) => {
                    warn!(error = %e, "Generation failed");
                    app.bridge
                        .notify("Generate", &e.to_string(), Severity::Error, DEFAULT_NOTICE);
                }
            }
        }
        Message::CloseRequested => {
            if app.queue.is_active() {
                info!(pending = app.queue.pending(), "Waiting for downloads before exit");
                app.view.status_message = "Finishing downloads before closing...".to_string();
            }
            let queue = app.queue.clone();
            return Task::perform(async move { queue.wait_idle().await }, |_| {
                Message::QueueDrained
            });
        }
        Message::QueueDrained => {
            return iced::exit();
        }
    }
    Task::none()
}

pub fn view(app: &BookBuilderApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}

pub fn subscription(_app: &BookBuilderApp) -> Subscription<Message> {
    iced::window::close_requests().map(|_| Message::CloseRequested)
}
