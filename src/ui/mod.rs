pub mod bridge;

use std::collections::HashSet;
use std::time::Duration;

use iced::{
    widget::{button, column, progress_bar, row, scrollable, text, text_input, Column, Row, Space},
    Element, Length, Theme,
};

use crate::application::ExportFormat;
use crate::domain::{BookStatistics, Progress, Severity};

pub use bridge::{UiBridge, UiEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Export,
    Statistics,
    Generate,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

/// Main view state
pub struct ExportView {
    pub tab: Tab,
    pub status_message: String,
    pub book_title: Option<String>,
    pub statistics: Option<BookStatistics>,
    pub download_dir: String,
    pub progress_active: bool,
    pub progress: Progress,
    pub disabled: HashSet<ExportFormat>,
    /// Jobs waiting behind the active download.
    pub queued: usize,
    pub toasts: Vec<Toast>,
    pub prompt: String,
    pub generating: bool,
    pub generated: Option<String>,
    next_toast_id: u64,
}

impl Default for ExportView {
    fn default() -> Self {
        Self {
            tab: Tab::default(),
            status_message: "Load a book to export".to_string(),
            book_title: None,
            statistics: None,
            download_dir: String::new(),
            progress_active: false,
            progress: Progress::Preparing,
            disabled: HashSet::new(),
            queued: 0,
            toasts: Vec::new(),
            prompt: String::new(),
            generating: false,
            generated: None,
            next_toast_id: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExportMessage {
    TabSelected(Tab),
    LoadBookPressed,
    ChooseFolderPressed,
    ExportPressed(ExportFormat),
    IngestPressed,
    PromptChanged(String),
    GeneratePressed,
    DismissToast(u64),
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Success => "OK",
        Severity::Info => "Info",
        Severity::Warning => "Warning",
        Severity::Error => "Error",
    }
}

fn tab_style(active: bool) -> fn(&Theme, button::Status) -> button::Style {
    if active {
        button::primary
    } else {
        button::secondary
    }
}

/// Status line text for notifications that end or advance an export.
fn status_for(title: &str, message: &str) -> Option<String> {
    match title {
        "Starting download" => Some(format!("Downloading {}...", message)),
        "Download ready" | "Download failed" | "Export" => Some(message.to_string()),
        _ => None,
    }
}

pub fn progress_label(progress: Progress) -> String {
    match progress {
        Progress::Preparing => "Preparing...".to_string(),
        Progress::Percent(pct) => format!("{}%", pct),
        Progress::Working { received } => format!("Working... {} bytes", received),
        Progress::Done => "Done".to_string(),
    }
}

impl ExportView {
    pub fn update(&mut self, message: ExportMessage) {
        match message {
            ExportMessage::TabSelected(tab) => {
                self.tab = tab;
            }
            ExportMessage::DismissToast(id) => {
                self.dismiss_toast(id);
            }
            ExportMessage::PromptChanged(prompt) => {
                self.prompt = prompt;
            }
            ExportMessage::LoadBookPressed
            | ExportMessage::ChooseFolderPressed
            | ExportMessage::ExportPressed(_)
            | ExportMessage::IngestPressed
            | ExportMessage::GeneratePressed => {
                // Will be handled by the app
            }
        }
    }

    /// Apply a bridge event. Returns the toast to expire, if one was shown.
    pub fn apply_event(&mut self, event: UiEvent) -> Option<(u64, Duration)> {
        match event {
            UiEvent::Toast {
                title,
                message,
                severity,
                duration,
            } => {
                if let Some(status) = status_for(&title, &message) {
                    self.status_message = status;
                }
                let id = self.next_toast_id;
                self.next_toast_id += 1;
                self.toasts.push(Toast {
                    id,
                    title,
                    message,
                    severity,
                });
                return Some((id, duration));
            }
            UiEvent::ProgressActive(active) => {
                self.progress_active = active;
            }
            UiEvent::Progress(progress) => {
                self.progress = progress;
            }
            UiEvent::ControlEnabled(format, enabled) => {
                if enabled {
                    self.disabled.remove(&format);
                } else {
                    self.disabled.insert(format);
                }
            }
        }
        None
    }

    pub fn dismiss_toast(&mut self, id: u64) {
        self.toasts.retain(|t| t.id != id);
    }

    fn tab_button(&self, tab: Tab, label: &'static str) -> Element<'_, ExportMessage> {
        button(text(label))
            .on_press(ExportMessage::TabSelected(tab))
            .style(tab_style(self.tab == tab))
            .padding([6, 14])
            .into()
    }

    fn format_row(&self, server: bool) -> Element<'_, ExportMessage> {
        ExportFormat::ALL
            .iter()
            .filter(|format| format.server().is_some() == server)
            .fold(Row::new().spacing(10), |row, format| {
                let enabled = self.book_title.is_some() && !self.disabled.contains(format);
                row.push(
                    button(text(format.label()))
                        .on_press_maybe(enabled.then_some(ExportMessage::ExportPressed(*format)))
                        .padding([10, 20]),
                )
            })
            .into()
    }

    fn export_tab(&self) -> Element<'_, ExportMessage> {
        let book_line = match &self.book_title {
            Some(title) => format!("Book: {}", title),
            None => "No book loaded".to_string(),
        };

        column![
            row![
                button("Load book…")
                    .on_press(ExportMessage::LoadBookPressed)
                    .padding([10, 20]),
                button("Download folder…")
                    .on_press(ExportMessage::ChooseFolderPressed)
                    .padding([10, 20]),
                button("Ingest book")
                    .on_press_maybe(self.book_title.is_some().then_some(ExportMessage::IngestPressed))
                    .padding([10, 20]),
            ]
            .spacing(10),
            text(book_line).size(16),
            text(format!("Saving to: {}", self.download_dir)).size(14),
            Space::new().height(Length::Fixed(10.0)),
            text("Local export").size(16),
            self.format_row(false),
            text("Server export").size(16),
            self.format_row(true),
        ]
        .spacing(10)
        .into()
    }

    fn statistics_tab(&self) -> Element<'_, ExportMessage> {
        match &self.statistics {
            Some(stats) => column![
                text(format!("Words: {}", stats.word_count)),
                text(format!("Chapters: {}", stats.chapter_count)),
                text(format!(
                    "Average chapter length: {} words",
                    stats.average_chapter_length
                )),
                text(format!("Reading time: {}", stats.reading_time)),
                text(format!("Characters: {}", stats.character_count)),
            ]
            .spacing(6)
            .into(),
            None => text("No book loaded").into(),
        }
    }

    fn generate_tab(&self) -> Element<'_, ExportMessage> {
        let can_generate = !self.generating && !self.prompt.trim().is_empty();
        let output: Element<'_, ExportMessage> = match (&self.generated, self.generating) {
            (_, true) => text("Generating...").into(),
            (Some(generated), false) => scrollable(text(generated)).height(Length::Fill).into(),
            (None, false) => Space::new().height(Length::Fixed(0.0)).into(),
        };

        column![
            text_input("Describe what to write...", &self.prompt)
                .on_input(ExportMessage::PromptChanged)
                .padding(10),
            button("Generate")
                .on_press_maybe(can_generate.then_some(ExportMessage::GeneratePressed))
                .padding([10, 20]),
            output,
        ]
        .spacing(10)
        .into()
    }

    fn progress_area(&self) -> Element<'_, ExportMessage> {
        if !self.progress_active {
            return Space::new().height(Length::Fixed(0.0)).into();
        }
        let value = self.progress.percent().unwrap_or(0) as f32;
        let mut area = column![
            text(progress_label(self.progress)).size(14),
            progress_bar(0.0..=100.0, value),
        ]
        .spacing(4);
        if self.queued > 0 {
            area = area.push(text(format!("{} more in queue", self.queued)).size(12));
        }
        area.into()
    }

    fn toast_stack(&self) -> Element<'_, ExportMessage> {
        self.toasts
            .iter()
            .fold(Column::new().spacing(6), |col, toast| {
                col.push(
                    row![
                        text(format!(
                            "[{}] {}",
                            severity_label(toast.severity),
                            toast.title
                        ))
                        .size(14),
                        text(&toast.message).size(14),
                        button("×").on_press(ExportMessage::DismissToast(toast.id)),
                    ]
                    .spacing(10),
                )
            })
            .into()
    }

    pub fn view(&self) -> Element<'_, ExportMessage> {
        let content = match self.tab {
            Tab::Export => self.export_tab(),
            Tab::Statistics => self.statistics_tab(),
            Tab::Generate => self.generate_tab(),
        };

        column![
            text("Book Builder").size(32),
            row![
                self.tab_button(Tab::Export, "Export"),
                self.tab_button(Tab::Statistics, "Statistics"),
                self.tab_button(Tab::Generate, "Generate"),
            ]
            .spacing(6),
            Space::new().height(Length::Fixed(10.0)),
            content,
            Space::new().height(Length::Fixed(20.0)),
            self.progress_area(),
            text(&self.status_message).size(14),
            self.toast_stack(),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}
