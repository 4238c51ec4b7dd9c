use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::api::{ApiConfig, ServerExport};
use crate::application::download_queue::{DownloadQueue, DEFAULT_NOTICE};
use crate::application::ports::{FileSaver, Notifier, UiHandle};
use crate::domain::{Book, BookStatistics, DownloadJob, JobError, SaveError, Severity};
use crate::utils::{escape_html, strip_html};

const GENERATOR: &str = "AI Book Generator";
const EXPORT_VERSION: &str = "2.1";

const BOOK_STYLES: &str = r#"<style>
        body { font-family: 'Georgia', serif; line-height: 1.6; max-width: 800px; margin: 0 auto; padding: 20px; color: #333; }
        .book-title { text-align: center; font-size: 2.5em; margin-bottom: .5em; color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 20px; }
        .concept { background:#f8f9fa; padding:20px; border-left: 4px solid #3498db; margin:20px 0; }
        .table-of-contents { background:#fff; padding:20px; border:1px solid #ddd; margin:20px 0; white-space:pre-wrap; }
        .chapter { margin: 40px 0; page-break-before: always; }
        .chapter-title { color:#2c3e50; border-bottom:2px solid #3498db; padding-bottom:10px; margin-bottom:20px; }
        .chapter-content { text-align: justify; }
        .footer { margin-top: 50px; padding-top: 20px; border-top:1px solid #ddd; text-align:center; color:#666; font-size:.9em; }
        .cover { text-align:center; margin: 10px 0 30px; }
        .cover img { max-width:100%; height:auto; border-radius:8px; box-shadow: 0 4px 12px rgba(0,0,0,.15); }
        @media print { .chapter { page-break-before: always; } }
      </style>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Text,
    Html,
    Markdown,
    Json,
    Pdf,
    Docx,
    Epub,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 7] = [
        ExportFormat::Text,
        ExportFormat::Html,
        ExportFormat::Markdown,
        ExportFormat::Json,
        ExportFormat::Pdf,
        ExportFormat::Docx,
        ExportFormat::Epub,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Text => "book.txt",
            ExportFormat::Html => "book.html",
            ExportFormat::Markdown => "book.md",
            ExportFormat::Json => "book.json",
            ExportFormat::Pdf => "book.pdf",
            ExportFormat::Docx => "book.docx",
            ExportFormat::Epub => "book.epub",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Text => "Text",
            ExportFormat::Html => "HTML",
            ExportFormat::Markdown => "Markdown",
            ExportFormat::Json => "JSON",
            ExportFormat::Pdf => "PDF",
            ExportFormat::Docx => "DOCX",
            ExportFormat::Epub => "EPUB",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain",
            ExportFormat::Html => "text/html",
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Json => "application/json",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Epub => "application/epub+zip",
        }
    }

    /// Formats rendered by the backend and fetched through the download queue.
    pub fn server(&self) -> Option<ServerExport> {
        match self {
            ExportFormat::Pdf => Some(ServerExport::Pdf),
            ExportFormat::Docx => Some(ServerExport::Docx),
            ExportFormat::Epub => Some(ServerExport::Epub),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No book data to export")]
    NoBook,

    #[error("{0} is rendered by the backend")]
    ServerSide(&'static str),

    #[error("Failed to encode book: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Job(#[from] JobError),
}

impl ExportError {
    fn user_message(&self) -> String {
        match self {
            ExportError::Save(_) => "Export failed. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Holds the current book and turns it into files.
#[derive(Clone)]
pub struct ExportManager {
    book: Option<Arc<Book>>,
    api: ApiConfig,
    queue: DownloadQueue,
    saver: Arc<dyn FileSaver>,
    notifier: Arc<dyn Notifier>,
}

impl ExportManager {
    pub fn new(
        api: ApiConfig,
        queue: DownloadQueue,
        saver: Arc<dyn FileSaver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            book: None,
            api,
            queue,
            saver,
            notifier,
        }
    }

    pub fn set_book(&mut self, book: Book) {
        self.book = Some(Arc::new(book));
    }

    pub fn book(&self) -> Option<&Book> {
        self.book.as_deref()
    }

    pub fn statistics(&self) -> Option<BookStatistics> {
        self.book().map(Book::statistics)
    }

    /// Render a client-side format.
    pub fn render(
        &self,
        format: ExportFormat,
        now: DateTime<Utc>,
    ) -> Result<ExportDocument, ExportError> {
        let book = self.book().ok_or(ExportError::NoBook)?;
        let content = match format {
            ExportFormat::Text => render_text(book, now),
            ExportFormat::Html => render_html(book, true, now),
            ExportFormat::Markdown => render_markdown(book, now),
            ExportFormat::Json => render_json(book, now)?,
            other => return Err(ExportError::ServerSide(other.label())),
        };
        Ok(ExportDocument {
            file_name: format.file_name(),
            mime_type: format.mime_type(),
            content,
        })
    }

    /// Export in `format`, reporting the outcome through the notifier.
    ///
    /// Server formats are queued; `control` is disabled while their job runs.
    pub async fn export(&self, format: ExportFormat, control: Option<Arc<dyn UiHandle>>) {
        let outcome = match format.server() {
            Some(kind) => self.request_server_export(kind, format, control),
            None => self.export_local(format).await.map(|path| {
                info!(path = %path.display(), "Book exported");
                self.notifier.notify(
                    "Export",
                    &format!("Book exported as {}", format.file_name()),
                    Severity::Success,
                    DEFAULT_NOTICE,
                );
            }),
        };

        if let Err(e) = outcome {
            error!(format = format.label(), error = %e, "Export failed");
            self.notifier
                .notify("Export", &e.user_message(), Severity::Error, DEFAULT_NOTICE);
        }
    }

    async fn export_local(&self, format: ExportFormat) -> Result<PathBuf, ExportError> {
        let document = self.render(format, Utc::now())?;
        debug!(
            file = document.file_name,
            mime = document.mime_type,
            bytes = document.content.len(),
            "Rendered export"
        );
        let path = self
            .saver
            .save(document.file_name, Bytes::from(document.content))
            .await?;
        Ok(path)
    }

    fn request_server_export(
        &self,
        kind: ServerExport,
        format: ExportFormat,
        control: Option<Arc<dyn UiHandle>>,
    ) -> Result<(), ExportError> {
        let book = self.book().ok_or(ExportError::NoBook)?;
        let mut job = DownloadJob::new(self.api.endpoint(kind.path()), format.file_name())?
            .with_body(serde_json::to_value(book)?)
            .with_header("Accept", format.mime_type());
        if let Some(control) = control {
            job = job.with_control(control);
        }
        self.queue.enqueue(job);
        Ok(())
    }
}

fn generated_on(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}

fn underline(text: &str, ch: char) -> String {
    std::iter::repeat(ch).take(text.chars().count()).collect()
}

pub fn render_text(book: &Book, now: DateTime<Utc>) -> String {
    let title = book.display_title();
    let mut out = format!("{}\n{}\n\n", title, underline(title, '='));

    if let Some(concept) = book.concept() {
        out.push_str(&format!("CONCEPT\n-------\n{}\n\n", concept));
    }
    if let Some(toc) = book.table_of_contents() {
        out.push_str(&format!("TABLE OF CONTENTS\n-----------------\n{}\n\n", toc));
    }
    if !book.chapters.is_empty() {
        out.push_str("CHAPTERS\n--------\n\n");
        for (i, chapter) in book.chapters.iter().enumerate() {
            let heading = format!("Chapter {}: {}", i + 1, chapter.title);
            out.push_str(&format!(
                "{}\n{}\n{}\n\n",
                heading,
                underline(&heading, '-'),
                strip_html(&chapter.content)
            ));
        }
    }

    out.push_str(&format!("\n\nGenerated by {} on {}", GENERATOR, generated_on(now)));
    out
}

pub fn render_html(book: &Book, include_styles: bool, now: DateTime<Utc>) -> String {
    let title = escape_html(book.display_title());
    let styles = if include_styles { BOOK_STYLES } else { "" };

    let mut html = format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\">\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
         <title>{}</title>{}</head><body>",
        title, styles
    );

    html.push_str(&format!("<h1 class=\"book-title\">{}</h1>", title));
    if let Some(cover) = book.cover_image() {
        html.push_str(&format!(
            "<div class=\"cover\"><img src=\"{}\" alt=\"Book cover\"></div>",
            escape_html(cover)
        ));
    }
    if let Some(concept) = book.concept() {
        html.push_str(&format!(
            "<div class=\"concept\"><h2>Concept</h2><p>{}</p></div>",
            escape_html(concept).replace('\n', "</p><p>")
        ));
    }
    if let Some(toc) = book.table_of_contents() {
        html.push_str(&format!(
            "<div class=\"table-of-contents\"><h2>Table of Contents</h2><pre>{}</pre></div>",
            escape_html(toc)
        ));
    }
    for (i, chapter) in book.chapters.iter().enumerate() {
        html.push_str(&format!(
            "<div class=\"chapter\">\n          \
             <h2 class=\"chapter-title\">Chapter {}: {}</h2>\n          \
             <div class=\"chapter-content\">{}</div>\n        </div>",
            i + 1,
            escape_html(&chapter.title),
            chapter.content
        ));
    }

    html.push_str(&format!(
        "<div class=\"footer\">Generated by {} on {}</div></body></html>",
        GENERATOR,
        generated_on(now)
    ));
    html
}

pub fn render_markdown(book: &Book, now: DateTime<Utc>) -> String {
    let mut md = String::new();

    if let Some(title) = book.title() {
        md.push_str(&format!("# {}\n\n", title));
    }
    if book.cover_image().is_some() {
        md.push_str("![Cover](# \"Cover image not embedded in MD export\")\n\n");
    }
    if let Some(concept) = book.concept() {
        md.push_str(&format!("## Concept\n\n{}\n\n", concept));
    }
    if let Some(toc) = book.table_of_contents() {
        md.push_str("## Table of Contents\n\n");
        // Numbering follows the source line, so blank lines leave gaps.
        for (i, line) in toc.split('\n').enumerate() {
            let line = line.trim();
            if !line.is_empty() {
                md.push_str(&format!("{}. {}\n", i + 1, line));
            }
        }
        md.push('\n');
    }
    for (i, chapter) in book.chapters.iter().enumerate() {
        md.push_str(&format!(
            "## Chapter {}: {}\n\n{}\n\n---\n\n",
            i + 1,
            chapter.title,
            strip_html(&chapter.content)
        ));
    }

    md.push_str(&format!("*Generated by {} on {}*\n", GENERATOR, generated_on(now)));
    md
}

/// The book as pretty JSON with export metadata merged into `metadata`.
pub fn render_json(book: &Book, now: DateTime<Utc>) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(book)?;

    if let Value::Object(root) = &mut value {
        let mut metadata = book.metadata.clone().unwrap_or_default();
        metadata.insert(
            "exportedAt".to_string(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        metadata.insert(
            "version".to_string(),
            Value::String(EXPORT_VERSION.to_string()),
        );
        metadata.insert(
            "generator".to_string(),
            Value::String(GENERATOR.to_string()),
        );
        root.insert("metadata".to_string(), Value::Object(metadata));
    }

    serde_json::to_string_pretty(&value)
}
