use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::strip_html;

pub const DEFAULT_TITLE: &str = "AI Generated Book";
const WORDS_PER_MINUTE: usize = 200;

/// A generated book as returned by the backend.
///
/// Fields the frontend does not understand are kept in `extra` so a JSON
/// export carries them through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_of_contents: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Chapter {
    #[serde(default)]
    pub title: String,
    /// HTML fragment.
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStatistics {
    pub word_count: usize,
    pub chapter_count: usize,
    pub average_chapter_length: usize,
    pub reading_time: String,
    pub character_count: usize,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl Book {
    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    pub fn display_title(&self) -> &str {
        self.title().unwrap_or(DEFAULT_TITLE)
    }

    pub fn concept(&self) -> Option<&str> {
        non_empty(&self.concept)
    }

    pub fn table_of_contents(&self) -> Option<&str> {
        non_empty(&self.table_of_contents)
    }

    pub fn cover_image(&self) -> Option<&str> {
        non_empty(&self.cover_image)
    }

    pub fn word_count(&self) -> usize {
        self.chapters
            .iter()
            .map(|ch| strip_html(&ch.content).split_whitespace().count())
            .sum()
    }

    pub fn statistics(&self) -> BookStatistics {
        let word_count = self.word_count();
        let chapter_count = self.chapters.len();
        let average_chapter_length = if chapter_count > 0 {
            (word_count as f64 / chapter_count as f64).round() as usize
        } else {
            0
        };
        let character_count = self
            .chapters
            .iter()
            .map(|ch| strip_html(&ch.content).chars().count())
            .sum();

        BookStatistics {
            word_count,
            chapter_count,
            average_chapter_length,
            reading_time: format_reading_time(word_count),
            character_count,
        }
    }
}

pub fn format_reading_time(word_count: usize) -> String {
    let minutes = word_count.div_ceil(WORDS_PER_MINUTE);
    if minutes < 60 {
        return format!("{} minutes", minutes);
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    let plural = if hours > 1 { "s" } else { "" };
    format!("{} hour{} {} minutes", hours, plural, rest)
}
