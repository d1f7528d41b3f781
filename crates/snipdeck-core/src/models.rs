//! Core data models: pages, consoles, and the write requests that create
//! or modify them.
//!
//! A [`Page`] owns an ordered list of [`Console`]s. Tags are plain strings
//! stored on both; the global tag set is derived (see [`crate::tags`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SnipError;

/// Title given to pages created without one.
pub const DEFAULT_PAGE_TITLE: &str = "New Page";

/// Comment given to consoles created without one.
pub const DEFAULT_CONSOLE_COMMENT: &str = "New snippet";

/// A named container for an ordered set of consoles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub consoles: Vec<Console>,
    /// Creation time, Unix milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Last modification time, Unix milliseconds.
    #[serde(default)]
    pub updated_at: i64,
}

impl Page {
    pub fn console(&self, id: &str) -> Option<&Console> {
        self.consoles.iter().find(|c| c.id == id)
    }
}

/// A single code snippet with its comment, language, notes, and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Console {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: Language,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub before_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub after_text: String,
    #[serde(default)]
    pub show_before_text: bool,
    #[serde(default)]
    pub show_after_text: bool,
}

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Languages a console can be tagged with.
///
/// This is a label only; nothing in the crate parses code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Javascript,
    Python,
    Java,
    Cpp,
    Csharp,
    Php,
    Ruby,
    Go,
    Rust,
    Typescript,
    Html,
    Css,
    Sql,
    Bash,
    Json,
    Xml,
    Yaml,
}

impl Language {
    pub const ALL: [Language; 17] = [
        Language::Javascript,
        Language::Python,
        Language::Java,
        Language::Cpp,
        Language::Csharp,
        Language::Php,
        Language::Ruby,
        Language::Go,
        Language::Rust,
        Language::Typescript,
        Language::Html,
        Language::Css,
        Language::Sql,
        Language::Bash,
        Language::Json,
        Language::Xml,
        Language::Yaml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::Csharp => "csharp",
            Language::Php => "php",
            Language::Ruby => "ruby",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Typescript => "typescript",
            Language::Html => "html",
            Language::Css => "css",
            Language::Sql => "sql",
            Language::Bash => "bash",
            Language::Json => "json",
            Language::Xml => "xml",
            Language::Yaml => "yaml",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = SnipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Language::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == wanted)
            .ok_or_else(|| SnipError::Validation(format!("unsupported language: '{}'", s)))
    }
}

/// Request to create a page. The store assigns the id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPage {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for NewPage {
    fn default() -> Self {
        Self {
            title: DEFAULT_PAGE_TITLE.to_string(),
            tags: Vec::new(),
        }
    }
}

/// Full replacement of a page's editable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageUpdate {
    pub title: String,
    pub tags: Vec<String>,
}

impl PageUpdate {
    pub fn from_page(page: &Page) -> Self {
        Self {
            title: page.title.clone(),
            tags: page.tags.clone(),
        }
    }
}

/// Request to create a console under an existing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConsole {
    pub page_id: String,
    pub code: String,
    pub comment: String,
    pub language: Language,
    pub tags: Vec<String>,
    pub before_text: String,
    pub after_text: String,
    pub show_before_text: bool,
    pub show_after_text: bool,
}

impl NewConsole {
    /// A blank console with the default comment and language.
    pub fn for_page(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            code: String::new(),
            comment: DEFAULT_CONSOLE_COMMENT.to_string(),
            language: Language::default(),
            tags: Vec::new(),
            before_text: String::new(),
            after_text: String::new(),
            show_before_text: false,
            show_after_text: false,
        }
    }

    /// Copies every field of an existing console (used by import).
    pub fn from_console(page_id: impl Into<String>, console: &Console) -> Self {
        Self {
            page_id: page_id.into(),
            code: console.code.clone(),
            comment: console.comment.clone(),
            language: console.language,
            tags: console.tags.clone(),
            before_text: console.before_text.clone(),
            after_text: console.after_text.clone(),
            show_before_text: console.show_before_text,
            show_after_text: console.show_after_text,
        }
    }

    pub fn into_console(self, id: String) -> Console {
        Console {
            id,
            code: self.code,
            comment: self.comment,
            language: self.language,
            tags: self.tags,
            before_text: self.before_text,
            after_text: self.after_text,
            show_before_text: self.show_before_text,
            show_after_text: self.show_after_text,
        }
    }
}

/// Generate a fresh entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time in Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse_is_case_insensitive() {
        assert_eq!("Rust".parse::<Language>().unwrap(), Language::Rust);
        assert_eq!(" yaml ".parse::<Language>().unwrap(), Language::Yaml);
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn test_language_display_matches_serde() {
        for lang in Language::ALL {
            let json = serde_json::to_string(&lang).unwrap();
            assert_eq!(json, format!("\"{}\"", lang));
        }
    }

    #[test]
    fn test_console_null_fields_become_empty() {
        let json = r#"{"id":"c1","code":null,"comment":"hi","tags":null,"language":null}"#;
        let console: Console = serde_json::from_str(json).unwrap();
        assert_eq!(console.code, "");
        assert_eq!(console.comment, "hi");
        assert!(console.tags.is_empty());
        assert_eq!(console.language, Language::Javascript);
        assert!(!console.show_before_text);
    }

    #[test]
    fn test_new_console_defaults() {
        let nc = NewConsole::for_page("p1");
        assert_eq!(nc.comment, DEFAULT_CONSOLE_COMMENT);
        assert_eq!(nc.language, Language::Javascript);
        let console = nc.into_console("c1".to_string());
        assert_eq!(console.id, "c1");
        assert!(console.code.is_empty());
    }
}
