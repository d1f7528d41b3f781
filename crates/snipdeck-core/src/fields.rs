//! Editable fields and typed partial updates.
//!
//! Every edit names a closed [`Field`] and carries a [`FieldValue`]. The
//! pair is validated into a [`Patch`] before anything is buffered or sent
//! to a store, so unknown fields and mismatched values never get through.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnipError};
use crate::models::{Console, Language, Page, PageUpdate};
use crate::tags::normalize_tags;

/// The two kinds of editable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Page,
    Console,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Page => f.write_str("page"),
            EntityKind::Console => f.write_str("console"),
        }
    }
}

impl FromStr for EntityKind {
    type Err = SnipError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "page" => Ok(EntityKind::Page),
            "console" => Ok(EntityKind::Console),
            other => Err(SnipError::Validation(format!(
                "unknown entity type '{}'. Use page or console.",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageField {
    Title,
    Tags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConsoleField {
    Code,
    Comment,
    Language,
    Tags,
    BeforeText,
    AfterText,
    ShowBeforeText,
    ShowAfterText,
}

/// An editable field on a page or a console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Page(PageField),
    Console(ConsoleField),
}

/// How quickly edits to a field are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceClass {
    /// Free text: titles, code, notes, tag lists.
    Text,
    /// The live-edited console comment.
    Comment,
    /// Discrete choices: language, note visibility. Committed at once.
    Choice,
}

impl Field {
    pub fn entity(&self) -> EntityKind {
        match self {
            Field::Page(_) => EntityKind::Page,
            Field::Console(_) => EntityKind::Console,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Field::Page(PageField::Title) => "title",
            Field::Page(PageField::Tags) => "tags",
            Field::Console(ConsoleField::Code) => "code",
            Field::Console(ConsoleField::Comment) => "comment",
            Field::Console(ConsoleField::Language) => "language",
            Field::Console(ConsoleField::Tags) => "tags",
            Field::Console(ConsoleField::BeforeText) => "before_text",
            Field::Console(ConsoleField::AfterText) => "after_text",
            Field::Console(ConsoleField::ShowBeforeText) => "show_before_text",
            Field::Console(ConsoleField::ShowAfterText) => "show_after_text",
        }
    }

    /// Resolve a field by entity kind and wire name.
    pub fn parse(entity: EntityKind, name: &str) -> Result<Field> {
        let field = match (entity, name) {
            (EntityKind::Page, "title") => Field::Page(PageField::Title),
            (EntityKind::Page, "tags") => Field::Page(PageField::Tags),
            (EntityKind::Console, "code") => Field::Console(ConsoleField::Code),
            (EntityKind::Console, "comment") => Field::Console(ConsoleField::Comment),
            (EntityKind::Console, "language") => Field::Console(ConsoleField::Language),
            (EntityKind::Console, "tags") => Field::Console(ConsoleField::Tags),
            (EntityKind::Console, "before_text") => Field::Console(ConsoleField::BeforeText),
            (EntityKind::Console, "after_text") => Field::Console(ConsoleField::AfterText),
            (EntityKind::Console, "show_before_text") => {
                Field::Console(ConsoleField::ShowBeforeText)
            }
            (EntityKind::Console, "show_after_text") => Field::Console(ConsoleField::ShowAfterText),
            (entity, name) => {
                return Err(SnipError::Validation(format!(
                    "unknown {} field: '{}'",
                    entity, name
                )))
            }
        };
        Ok(field)
    }

    pub fn debounce_class(&self) -> DebounceClass {
        match self {
            Field::Console(ConsoleField::Comment) => DebounceClass::Comment,
            Field::Console(ConsoleField::Language)
            | Field::Console(ConsoleField::ShowBeforeText)
            | Field::Console(ConsoleField::ShowAfterText) => DebounceClass::Choice,
            _ => DebounceClass::Text,
        }
    }

    /// Parse a raw command-line string into the value type this field expects.
    ///
    /// Tag lists are comma-separated; flags accept `true`/`false`.
    pub fn parse_value(&self, raw: &str) -> Result<FieldValue> {
        match self {
            Field::Page(PageField::Tags) | Field::Console(ConsoleField::Tags) => {
                Ok(FieldValue::Tags(normalize_tags(raw.split(','))))
            }
            Field::Console(ConsoleField::Language) => Ok(FieldValue::Language(raw.parse()?)),
            Field::Console(ConsoleField::ShowBeforeText)
            | Field::Console(ConsoleField::ShowAfterText) => match raw.trim() {
                "true" | "on" | "1" => Ok(FieldValue::Flag(true)),
                "false" | "off" | "0" => Ok(FieldValue::Flag(false)),
                other => Err(SnipError::Validation(format!(
                    "{} expects true or false, got '{}'",
                    self.name(),
                    other
                ))),
            },
            _ => Ok(FieldValue::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity(), self.name())
    }
}

/// A value for one editable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Tags(Vec<String>),
    Language(Language),
    Flag(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Tags(tags) => f.write_str(&tags.join(", ")),
            FieldValue::Language(lang) => write!(f, "{}", lang),
            FieldValue::Flag(b) => write!(f, "{}", b),
        }
    }
}

impl Page {
    pub fn field_value(&self, field: PageField) -> FieldValue {
        match field {
            PageField::Title => FieldValue::Text(self.title.clone()),
            PageField::Tags => FieldValue::Tags(self.tags.clone()),
        }
    }

    /// Copy one field from `other`, leaving the rest untouched.
    pub fn copy_field(&mut self, other: &Page, field: PageField) {
        match field {
            PageField::Title => self.title = other.title.clone(),
            PageField::Tags => self.tags = other.tags.clone(),
        }
    }
}

impl Console {
    /// Copy one field from `other`, leaving the rest untouched.
    pub fn copy_field(&mut self, other: &Console, field: ConsoleField) {
        match field {
            ConsoleField::Code => self.code = other.code.clone(),
            ConsoleField::Comment => self.comment = other.comment.clone(),
            ConsoleField::Language => self.language = other.language,
            ConsoleField::Tags => self.tags = other.tags.clone(),
            ConsoleField::BeforeText => self.before_text = other.before_text.clone(),
            ConsoleField::AfterText => self.after_text = other.after_text.clone(),
            ConsoleField::ShowBeforeText => self.show_before_text = other.show_before_text,
            ConsoleField::ShowAfterText => self.show_after_text = other.show_after_text,
        }
    }

    pub fn field_value(&self, field: ConsoleField) -> FieldValue {
        match field {
            ConsoleField::Code => FieldValue::Text(self.code.clone()),
            ConsoleField::Comment => FieldValue::Text(self.comment.clone()),
            ConsoleField::Language => FieldValue::Language(self.language),
            ConsoleField::Tags => FieldValue::Tags(self.tags.clone()),
            ConsoleField::BeforeText => FieldValue::Text(self.before_text.clone()),
            ConsoleField::AfterText => FieldValue::Text(self.after_text.clone()),
            ConsoleField::ShowBeforeText => FieldValue::Flag(self.show_before_text),
            ConsoleField::ShowAfterText => FieldValue::Flag(self.show_after_text),
        }
    }
}

/// A single-field change to a page.
#[derive(Debug, Clone, PartialEq)]
pub enum PagePatch {
    Title(String),
    Tags(Vec<String>),
}

impl PagePatch {
    pub fn field(&self) -> PageField {
        match self {
            PagePatch::Title(_) => PageField::Title,
            PagePatch::Tags(_) => PageField::Tags,
        }
    }

    /// Merge into a full page update; stores only accept complete title+tags.
    pub fn apply_to(&self, update: &mut PageUpdate) {
        match self {
            PagePatch::Title(title) => update.title = title.clone(),
            PagePatch::Tags(tags) => update.tags = tags.clone(),
        }
    }
}

/// A single-field change to a console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsolePatch {
    Code(String),
    Comment(String),
    Language(Language),
    Tags(Vec<String>),
    BeforeText(String),
    AfterText(String),
    ShowBeforeText(bool),
    ShowAfterText(bool),
}

impl ConsolePatch {
    pub fn field(&self) -> ConsoleField {
        match self {
            ConsolePatch::Code(_) => ConsoleField::Code,
            ConsolePatch::Comment(_) => ConsoleField::Comment,
            ConsolePatch::Language(_) => ConsoleField::Language,
            ConsolePatch::Tags(_) => ConsoleField::Tags,
            ConsolePatch::BeforeText(_) => ConsoleField::BeforeText,
            ConsolePatch::AfterText(_) => ConsoleField::AfterText,
            ConsolePatch::ShowBeforeText(_) => ConsoleField::ShowBeforeText,
            ConsolePatch::ShowAfterText(_) => ConsoleField::ShowAfterText,
        }
    }

    pub fn apply(&self, console: &mut Console) {
        match self {
            ConsolePatch::Code(v) => console.code = v.clone(),
            ConsolePatch::Comment(v) => console.comment = v.clone(),
            ConsolePatch::Language(v) => console.language = *v,
            ConsolePatch::Tags(v) => console.tags = v.clone(),
            ConsolePatch::BeforeText(v) => console.before_text = v.clone(),
            ConsolePatch::AfterText(v) => console.after_text = v.clone(),
            ConsolePatch::ShowBeforeText(v) => console.show_before_text = *v,
            ConsolePatch::ShowAfterText(v) => console.show_after_text = *v,
        }
    }
}

/// A validated single-field change, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Page(PagePatch),
    Console(ConsolePatch),
}

impl Patch {
    /// Validate a field/value pair.
    ///
    /// Tag lists are normalized. A blank page title is a validation error.
    pub fn new(field: Field, value: FieldValue) -> Result<Patch> {
        let patch = match (field, value) {
            (Field::Page(PageField::Title), FieldValue::Text(title)) => {
                if title.trim().is_empty() {
                    return Err(SnipError::Validation("page title is empty".to_string()));
                }
                Patch::Page(PagePatch::Title(title))
            }
            (Field::Page(PageField::Tags), FieldValue::Tags(tags)) => {
                Patch::Page(PagePatch::Tags(normalize_tags(tags)))
            }
            (Field::Console(f), value) => Patch::Console(console_patch(f, value)?),
            (field, value) => return Err(mismatch(field, &value)),
        };
        Ok(patch)
    }

    /// The value as it should appear on the read path after normalization.
    pub fn value(&self) -> FieldValue {
        match self {
            Patch::Page(PagePatch::Title(v)) => FieldValue::Text(v.clone()),
            Patch::Page(PagePatch::Tags(v)) => FieldValue::Tags(v.clone()),
            Patch::Console(p) => match p {
                ConsolePatch::Code(v)
                | ConsolePatch::Comment(v)
                | ConsolePatch::BeforeText(v)
                | ConsolePatch::AfterText(v) => FieldValue::Text(v.clone()),
                ConsolePatch::Language(v) => FieldValue::Language(*v),
                ConsolePatch::Tags(v) => FieldValue::Tags(v.clone()),
                ConsolePatch::ShowBeforeText(v) | ConsolePatch::ShowAfterText(v) => {
                    FieldValue::Flag(*v)
                }
            },
        }
    }
}

fn console_patch(field: ConsoleField, value: FieldValue) -> Result<ConsolePatch> {
    let patch = match (field, value) {
        (ConsoleField::Code, FieldValue::Text(v)) => ConsolePatch::Code(v),
        (ConsoleField::Comment, FieldValue::Text(v)) => ConsolePatch::Comment(v),
        (ConsoleField::BeforeText, FieldValue::Text(v)) => ConsolePatch::BeforeText(v),
        (ConsoleField::AfterText, FieldValue::Text(v)) => ConsolePatch::AfterText(v),
        (ConsoleField::Language, FieldValue::Language(v)) => ConsolePatch::Language(v),
        (ConsoleField::Language, FieldValue::Text(v)) => ConsolePatch::Language(v.parse()?),
        (ConsoleField::Tags, FieldValue::Tags(v)) => ConsolePatch::Tags(normalize_tags(v)),
        (ConsoleField::ShowBeforeText, FieldValue::Flag(v)) => ConsolePatch::ShowBeforeText(v),
        (ConsoleField::ShowAfterText, FieldValue::Flag(v)) => ConsolePatch::ShowAfterText(v),
        (field, value) => return Err(mismatch(Field::Console(field), &value)),
    };
    Ok(patch)
}

fn mismatch(field: Field, value: &FieldValue) -> SnipError {
    let kind = match value {
        FieldValue::Text(_) => "text",
        FieldValue::Tags(_) => "a tag list",
        FieldValue::Language(_) => "a language",
        FieldValue::Flag(_) => "a flag",
    };
    SnipError::Validation(format!("{} does not accept {}", field, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_fields() {
        assert_eq!(
            Field::parse(EntityKind::Console, "before_text").unwrap(),
            Field::Console(ConsoleField::BeforeText)
        );
        assert_eq!(
            Field::parse(EntityKind::Page, "title").unwrap(),
            Field::Page(PageField::Title)
        );
    }

    #[test]
    fn test_parse_rejects_fields_of_other_entity() {
        assert!(Field::parse(EntityKind::Page, "code").is_err());
        assert!(Field::parse(EntityKind::Console, "title").is_err());
        assert!(Field::parse(EntityKind::Console, "id").is_err());
    }

    #[test]
    fn test_debounce_classes() {
        assert_eq!(
            Field::Console(ConsoleField::Comment).debounce_class(),
            DebounceClass::Comment
        );
        assert_eq!(
            Field::Console(ConsoleField::Language).debounce_class(),
            DebounceClass::Choice
        );
        assert_eq!(
            Field::Console(ConsoleField::ShowAfterText).debounce_class(),
            DebounceClass::Choice
        );
        assert_eq!(
            Field::Page(PageField::Title).debounce_class(),
            DebounceClass::Text
        );
        assert_eq!(
            Field::Console(ConsoleField::Code).debounce_class(),
            DebounceClass::Text
        );
    }

    #[test]
    fn test_patch_rejects_mismatched_value() {
        let err = Patch::new(
            Field::Console(ConsoleField::Code),
            FieldValue::Flag(true),
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_patch_rejects_blank_title() {
        let err = Patch::new(
            Field::Page(PageField::Title),
            FieldValue::Text("   ".to_string()),
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_patch_normalizes_tags() {
        let patch = Patch::new(
            Field::Console(ConsoleField::Tags),
            FieldValue::Tags(vec![" a ".into(), "".into(), "a".into(), "b".into()]),
        )
        .unwrap();
        assert_eq!(patch.value(), FieldValue::Tags(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_language_accepts_text() {
        let patch = Patch::new(
            Field::Console(ConsoleField::Language),
            FieldValue::Text("python".to_string()),
        )
        .unwrap();
        assert_eq!(patch, Patch::Console(ConsolePatch::Language(Language::Python)));
    }

    #[test]
    fn test_parse_value_flags_and_tags() {
        let flag = Field::Console(ConsoleField::ShowBeforeText);
        assert_eq!(flag.parse_value("on").unwrap(), FieldValue::Flag(true));
        assert!(flag.parse_value("maybe").is_err());

        let tags = Field::Page(PageField::Tags);
        assert_eq!(
            tags.parse_value("rust, cli,,rust").unwrap(),
            FieldValue::Tags(vec!["rust".into(), "cli".into()])
        );
    }

    #[test]
    fn test_console_patch_apply() {
        let mut console = crate::models::NewConsole::for_page("p").into_console("c".into());
        ConsolePatch::ShowAfterText(true).apply(&mut console);
        ConsolePatch::Code("fn main() {}".into()).apply(&mut console);
        assert!(console.show_after_text);
        assert_eq!(console.code, "fn main() {}");
    }

    #[test]
    fn test_copy_field_touches_only_that_field() {
        let mut ours = crate::models::NewConsole::for_page("p").into_console("c".into());
        ours.comment = "local".into();
        let mut theirs = ours.clone();
        theirs.code = "print(1)".into();
        theirs.comment = "stale".into();

        ours.copy_field(&theirs, ConsoleField::Code);
        assert_eq!(ours.code, "print(1)");
        assert_eq!(ours.comment, "local");
    }
}
