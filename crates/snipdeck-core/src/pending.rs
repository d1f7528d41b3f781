//! Buffer of local edits that have not been confirmed by the store yet.
//!
//! Each entry is keyed by entity id and [`Field`]. A buffered value shadows
//! the canonical value on the read path until the entry is cleared, which
//! happens after a successful commit. Failed commits leave the entry in
//! place, so the user keeps seeing what they typed.

use std::collections::HashMap;
use std::fmt;

use crate::fields::{EntityKind, Field, FieldValue, PageField, Patch};
use crate::models::{Console, Page};

/// Identifies one field of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteKey {
    pub id: String,
    pub field: Field,
}

impl WriteKey {
    pub fn new(id: impl Into<String>, field: Field) -> Self {
        Self {
            id: id.into(),
            field,
        }
    }

    pub fn entity(&self) -> EntityKind {
        self.field.entity()
    }
}

impl fmt::Display for WriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.entity(), self.id, self.field.name())
    }
}

#[derive(Debug, Clone)]
struct Buffered {
    value: FieldValue,
    generation: u64,
}

/// Outstanding local edits.
#[derive(Debug, Default)]
pub struct PendingWrites {
    entries: HashMap<WriteKey, Buffered>,
    next_generation: u64,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` for `key`, replacing any earlier value.
    ///
    /// Returns the generation stamped on this write, for use with
    /// [`clear_if_current`](Self::clear_if_current).
    pub fn buffer_write(&mut self, key: WriteKey, value: FieldValue) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.entries.insert(key, Buffered { value, generation });
        generation
    }

    pub fn get(&self, key: &WriteKey) -> Option<&FieldValue> {
        self.entries.get(key).map(|b| &b.value)
    }

    /// The buffered value for `key`, or `fallback` if nothing is buffered.
    pub fn read_value(&self, key: &WriteKey, fallback: FieldValue) -> FieldValue {
        self.get(key).cloned().unwrap_or(fallback)
    }

    pub fn clear_write(&mut self, key: &WriteKey) -> Option<FieldValue> {
        self.entries.remove(key).map(|b| b.value)
    }

    /// Clear `key` only if no write newer than `generation` was buffered.
    ///
    /// Returns `true` if the entry was removed.
    pub fn clear_if_current(&mut self, key: &WriteKey, generation: u64) -> bool {
        match self.entries.get(key) {
            Some(b) if b.generation == generation => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self, key: &WriteKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffered keys in a stable order.
    pub fn keys(&self) -> Vec<WriteKey> {
        let mut keys: Vec<WriteKey> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drop every buffered edit that belongs to `id`.
    pub fn forget_entity(&mut self, id: &str) {
        self.entries.retain(|k, _| k.id != id);
    }

    /// Copy of `pages` with every buffered value applied on top.
    pub fn overlay(&self, pages: &[Page]) -> Vec<Page> {
        let mut out = pages.to_vec();
        if self.entries.is_empty() {
            return out;
        }
        for page in &mut out {
            for (key, buffered) in &self.entries {
                if key.id == page.id {
                    apply_to_page(page, key.field, &buffered.value);
                }
            }
            for console in &mut page.consoles {
                for (key, buffered) in &self.entries {
                    if key.id == console.id {
                        apply_to_console(console, key.field, &buffered.value);
                    }
                }
            }
        }
        out
    }
}

fn apply_to_page(page: &mut Page, field: Field, value: &FieldValue) {
    match (field, value) {
        (Field::Page(PageField::Title), FieldValue::Text(v)) => page.title = v.clone(),
        (Field::Page(PageField::Tags), FieldValue::Tags(v)) => page.tags = v.clone(),
        _ => {}
    }
}

fn apply_to_console(console: &mut Console, field: Field, value: &FieldValue) {
    if let Ok(Patch::Console(patch)) = Patch::new(field, value.clone()) {
        patch.apply(console);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ConsoleField;
    use crate::models::NewConsole;

    fn code_key(id: &str) -> WriteKey {
        WriteKey::new(id, Field::Console(ConsoleField::Code))
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_buffered_value_shadows_fallback() {
        let mut pending = PendingWrites::new();
        let key = code_key("c1");
        assert_eq!(pending.read_value(&key, text("server")), text("server"));

        pending.buffer_write(key.clone(), text("local"));
        assert_eq!(pending.read_value(&key, text("server")), text("local"));
        assert_eq!(pending.read_value(&key, text("anything")), text("local"));

        pending.clear_write(&key);
        assert_eq!(pending.read_value(&key, text("server")), text("server"));
    }

    #[test]
    fn test_fields_are_independent() {
        let mut pending = PendingWrites::new();
        let code = code_key("c1");
        let comment = WriteKey::new("c1", Field::Console(ConsoleField::Comment));
        pending.buffer_write(code.clone(), text("x"));
        pending.buffer_write(comment.clone(), text("y"));
        assert_eq!(pending.len(), 2);

        pending.clear_write(&code);
        assert!(!pending.is_pending(&code));
        assert_eq!(pending.get(&comment), Some(&text("y")));
    }

    #[test]
    fn test_clear_if_current_keeps_newer_write() {
        let mut pending = PendingWrites::new();
        let key = code_key("c1");
        let first = pending.buffer_write(key.clone(), text("a"));
        let second = pending.buffer_write(key.clone(), text("b"));
        assert!(second > first);

        assert!(!pending.clear_if_current(&key, first));
        assert_eq!(pending.get(&key), Some(&text("b")));

        assert!(pending.clear_if_current(&key, second));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_key_display() {
        let key = WriteKey::new("abc", Field::Page(PageField::Title));
        assert_eq!(key.to_string(), "page-abc-title");
    }

    #[test]
    fn test_forget_entity() {
        let mut pending = PendingWrites::new();
        pending.buffer_write(code_key("c1"), text("a"));
        pending.buffer_write(code_key("c2"), text("b"));
        pending.forget_entity("c1");
        assert_eq!(pending.keys(), vec![code_key("c2")]);
    }

    #[test]
    fn test_overlay_applies_buffered_values() {
        let console = NewConsole::for_page("p1").into_console("c1".to_string());
        let page = Page {
            id: "p1".to_string(),
            title: "Old".to_string(),
            tags: vec![],
            consoles: vec![console],
            created_at: 0,
            updated_at: 0,
        };
        let mut pending = PendingWrites::new();
        pending.buffer_write(WriteKey::new("p1", Field::Page(PageField::Title)), text("New"));
        pending.buffer_write(code_key("c1"), text("let x = 1;"));

        let view = pending.overlay(&[page.clone()]);
        assert_eq!(view[0].title, "New");
        assert_eq!(view[0].consoles[0].code, "let x = 1;");
        // Input is untouched.
        assert_eq!(page.title, "Old");
    }
}
