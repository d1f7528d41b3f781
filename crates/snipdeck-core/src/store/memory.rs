//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Pages live in a `Vec` behind `std::sync::RwLock`, newest first.

use std::sync::{PoisonError, RwLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::fields::ConsolePatch;
use crate::models::{new_id, now_millis, Console, NewConsole, NewPage, Page, PageUpdate};
use crate::tags::normalize_tags;

use super::Store;

/// In-memory store. Nothing is persisted.
pub struct InMemoryStore {
    pages: RwLock<Vec<Page>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            pages: RwLock::new(Vec::new()),
        }
    }

    /// Start with an existing collection (newest first).
    pub fn with_pages(pages: Vec<Page>) -> Self {
        Self {
            pages: RwLock::new(pages),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list_pages(&self) -> Result<Vec<Page>> {
        let pages = self.pages.read().unwrap_or_else(PoisonError::into_inner);
        Ok(pages.clone())
    }

    async fn create_page(&self, page: &NewPage) -> Result<Page> {
        let now = now_millis();
        let created = Page {
            id: new_id(),
            title: page.title.clone(),
            tags: normalize_tags(&page.tags),
            consoles: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        pages.insert(0, created.clone());
        Ok(created)
    }

    async fn update_page(&self, id: &str, update: &PageUpdate) -> Result<Page> {
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        let page = pages
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow!("page not found: {}", id))?;
        page.title = update.title.clone();
        page.tags = normalize_tags(&update.tags);
        page.updated_at = now_millis();
        Ok(page.clone())
    }

    async fn delete_page(&self, id: &str) -> Result<()> {
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        let before = pages.len();
        pages.retain(|p| p.id != id);
        if pages.len() == before {
            return Err(anyhow!("page not found: {}", id));
        }
        Ok(())
    }

    async fn create_console(&self, console: &NewConsole) -> Result<Console> {
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        let page = pages
            .iter_mut()
            .find(|p| p.id == console.page_id)
            .ok_or_else(|| anyhow!("page not found: {}", console.page_id))?;
        let mut request = console.clone();
        request.tags = normalize_tags(&request.tags);
        let created = request.into_console(new_id());
        page.consoles.push(created.clone());
        page.updated_at = now_millis();
        Ok(created)
    }

    async fn update_console(&self, id: &str, patch: &ConsolePatch) -> Result<Console> {
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        let console = pages
            .iter_mut()
            .flat_map(|p| p.consoles.iter_mut())
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow!("console not found: {}", id))?;
        match patch {
            ConsolePatch::Tags(tags) => console.tags = normalize_tags(tags),
            other => other.apply(console),
        }
        Ok(console.clone())
    }

    async fn delete_console(&self, id: &str) -> Result<()> {
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        for page in pages.iter_mut() {
            if let Some(pos) = page.consoles.iter().position(|c| c.id == id) {
                page.consoles.remove(pos);
                return Ok(());
            }
        }
        Err(anyhow!("console not found: {}", id))
    }
}
