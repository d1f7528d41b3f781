//! Storage abstraction for Snipdeck.
//!
//! The [`Store`] trait is the persistence collaborator behind every page
//! and console operation. Backends may be local (a JSON document, an
//! in-memory map) or relational (SQLite); the domain logic does not care.
//!
//! Implementations must be `Send + Sync` so commits can run on spawned
//! tasks.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::fields::ConsolePatch;
use crate::models::{Console, NewConsole, NewPage, Page, PageUpdate};
use crate::tags::compute_available_tags;

/// Abstract storage backend for pages and consoles.
///
/// Every method may fail; callers decide how to surface the failure.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_pages`](Store::list_pages) | All pages with nested consoles, newest first |
/// | [`create_page`](Store::create_page) | Insert a page with no consoles |
/// | [`update_page`](Store::update_page) | Replace a page's title and tags |
/// | [`delete_page`](Store::delete_page) | Delete a page and its consoles |
/// | [`create_console`](Store::create_console) | Append a console to a page |
/// | [`update_console`](Store::update_console) | Apply a single-field patch |
/// | [`delete_console`](Store::delete_console) | Delete one console |
/// | [`list_tags`](Store::list_tags) | Sorted union of all tags |
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_pages(&self) -> Result<Vec<Page>>;

    /// Insert a page. The store assigns the id and timestamps.
    async fn create_page(&self, page: &NewPage) -> Result<Page>;

    /// Replace title and tags. Returns the page with its consoles.
    async fn update_page(&self, id: &str, update: &PageUpdate) -> Result<Page>;

    async fn delete_page(&self, id: &str) -> Result<()>;

    /// Append a console to `console.page_id`.
    async fn create_console(&self, console: &NewConsole) -> Result<Console>;

    async fn update_console(&self, id: &str, patch: &ConsolePatch) -> Result<Console>;

    async fn delete_console(&self, id: &str) -> Result<()>;

    /// Sorted union of all page and console tags.
    async fn list_tags(&self) -> Result<Vec<String>> {
        let pages = self.list_pages().await?;
        Ok(compute_available_tags(&pages))
    }
}
