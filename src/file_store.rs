//! JSON-document [`Store`] implementation.
//!
//! The whole collection is kept in memory and written back to a single file
//! after every mutation:
//!
//! ```json
//! { "version": 1, "pages": [ { "id": "...", "title": "...", "consoles": [ ... ] } ] }
//! ```
//!
//! Writes go to a sibling temp file that is then renamed over the document,
//! so a crash mid-write leaves the previous version intact.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use snipdeck_core::fields::ConsolePatch;
use snipdeck_core::models::{new_id, now_millis, Console, NewConsole, NewPage, Page, PageUpdate};
use snipdeck_core::store::Store;
use snipdeck_core::tags::normalize_tags;

const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct Document {
    version: u32,
    #[serde(default)]
    pages: Vec<Page>,
}

/// Single-file JSON implementation of the [`Store`] trait.
pub struct FileStore {
    path: PathBuf,
    pages: Mutex<Vec<Page>>,
}

impl FileStore {
    /// Open the document at `path`. A missing file is an empty collection.
    pub async fn open(path: &Path) -> Result<Self> {
        let pages = match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let doc: Document = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))?;
                if doc.version > DOCUMENT_VERSION {
                    anyhow::bail!(
                        "{} has document version {}, newest supported is {}",
                        path.display(),
                        doc.version,
                        DOCUMENT_VERSION
                    );
                }
                doc.pages
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        debug!(path = %path.display(), pages = pages.len(), "file store opened");
        Ok(Self {
            path: path.to_path_buf(),
            pages: Mutex::new(pages),
        })
    }

    /// Write the current collection to disk, creating the file if needed.
    pub async fn save(&self) -> Result<()> {
        let pages = self.pages.lock().await;
        self.write(&pages).await
    }

    async fn write(&self, pages: &[Page]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let doc = DocumentRef {
            version: DOCUMENT_VERSION,
            pages,
        };
        let json = serde_json::to_vec_pretty(&doc)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    pages: &'a [Page],
}

#[async_trait]
impl Store for FileStore {
    async fn list_pages(&self) -> Result<Vec<Page>> {
        Ok(self.pages.lock().await.clone())
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
        let mut pages = self.pages.lock().await;
        let mut next = pages.clone();
        next.insert(0, created.clone());
        self.write(&next).await?;
        *pages = next;
        Ok(created)
    }

    async fn update_page(&self, id: &str, update: &PageUpdate) -> Result<Page> {
        let mut pages = self.pages.lock().await;
        let mut next = pages.clone();
        let page = next
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow!("page not found: {}", id))?;
        page.title = update.title.clone();
        page.tags = normalize_tags(&update.tags);
        page.updated_at = now_millis();
        let updated = page.clone();
        self.write(&next).await?;
        *pages = next;
        Ok(updated)
    }

    async fn delete_page(&self, id: &str) -> Result<()> {
        let mut pages = self.pages.lock().await;
        let mut next = pages.clone();
        next.retain(|p| p.id != id);
        if next.len() == pages.len() {
            return Err(anyhow!("page not found: {}", id));
        }
        self.write(&next).await?;
        *pages = next;
        Ok(())
    }

    async fn create_console(&self, console: &NewConsole) -> Result<Console> {
        let mut pages = self.pages.lock().await;
        let mut next = pages.clone();
        let page = next
            .iter_mut()
            .find(|p| p.id == console.page_id)
            .ok_or_else(|| anyhow!("page not found: {}", console.page_id))?;
        let mut request = console.clone();
        request.tags = normalize_tags(&request.tags);
        let created = request.into_console(new_id());
        page.consoles.push(created.clone());
        page.updated_at = now_millis();
        self.write(&next).await?;
        *pages = next;
        Ok(created)
    }

    async fn update_console(&self, id: &str, patch: &ConsolePatch) -> Result<Console> {
        let mut pages = self.pages.lock().await;
        let mut next = pages.clone();
        let console = next
            .iter_mut()
            .flat_map(|p| p.consoles.iter_mut())
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow!("console not found: {}", id))?;
        patch.apply(console);
        if let ConsolePatch::Tags(tags) = patch {
            console.tags = normalize_tags(tags);
        }
        let updated = console.clone();
        self.write(&next).await?;
        *pages = next;
        Ok(updated)
    }

    async fn delete_console(&self, id: &str) -> Result<()> {
        let mut pages = self.pages.lock().await;
        let mut next = pages.clone();
        let page = next
            .iter_mut()
            .find(|p| p.consoles.iter().any(|c| c.id == id))
            .ok_or_else(|| anyhow!("console not found: {}", id))?;
        page.consoles.retain(|c| c.id != id);
        self.write(&next).await?;
        *pages = next;
        Ok(())
    }
}
