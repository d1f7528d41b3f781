//! The editing controller.
//!
//! A [`Workspace`] owns everything that changes while a user edits: the page
//! snapshot, the pending-write buffer, the debounce timers and the list of
//! notices raised by failed commits. It is opened once against a [`Store`]
//! and torn down with [`Workspace::shutdown`], which commits anything still
//! waiting on a timer.
//!
//! # Write path
//!
//! ```text
//! edit(key, value)
//!   -> validate into a Patch
//!   -> buffer the value (visible to view()/read_field() at once)
//!   -> schedule a commit after the field's debounce delay
//!        -> Store::update_page / Store::update_console
//!        -> ok:  adopt the committed field from the returned entity, clear
//!                the buffer entry if no newer edit arrived meanwhile
//!        -> err: keep the buffer entry, record a Notice
//! ```
//!
//! A page commit sends title and tags together, so commits to one page run
//! one at a time under a per-page lock and each builds its update from the
//! state the previous one left behind.
//!
//! Structural changes (create/delete of pages and consoles) go straight to
//! the store and are adopted into the snapshot when they return.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, info, warn};

use snipdeck_core::fields::{
    ConsoleField, EntityKind, Field, FieldValue, PageField, PagePatch, Patch,
};
use snipdeck_core::models::{Console, NewConsole, NewPage, Page, PageUpdate};
use snipdeck_core::pending::{PendingWrites, WriteKey};
use snipdeck_core::search::{search, SearchResultPage};
use snipdeck_core::store::Store;
use snipdeck_core::tags::{add_tag, compute_available_tags, remove_tag};
use snipdeck_core::{Result, SnipError};

use crate::sync::{DebounceDelays, SyncScheduler};

/// Whether the initial page load succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Ready,
    /// The last load failed; nothing can be edited until a reload succeeds.
    Failed(String),
}

/// A non-fatal problem reported to the user, typically a failed commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub action: String,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.action, self.message)
    }
}

/// One of the two collapsible note sections around a console's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Before,
    After,
}

impl Section {
    fn field(self) -> ConsoleField {
        match self {
            Section::Before => ConsoleField::ShowBeforeText,
            Section::After => ConsoleField::ShowAfterText,
        }
    }
}

struct Snapshot {
    pages: Arc<Vec<Page>>,
    tags: Arc<Vec<String>>,
    status: LoadStatus,
}

struct Inner {
    store: Arc<dyn Store>,
    delays: DebounceDelays,
    snapshot: RwLock<Snapshot>,
    pending: Mutex<PendingWrites>,
    notices: Mutex<Vec<Notice>>,
    scheduler: SyncScheduler,
    page_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Inner {
    fn snapshot(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, PendingWrites> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the page list wholesale and recompute the tag set.
    fn replace_pages(&self, f: impl FnOnce(&mut Vec<Page>)) {
        let mut snap = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        let mut pages = snap.pages.as_ref().clone();
        f(&mut pages);
        snap.tags = Arc::new(compute_available_tags(&pages));
        snap.pages = Arc::new(pages);
    }

    /// Take only `field` from a store reply; other fields may have moved on.
    fn adopt_page(&self, updated: &Page, field: PageField) {
        self.replace_pages(|pages| {
            if let Some(page) = pages.iter_mut().find(|p| p.id == updated.id) {
                page.copy_field(updated, field);
                page.updated_at = updated.updated_at;
            }
        });
    }

    fn adopt_console(&self, updated: &Console, field: ConsoleField) {
        self.replace_pages(|pages| {
            if let Some(console) = pages
                .iter_mut()
                .flat_map(|p| p.consoles.iter_mut())
                .find(|c| c.id == updated.id)
            {
                console.copy_field(updated, field);
            }
        });
    }

    fn page_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.page_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    fn release_page_lock(&self, id: &str) {
        let mut locks = self.page_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(id);
        }
    }

    /// `None` when the page left the snapshot before the lock was acquired.
    async fn commit_page(&self, key: &WriteKey, patch: &PagePatch) -> Option<anyhow::Result<()>> {
        let lock = self.page_lock(&key.id);
        let result = {
            let _serial = lock.lock().await;
            match self.find_page(&key.id) {
                None => None,
                Some(page) => {
                    let mut update = PageUpdate::from_page(&page);
                    patch.apply_to(&mut update);
                    Some(
                        self.store
                            .update_page(&key.id, &update)
                            .await
                            .map(|page| self.adopt_page(&page, patch.field())),
                    )
                }
            }
        };
        drop(lock);
        self.release_page_lock(&key.id);
        result
    }

    fn find_page(&self, id: &str) -> Option<Page> {
        self.snapshot().pages.iter().find(|p| p.id == id).cloned()
    }

    fn find_console(&self, id: &str) -> Option<Console> {
        self.snapshot()
            .pages
            .iter()
            .flat_map(|p| p.consoles.iter())
            .find(|c| c.id == id)
            .cloned()
    }

    fn notify(&self, action: impl Into<String>, err: &anyhow::Error) {
        let notice = Notice {
            action: action.into(),
            message: format!("{:#}", err),
        };
        warn!(action = %notice.action, error = %notice.message, "store call failed");
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }

    /// Record a failed store call and turn it into a persistence error.
    fn persistence(&self, action: &str, err: anyhow::Error) -> SnipError {
        self.notify(action, &err);
        SnipError::Persistence(err)
    }

    async fn commit(self: Arc<Self>, key: WriteKey, patch: Patch, generation: u64) {
        debug!(key = %key, "committing");
        let result = match &patch {
            Patch::Page(page_patch) => {
                let Some(result) = self.commit_page(&key, page_patch).await else {
                    debug!(key = %key, "page gone before commit");
                    self.pending().clear_if_current(&key, generation);
                    return;
                };
                result
            }
            Patch::Console(console_patch) => {
                if self.find_console(&key.id).is_none() {
                    debug!(key = %key, "console gone before commit");
                    self.pending().clear_if_current(&key, generation);
                    return;
                }
                self.store
                    .update_console(&key.id, console_patch)
                    .await
                    .map(|console| self.adopt_console(&console, console_patch.field()))
            }
        };

        match result {
            Ok(()) => {
                let cleared = self.pending().clear_if_current(&key, generation);
                info!(key = %key, cleared, "commit succeeded");
            }
            Err(err) => self.notify(format!("save {}", key), &err),
        }
    }
}

/// Editing session over one store.
#[derive(Clone)]
pub struct Workspace {
    inner: Arc<Inner>,
}

impl Workspace {
    /// Open a workspace and load every page.
    ///
    /// A failed load does not return an error; the workspace opens in
    /// [`LoadStatus::Failed`] and every operation reports
    /// [`SnipError::Load`] until [`reload`](Self::reload) succeeds.
    pub async fn open(store: Arc<dyn Store>, delays: DebounceDelays) -> Self {
        let workspace = Self {
            inner: Arc::new(Inner {
                store,
                delays,
                snapshot: RwLock::new(Snapshot {
                    pages: Arc::new(Vec::new()),
                    tags: Arc::new(Vec::new()),
                    status: LoadStatus::Failed("not loaded".to_string()),
                }),
                pending: Mutex::new(PendingWrites::new()),
                notices: Mutex::new(Vec::new()),
                scheduler: SyncScheduler::new(),
                page_locks: Mutex::new(HashMap::new()),
            }),
        };
        if let Err(e) = workspace.reload().await {
            warn!(error = %e, "initial load failed");
        }
        workspace
    }

    /// Fetch every page from the store again.
    pub async fn reload(&self) -> Result<()> {
        match self.inner.store.list_pages().await {
            Ok(pages) => {
                info!(pages = pages.len(), "pages loaded");
                let mut snap = self
                    .inner
                    .snapshot
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                snap.tags = Arc::new(compute_available_tags(&pages));
                snap.pages = Arc::new(pages);
                snap.status = LoadStatus::Ready;
                Ok(())
            }
            Err(err) => {
                let mut snap = self
                    .inner
                    .snapshot
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                snap.status = LoadStatus::Failed(format!("{:#}", err));
                Err(SnipError::Load(err))
            }
        }
    }

    pub fn status(&self) -> LoadStatus {
        self.inner.snapshot().status.clone()
    }

    /// Fail with [`SnipError::Load`] unless the last load succeeded.
    pub fn ensure_ready(&self) -> Result<()> {
        match &self.inner.snapshot().status {
            LoadStatus::Ready => Ok(()),
            LoadStatus::Failed(msg) => Err(SnipError::Load(anyhow::anyhow!("{}", msg))),
        }
    }

    /// Canonical pages as last confirmed by the store.
    pub fn pages(&self) -> Arc<Vec<Page>> {
        Arc::clone(&self.inner.snapshot().pages)
    }

    pub fn page(&self, id: &str) -> Option<Page> {
        self.inner.find_page(id)
    }

    /// Sorted union of every page and console tag.
    pub fn available_tags(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.inner.snapshot().tags)
    }

    /// Pages as the user sees them: canonical state with buffered edits on top.
    pub fn view(&self) -> Vec<Page> {
        let pages = self.pages();
        self.inner.pending().overlay(&pages)
    }

    pub fn search(&self, query: &str, selected_tags: &BTreeSet<String>) -> Vec<SearchResultPage> {
        search(&self.view(), query, selected_tags)
    }

    /// Current value of one field, buffered edit first.
    pub fn read_field(&self, key: &WriteKey) -> Result<FieldValue> {
        let canonical = match key.field {
            Field::Page(field) => self
                .inner
                .find_page(&key.id)
                .map(|p| p.field_value(field)),
            Field::Console(field) => self
                .inner
                .find_console(&key.id)
                .map(|c| c.field_value(field)),
        }
        .ok_or_else(|| SnipError::not_found(key.entity(), key.id.clone()))?;
        Ok(self.inner.pending().read_value(key, canonical))
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending().len()
    }

    pub fn is_pending(&self, key: &WriteKey) -> bool {
        self.inner.pending().is_pending(key)
    }

    /// Take every notice raised since the last call.
    pub fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(
            &mut *self
                .inner
                .notices
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    pub async fn create_page(&self, page: NewPage) -> Result<Page> {
        self.ensure_ready()?;
        let created = self
            .inner
            .store
            .create_page(&page)
            .await
            .map_err(|e| self.inner.persistence("create page", e))?;
        self.inner.replace_pages(|pages| pages.insert(0, created.clone()));
        info!(page = %created.id, "page created");
        Ok(created)
    }

    pub async fn delete_page(&self, id: &str) -> Result<()> {
        self.ensure_ready()?;
        let page = self
            .inner
            .find_page(id)
            .ok_or_else(|| SnipError::not_found(EntityKind::Page, id))?;
        self.inner
            .store
            .delete_page(id)
            .await
            .map_err(|e| self.inner.persistence("delete page", e))?;
        self.inner.replace_pages(|pages| pages.retain(|p| p.id != id));
        let mut pending = self.inner.pending();
        pending.forget_entity(id);
        for console in &page.consoles {
            pending.forget_entity(&console.id);
        }
        info!(page = %id, "page deleted");
        Ok(())
    }

    pub async fn create_console(&self, console: NewConsole) -> Result<Console> {
        self.ensure_ready()?;
        if self.inner.find_page(&console.page_id).is_none() {
            return Err(SnipError::not_found(EntityKind::Page, console.page_id));
        }
        let created = self
            .inner
            .store
            .create_console(&console)
            .await
            .map_err(|e| self.inner.persistence("add console", e))?;
        self.inner.replace_pages(|pages| {
            if let Some(page) = pages.iter_mut().find(|p| p.id == console.page_id) {
                page.consoles.push(created.clone());
            }
        });
        info!(page = %console.page_id, console = %created.id, "console created");
        Ok(created)
    }

    pub async fn delete_console(&self, id: &str) -> Result<()> {
        self.ensure_ready()?;
        if self.inner.find_console(id).is_none() {
            return Err(SnipError::not_found(EntityKind::Console, id));
        }
        self.inner
            .store
            .delete_console(id)
            .await
            .map_err(|e| self.inner.persistence("delete console", e))?;
        self.inner.replace_pages(|pages| {
            for page in pages.iter_mut() {
                page.consoles.retain(|c| c.id != id);
            }
        });
        self.inner.pending().forget_entity(id);
        info!(console = %id, "console deleted");
        Ok(())
    }

    /// Buffer a field edit and schedule its commit.
    ///
    /// A blank page title is dropped without error.
    pub async fn edit(&self, key: WriteKey, value: FieldValue) -> Result<()> {
        let delay = self.inner.delays.for_field(key.field);
        self.edit_with_delay(key, value, delay)
    }

    fn edit_with_delay(
        &self,
        key: WriteKey,
        value: FieldValue,
        delay: std::time::Duration,
    ) -> Result<()> {
        self.ensure_ready()?;
        // Existence check before validation so a bad id is reported as such.
        self.read_field(&key)?;

        let patch = match Patch::new(key.field, value) {
            Ok(patch) => patch,
            Err(e) if e.is_validation() && key.field == Field::Page(PageField::Title) => {
                debug!(key = %key, "ignoring blank title");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let generation = self.inner.pending().buffer_write(key.clone(), patch.value());
        debug!(key = %key, ?delay, generation, "commit scheduled");

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        self.inner.scheduler.schedule(key, delay, move || {
            inner.commit(task_key, patch, generation)
        });
        Ok(())
    }

    /// Add a tag to a page or console. Blank and duplicate tags are ignored.
    ///
    /// Tag changes are discrete, so they commit without a debounce delay.
    pub async fn add_tag(&self, entity: EntityKind, id: &str, raw: &str) -> Result<()> {
        let key = tags_key(entity, id);
        let current = tags_of(self.read_field(&key)?);
        let updated = match add_tag(&current, raw) {
            Ok(tags) => tags,
            Err(e) if e.is_validation() => {
                debug!(key = %key, "ignoring blank tag");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if updated == current {
            return Ok(());
        }
        self.edit_with_delay(key, FieldValue::Tags(updated), std::time::Duration::ZERO)
    }

    pub async fn remove_tag(&self, entity: EntityKind, id: &str, tag: &str) -> Result<()> {
        let key = tags_key(entity, id);
        let current = tags_of(self.read_field(&key)?);
        let updated = remove_tag(&current, tag);
        if updated == current {
            return Ok(());
        }
        self.edit_with_delay(key, FieldValue::Tags(updated), std::time::Duration::ZERO)
    }

    /// Show or hide a console's before/after notes.
    pub async fn toggle_section(&self, console_id: &str, section: Section) -> Result<bool> {
        let key = WriteKey::new(console_id, Field::Console(section.field()));
        let shown = matches!(self.read_field(&key)?, FieldValue::Flag(true));
        self.edit(key, FieldValue::Flag(!shown)).await?;
        Ok(!shown)
    }

    /// Commit everything waiting on a timer and wait for in-flight commits.
    pub async fn flush(&self) {
        self.inner.scheduler.flush().await;
    }

    /// Flush and report how many edits could not be saved.
    pub async fn shutdown(self) -> usize {
        self.flush().await;
        let unsaved = self.pending_count();
        if unsaved > 0 {
            warn!(unsaved, "shutting down with unsaved edits");
        }
        unsaved
    }
}

fn tags_key(entity: EntityKind, id: &str) -> WriteKey {
    let field = match entity {
        EntityKind::Page => Field::Page(PageField::Tags),
        EntityKind::Console => Field::Console(ConsoleField::Tags),
    };
    WriteKey::new(id, field)
}

fn tags_of(value: FieldValue) -> Vec<String> {
    match value {
        FieldValue::Tags(tags) => tags,
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use snipdeck_core::fields::ConsolePatch;
    use snipdeck_core::store::memory::InMemoryStore;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Wraps an in-memory store, records updates and can be told to fail or stall.
    #[derive(Default)]
    struct TestStore {
        inner: InMemoryStore,
        console_updates: Mutex<Vec<ConsolePatch>>,
        page_updates: Mutex<Vec<PageUpdate>>,
        fail: AtomicBool,
        /// Delay before a console update is applied.
        latency: Mutex<Duration>,
        /// Delay before a page update is applied.
        page_latency: Mutex<Duration>,
        /// Per-call delays between applying a console update and replying.
        reply_delays: Mutex<VecDeque<Duration>>,
    }

    impl TestStore {
        fn check(&self) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("backend unavailable");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Store for TestStore {
        async fn list_pages(&self) -> anyhow::Result<Vec<Page>> {
            self.check()?;
            self.inner.list_pages().await
        }
        async fn create_page(&self, page: &NewPage) -> anyhow::Result<Page> {
            self.check()?;
            self.inner.create_page(page).await
        }
        async fn update_page(&self, id: &str, update: &PageUpdate) -> anyhow::Result<Page> {
            self.page_updates.lock().unwrap().push(update.clone());
            let latency = *self.page_latency.lock().unwrap();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            self.check()?;
            self.inner.update_page(id, update).await
        }
        async fn delete_page(&self, id: &str) -> anyhow::Result<()> {
            self.check()?;
            self.inner.delete_page(id).await
        }
        async fn create_console(&self, console: &NewConsole) -> anyhow::Result<Console> {
            self.check()?;
            self.inner.create_console(console).await
        }
        async fn update_console(
            &self,
            id: &str,
            patch: &ConsolePatch,
        ) -> anyhow::Result<Console> {
            self.console_updates.lock().unwrap().push(patch.clone());
            let latency = *self.latency.lock().unwrap();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            self.check()?;
            let updated = self.inner.update_console(id, patch).await?;
            let reply = self.reply_delays.lock().unwrap().pop_front();
            if let Some(delay) = reply {
                tokio::time::sleep(delay).await;
            }
            Ok(updated)
        }
        async fn delete_console(&self, id: &str) -> anyhow::Result<()> {
            self.check()?;
            self.inner.delete_console(id).await
        }
    }

    async fn setup() -> (Arc<TestStore>, Workspace, Page, Console) {
        let store = Arc::new(TestStore::default());
        let ws = Workspace::open(store.clone(), DebounceDelays::default()).await;
        let page = ws
            .create_page(NewPage {
                title: "Algo".to_string(),
                tags: vec!["math".to_string()],
            })
            .await
            .unwrap();
        let console = ws
            .create_console(NewConsole::for_page(&page.id))
            .await
            .unwrap();
        (store, ws, page, console)
    }

    fn code_key(console: &Console) -> WriteKey {
        WriteKey::new(&console.id, Field::Console(ConsoleField::Code))
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_quick_edits_send_only_the_last() {
        let (store, ws, _, console) = setup().await;
        let key = code_key(&console);

        ws.edit(key.clone(), text("x = 1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        ws.edit(key.clone(), text("x = 2")).await.unwrap();
        assert_eq!(ws.read_field(&key).unwrap(), text("x = 2"));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(
            *store.console_updates.lock().unwrap(),
            vec![ConsolePatch::Code("x = 2".to_string())]
        );
        assert!(!ws.is_pending(&key));
        assert_eq!(ws.pages()[0].consoles[0].code, "x = 2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffered_value_visible_before_commit() {
        let (store, ws, _, console) = setup().await;
        let key = code_key(&console);

        ws.edit(key.clone(), text("draft")).await.unwrap();
        assert_eq!(ws.read_field(&key).unwrap(), text("draft"));
        assert_eq!(ws.view()[0].consoles[0].code, "draft");
        assert_eq!(ws.pages()[0].consoles[0].code, "");
        assert!(store.console_updates.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_commit_keeps_buffer_and_raises_notice() {
        let (store, ws, _, console) = setup().await;
        let key = code_key(&console);
        store.fail.store(true, Ordering::SeqCst);

        ws.edit(key.clone(), text("unsaved")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(ws.is_pending(&key));
        assert_eq!(ws.read_field(&key).unwrap(), text("unsaved"));
        let notices = ws.drain_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("backend unavailable"));
        assert!(ws.drain_notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_commit_does_not_clear_newer_edit() {
        let (store, ws, _, console) = setup().await;
        let key = code_key(&console);
        *store.latency.lock().unwrap() = Duration::from_millis(200);

        ws.edit(key.clone(), text("a")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1050)).await;
        // First commit is waiting on the store.
        ws.edit(key.clone(), text("ab")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(ws.is_pending(&key));
        assert_eq!(ws.read_field(&key).unwrap(), text("ab"));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!ws.is_pending(&key));
        assert_eq!(ws.pages()[0].consoles[0].code, "ab");
    }

    #[tokio::test(start_paused = true)]
    async fn test_language_commits_without_delay() {
        let (store, ws, _, console) = setup().await;
        let key = WriteKey::new(&console.id, Field::Console(ConsoleField::Language));

        ws.edit(key, text("rust")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(store.console_updates.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_title_is_ignored() {
        let (store, ws, page, _) = setup().await;
        let key = WriteKey::new(&page.id, Field::Page(PageField::Title));

        ws.edit(key.clone(), text("   ")).await.unwrap();
        assert!(!ws.is_pending(&key));
        ws.flush().await;
        assert!(store.page_updates.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_entity_is_not_found() {
        let (_, ws, _, _) = setup().await;
        let key = WriteKey::new("missing", Field::Console(ConsoleField::Code));
        let err = ws.edit(key, text("x")).await.unwrap_err();
        assert!(matches!(err, SnipError::NotFound { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tags_recomputed_after_commit() {
        let (_, ws, page, console) = setup().await;
        ws.add_tag(EntityKind::Console, &console.id, " search ")
            .await
            .unwrap();
        ws.add_tag(EntityKind::Page, &page.id, "algorithms").await.unwrap();
        ws.flush().await;

        assert_eq!(
            *ws.available_tags(),
            vec!["algorithms".to_string(), "math".to_string(), "search".to_string()]
        );

        ws.remove_tag(EntityKind::Page, &page.id, "math").await.unwrap();
        ws.flush().await;
        assert_eq!(
            *ws.available_tags(),
            vec!["algorithms".to_string(), "search".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_tag_is_ignored() {
        let (store, ws, page, _) = setup().await;
        ws.add_tag(EntityKind::Page, &page.id, "  ").await.unwrap();
        ws.flush().await;
        assert!(store.page_updates.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_commit_carries_other_field() {
        let (store, ws, page, _) = setup().await;
        let key = WriteKey::new(&page.id, Field::Page(PageField::Title));
        ws.edit(key, text("Algorithms")).await.unwrap();
        ws.flush().await;

        let updates = store.page_updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].title, "Algorithms");
        assert_eq!(updates[0].tags, vec!["math".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_commit_waits_for_in_flight_title_commit() {
        let (store, ws, page, _) = setup().await;
        *store.page_latency.lock().unwrap() = Duration::from_millis(200);
        let title = WriteKey::new(&page.id, Field::Page(PageField::Title));

        ws.edit(title, text("Algorithms")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1050)).await;
        // Title commit is waiting on the store.
        ws.add_tag(EntityKind::Page, &page.id, "search").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        ws.flush().await;

        let expected_tags = vec!["math".to_string(), "search".to_string()];
        let stored = store.inner.list_pages().await.unwrap();
        assert_eq!(stored[0].title, "Algorithms");
        assert_eq!(stored[0].tags, expected_tags);
        assert_eq!(ws.pages()[0].title, "Algorithms");
        assert_eq!(ws.pages()[0].tags, expected_tags);

        let updates = store.page_updates.lock().unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].title, "Algorithms");
        assert_eq!(ws.pending_count(), 0);
        assert!(ws.drain_notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_title_and_tags_edited_together_both_persist() {
        let (store, ws, page, _) = setup().await;
        *store.page_latency.lock().unwrap() = Duration::from_millis(200);

        ws.edit(
            WriteKey::new(&page.id, Field::Page(PageField::Title)),
            text("Algorithms"),
        )
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        ws.edit(
            WriteKey::new(&page.id, Field::Page(PageField::Tags)),
            FieldValue::Tags(vec!["math".to_string(), "sorting".to_string()]),
        )
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        ws.flush().await;

        let stored = store.inner.list_pages().await.unwrap();
        assert_eq!(stored[0].title, "Algorithms");
        assert_eq!(
            stored[0].tags,
            vec!["math".to_string(), "sorting".to_string()]
        );
        assert_eq!(ws.pages()[0].title, "Algorithms");
        assert_eq!(
            ws.pages()[0].tags,
            vec!["math".to_string(), "sorting".to_string()]
        );
        assert!(ws.inner.page_locks.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_console_reply_keeps_newer_sibling_field() {
        let (store, ws, _, console) = setup().await;
        // The code commit is applied at once but its reply is held back.
        store
            .reply_delays
            .lock()
            .unwrap()
            .push_back(Duration::from_millis(1000));

        ws.edit(code_key(&console), text("x = 1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1050)).await;
        ws.edit(
            WriteKey::new(&console.id, Field::Console(ConsoleField::Comment)),
            text("binary search"),
        )
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(ws.pages()[0].consoles[0].comment, "binary search");

        tokio::time::sleep(Duration::from_millis(1000)).await;
        ws.flush().await;

        let snapshot = &ws.pages()[0].consoles[0];
        assert_eq!(snapshot.code, "x = 1");
        assert_eq!(snapshot.comment, "binary search");
        assert_eq!(ws.view()[0].consoles[0].comment, "binary search");
        assert_eq!(ws.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_section() {
        let (_, ws, _, console) = setup().await;
        assert!(ws.toggle_section(&console.id, Section::Before).await.unwrap());
        assert!(!ws.toggle_section(&console.id, Section::Before).await.unwrap());
        ws.flush().await;
        assert!(!ws.pages()[0].consoles[0].show_before_text);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_commits_pending_edits() {
        let (store, ws, _, console) = setup().await;
        ws.edit(code_key(&console), text("late")).await.unwrap();
        let unsaved = ws.shutdown().await;
        assert_eq!(unsaved, 0);
        let pages = store.inner.list_pages().await.unwrap();
        assert_eq!(pages[0].consoles[0].code, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_console_drops_pending_edit() {
        let (store, ws, _, console) = setup().await;
        ws.edit(code_key(&console), text("gone")).await.unwrap();
        ws.delete_console(&console.id).await.unwrap();
        ws.flush().await;

        assert_eq!(ws.pending_count(), 0);
        assert!(store.console_updates.lock().unwrap().is_empty());
        assert!(ws.drain_notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_blocks_until_reload() {
        let store = Arc::new(TestStore::default());
        store.fail.store(true, Ordering::SeqCst);
        let ws = Workspace::open(store.clone(), DebounceDelays::default()).await;

        assert!(matches!(ws.status(), LoadStatus::Failed(_)));
        let err = ws.create_page(NewPage::default()).await.unwrap_err();
        assert!(matches!(err, SnipError::Load(_)));

        store.fail.store(false, Ordering::SeqCst);
        ws.reload().await.unwrap();
        assert_eq!(ws.status(), LoadStatus::Ready);
        ws.create_page(NewPage::default()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_create_leaves_snapshot_unchanged() {
        let (store, ws, _, _) = setup().await;
        store.fail.store(true, Ordering::SeqCst);
        let err = ws.create_page(NewPage::default()).await.unwrap_err();
        assert!(matches!(err, SnipError::Persistence(_)));
        assert_eq!(ws.pages().len(), 1);
        assert_eq!(ws.drain_notices().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_sees_buffered_edits() {
        let (_, ws, _, console) = setup().await;
        ws.edit(code_key(&console), text("fn binary_search()"))
            .await
            .unwrap();
        let results = ws.search("binary", &BTreeSet::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matching_consoles.len(), 1);
    }
}
