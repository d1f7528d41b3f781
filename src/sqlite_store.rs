//! SQLite-backed [`Store`] implementation.
//!
//! Pages and consoles live in two tables; tag lists are stored as JSON
//! arrays. Console order within a page is kept in a `position` column.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use snipdeck_core::fields::ConsolePatch;
use snipdeck_core::models::{new_id, now_millis, Console, NewConsole, NewPage, Page, PageUpdate};
use snipdeck_core::store::Store;
use snipdeck_core::tags::normalize_tags;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_page(&self, id: &str) -> Result<Page> {
        let row = sqlx::query(
            "SELECT id, title, tags_json, created_at, updated_at FROM pages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| anyhow!("page not found: {}", id))?;

        let mut page = page_from_row(&row)?;
        let console_rows = sqlx::query(&format!(
            "SELECT {} FROM consoles WHERE page_id = ? ORDER BY position ASC",
            CONSOLE_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        page.consoles = console_rows
            .iter()
            .map(console_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(page)
    }

    async fn fetch_console(&self, id: &str) -> Result<Console> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM consoles WHERE id = ?",
            CONSOLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| anyhow!("console not found: {}", id))?;
        console_from_row(&row)
    }
}

const CONSOLE_COLUMNS: &str = "id, page_id, code, comment, language, tags_json, before_text, \
     after_text, show_before_text, show_after_text";

fn tags_to_json(tags: &[String]) -> Result<String> {
    Ok(serde_json::to_string(&normalize_tags(tags))?)
}

fn tags_from_json(json: &str) -> Result<Vec<String>> {
    serde_json::from_str(json).with_context(|| format!("invalid tag list: {}", json))
}

fn page_from_row(row: &SqliteRow) -> Result<Page> {
    let tags_json: String = row.get("tags_json");
    Ok(Page {
        id: row.get("id"),
        title: row.get("title"),
        tags: tags_from_json(&tags_json)?,
        consoles: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn console_from_row(row: &SqliteRow) -> Result<Console> {
    let id: String = row.get("id");
    let tags_json: String = row.get("tags_json");
    let language: String = row.get("language");
    let language = language
        .parse()
        .with_context(|| format!("console {} has an invalid language", id))?;
    Ok(Console {
        id,
        code: row.get("code"),
        comment: row.get("comment"),
        language,
        tags: tags_from_json(&tags_json)?,
        before_text: row.get("before_text"),
        after_text: row.get("after_text"),
        show_before_text: row.get("show_before_text"),
        show_after_text: row.get("show_after_text"),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn list_pages(&self) -> Result<Vec<Page>> {
        let page_rows = sqlx::query(
            "SELECT id, title, tags_json, created_at, updated_at FROM pages \
             ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let console_rows = sqlx::query(&format!(
            "SELECT {} FROM consoles ORDER BY page_id, position ASC",
            CONSOLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut by_page: HashMap<String, Vec<Console>> = HashMap::new();
        for row in &console_rows {
            let page_id: String = row.get("page_id");
            by_page.entry(page_id).or_default().push(console_from_row(row)?);
        }

        page_rows
            .iter()
            .map(|row| {
                let mut page = page_from_row(row)?;
                page.consoles = by_page.remove(&page.id).unwrap_or_default();
                Ok(page)
            })
            .collect()
    }

    async fn create_page(&self, page: &NewPage) -> Result<Page> {
        let id = new_id();
        let now = now_millis();
        sqlx::query(
            "INSERT INTO pages (id, title, tags_json, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&page.title)
        .bind(tags_to_json(&page.tags)?)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.fetch_page(&id).await
    }

    async fn update_page(&self, id: &str, update: &PageUpdate) -> Result<Page> {
        let result =
            sqlx::query("UPDATE pages SET title = ?, tags_json = ?, updated_at = ? WHERE id = ?")
                .bind(&update.title)
                .bind(tags_to_json(&update.tags)?)
                .bind(now_millis())
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(anyhow!("page not found: {}", id));
        }
        self.fetch_page(id).await
    }

    async fn delete_page(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM consoles WHERE page_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(anyhow!("page not found: {}", id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn create_console(&self, console: &NewConsole) -> Result<Console> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM pages WHERE id = ?")
            .bind(&console.page_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(anyhow!("page not found: {}", console.page_id));
        }

        let position: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(position) + 1, 0) FROM consoles WHERE page_id = ?")
                .bind(&console.page_id)
                .fetch_one(&mut *tx)
                .await?;

        let id = new_id();
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO consoles (id, page_id, position, code, comment, language, tags_json,
                                  before_text, after_text, show_before_text, show_after_text,
                                  created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&console.page_id)
        .bind(position)
        .bind(&console.code)
        .bind(&console.comment)
        .bind(console.language.as_str())
        .bind(tags_to_json(&console.tags)?)
        .bind(&console.before_text)
        .bind(&console.after_text)
        .bind(console.show_before_text)
        .bind(console.show_after_text)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE pages SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(&console.page_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.fetch_console(&id).await
    }

    async fn update_console(&self, id: &str, patch: &ConsolePatch) -> Result<Console> {
        let column = match patch {
            ConsolePatch::Code(_) => "code",
            ConsolePatch::Comment(_) => "comment",
            ConsolePatch::Language(_) => "language",
            ConsolePatch::Tags(_) => "tags_json",
            ConsolePatch::BeforeText(_) => "before_text",
            ConsolePatch::AfterText(_) => "after_text",
            ConsolePatch::ShowBeforeText(_) => "show_before_text",
            ConsolePatch::ShowAfterText(_) => "show_after_text",
        };
        let sql = format!(
            "UPDATE consoles SET {} = ?, updated_at = ? WHERE id = ?",
            column
        );

        let q = sqlx::query(&sql);
        let q = match patch {
            ConsolePatch::Code(v)
            | ConsolePatch::Comment(v)
            | ConsolePatch::BeforeText(v)
            | ConsolePatch::AfterText(v) => q.bind(v.clone()),
            ConsolePatch::Language(v) => q.bind(v.as_str()),
            ConsolePatch::Tags(v) => q.bind(tags_to_json(v)?),
            ConsolePatch::ShowBeforeText(v) | ConsolePatch::ShowAfterText(v) => q.bind(*v),
        };

        let result = q
            .bind(now_millis())
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to update console {} ({})", id, column))?;
        if result.rows_affected() == 0 {
            return Err(anyhow!("console not found: {}", id));
        }

        self.fetch_console(id).await
    }

    async fn delete_console(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM consoles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(anyhow!("console not found: {}", id));
        }
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT tags_json FROM pages UNION ALL SELECT tags_json FROM consoles",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut all = std::collections::BTreeSet::new();
        for row in &rows {
            let json: String = row.get("tags_json");
            all.extend(normalize_tags(tags_from_json(&json)?));
        }
        Ok(all.into_iter().collect())
    }
}
