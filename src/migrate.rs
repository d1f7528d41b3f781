//! Idempotent schema creation for the SQLite backend.

use anyhow::Result;
use sqlx::SqlitePool;

/// Create the `pages` and `consoles` tables and their indexes.
///
/// Safe to run on every start.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            tags_json TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consoles (
            id TEXT PRIMARY KEY,
            page_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT '',
            language TEXT NOT NULL DEFAULT 'javascript',
            tags_json TEXT NOT NULL DEFAULT '[]',
            before_text TEXT NOT NULL DEFAULT '',
            after_text TEXT NOT NULL DEFAULT '',
            show_before_text INTEGER NOT NULL DEFAULT 0,
            show_after_text INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (page_id) REFERENCES pages(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_consoles_page_id ON consoles(page_id, position)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pages_created_at ON pages(created_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
