//! JSON backup of every page and console.
//!
//! `snipdeck export` writes a single document that `snipdeck import` can
//! read back into any backend. Imported pages get fresh ids and are added
//! alongside existing ones; nothing is overwritten.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use snipdeck_core::models::{NewConsole, NewPage, Page};

use crate::backend::{finish, open_workspace};
use crate::config::Config;
use crate::workspace::Workspace;

const BACKUP_VERSION: u32 = 1;

#[derive(Serialize)]
struct ExportData<'a> {
    version: u32,
    exported_at: String,
    pages: &'a [Page],
}

#[derive(Deserialize)]
struct ImportData {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    pages: Vec<Page>,
}

/// Export all pages as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let workspace = open_workspace(config).await?;
    let pages = workspace.pages();
    let console_count: usize = pages.iter().map(|p| p.consoles.len()).sum();

    let data = ExportData {
        version: BACKUP_VERSION,
        exported_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        pages: &pages,
    };
    let json = serde_json::to_string_pretty(&data)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &json)?;
            eprintln!(
                "Exported {} pages, {} consoles to {}",
                pages.len(),
                console_count,
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}

/// Import pages from a backup produced by [`run_export`].
pub async fn run_import(config: &Config, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let pages = parse_backup(&content)
        .with_context(|| format!("Failed to parse backup {}", file.display()))?;

    let workspace = open_workspace(config).await?;
    let (page_count, console_count) = import_pages(&workspace, &pages).await?;
    finish(workspace).await?;
    eprintln!("Imported {} pages, {} consoles", page_count, console_count);
    Ok(())
}

pub fn parse_backup(json: &str) -> Result<Vec<Page>> {
    let data: ImportData = serde_json::from_str(json)?;
    if data.version > BACKUP_VERSION {
        anyhow::bail!(
            "backup version {} is newer than supported version {}",
            data.version,
            BACKUP_VERSION
        );
    }
    Ok(data.pages)
}

/// Recreate `pages` in the workspace, keeping their relative order.
///
/// Backups list pages newest first and new pages are inserted at the front,
/// so pages are created oldest first.
pub async fn import_pages(workspace: &Workspace, pages: &[Page]) -> Result<(usize, usize)> {
    let mut console_count = 0;
    for page in pages.iter().rev() {
        let created = workspace
            .create_page(NewPage {
                title: page.title.clone(),
                tags: page.tags.clone(),
            })
            .await?;
        for console in &page.consoles {
            workspace
                .create_console(NewConsole::from_console(&created.id, console))
                .await?;
            console_count += 1;
        }
    }
    Ok((pages.len(), console_count))
}
