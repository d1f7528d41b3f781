//! Page and console commands: listing, display, create, rename, delete.
//!
//! Structural changes go straight to the store. Renames and section toggles
//! are field edits, so they pass through the workspace's debounced write
//! path and are committed when the command finishes.

use anyhow::Result;

use snipdeck_core::fields::{Field, FieldValue, PageField};
use snipdeck_core::models::{Console, Language, NewConsole, NewPage, Page, DEFAULT_PAGE_TITLE};
use snipdeck_core::pending::WriteKey;
use snipdeck_core::tags::normalize_tags;

use crate::backend::{finish, open_workspace};
use crate::config::Config;
use crate::workspace::Section;

/// `snipdeck pages`
pub async fn run_pages(config: &Config) -> Result<()> {
    let workspace = open_workspace(config).await?;
    let pages = workspace.pages();

    if pages.is_empty() {
        println!("No pages.");
        return Ok(());
    }

    println!("{:<38} {:>8}  {:<30} TAGS", "ID", "CONSOLES", "TITLE");
    for page in pages.iter() {
        println!(
            "{:<38} {:>8}  {:<30} {}",
            page.id,
            page.consoles.len(),
            truncate(&page.title, 30),
            page.tags.join(", ")
        );
    }
    Ok(())
}

/// `snipdeck show <page-id>`
pub async fn run_show(config: &Config, id: &str) -> Result<()> {
    let workspace = open_workspace(config).await?;
    let page = match workspace.page(id) {
        Some(p) => p,
        None => {
            eprintln!("Error: page not found: {}", id);
            std::process::exit(1);
        }
    };
    print_page(&page);
    Ok(())
}

/// `snipdeck page new`
pub async fn run_page_new(config: &Config, title: Option<String>, tags: Vec<String>) -> Result<()> {
    let workspace = open_workspace(config).await?;
    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PAGE_TITLE.to_string());
    let page = workspace
        .create_page(NewPage {
            title,
            tags: normalize_tags(&tags),
        })
        .await?;
    println!("Created page {} ({})", page.id, page.title);
    finish(workspace).await
}

/// `snipdeck page rename <id> <title>`
pub async fn run_page_rename(config: &Config, id: &str, title: &str) -> Result<()> {
    let workspace = open_workspace(config).await?;
    if title.trim().is_empty() {
        println!("Title unchanged (blank titles are ignored).");
        return finish(workspace).await;
    }
    let key = WriteKey::new(id, Field::Page(PageField::Title));
    workspace
        .edit(key, FieldValue::Text(title.to_string()))
        .await?;
    finish(workspace).await?;
    println!("Renamed page {}", id);
    Ok(())
}

/// `snipdeck page delete <id>`
pub async fn run_page_delete(config: &Config, id: &str) -> Result<()> {
    let workspace = open_workspace(config).await?;
    workspace.delete_page(id).await?;
    println!("Deleted page {}", id);
    finish(workspace).await
}

/// Field values for `snipdeck console add`.
#[derive(Debug, Default)]
pub struct ConsoleArgs {
    pub comment: Option<String>,
    pub language: Option<String>,
    pub code: Option<String>,
    pub tags: Vec<String>,
}

/// `snipdeck console add <page-id>`
pub async fn run_console_add(config: &Config, page_id: &str, args: ConsoleArgs) -> Result<()> {
    let workspace = open_workspace(config).await?;
    let mut request = NewConsole::for_page(page_id);
    if let Some(comment) = args.comment {
        request.comment = comment;
    }
    if let Some(language) = args.language {
        request.language = language.parse::<Language>()?;
    }
    if let Some(code) = args.code {
        request.code = code;
    }
    request.tags = normalize_tags(&args.tags);

    let console = workspace.create_console(request).await?;
    println!("Added console {} to page {}", console.id, page_id);
    finish(workspace).await
}

/// `snipdeck console delete <id>`
pub async fn run_console_delete(config: &Config, id: &str) -> Result<()> {
    let workspace = open_workspace(config).await?;
    workspace.delete_console(id).await?;
    println!("Deleted console {}", id);
    finish(workspace).await
}

/// `snipdeck console toggle <id> before|after`
pub async fn run_console_toggle(config: &Config, id: &str, section: &str) -> Result<()> {
    let section = match section {
        "before" => Section::Before,
        "after" => Section::After,
        other => anyhow::bail!("Unknown section: {}. Use before or after.", other),
    };
    let workspace = open_workspace(config).await?;
    let shown = workspace.toggle_section(id, section).await?;
    finish(workspace).await?;
    println!(
        "{} notes {}",
        if section == Section::Before { "Before" } else { "After" },
        if shown { "shown" } else { "hidden" }
    );
    Ok(())
}

pub fn print_page(page: &Page) {
    println!("--- Page ---");
    println!("id:       {}", page.id);
    println!("title:    {}", page.title);
    println!("tags:     {}", page.tags.join(", "));
    println!("created:  {}", format_ts_iso(page.created_at));
    println!("updated:  {}", format_ts_iso(page.updated_at));
    println!();

    println!("--- Consoles ({}) ---", page.consoles.len());
    for (i, console) in page.consoles.iter().enumerate() {
        print_console(i + 1, console);
    }
}

fn print_console(n: usize, console: &Console) {
    println!("[{}] {} ({})", n, console.id, console.language);
    println!("    comment: {}", console.comment);
    if !console.tags.is_empty() {
        println!("    tags:    {}", console.tags.join(", "));
    }
    if console.show_before_text {
        println!("    before:  {}", console.before_text);
    }
    for line in console.code.lines() {
        println!("    | {}", line);
    }
    if console.show_after_text {
        println!("    after:   {}", console.after_text);
    }
    println!();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

pub(crate) fn format_ts_iso(ts_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_millis)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts_millis.to_string())
}
