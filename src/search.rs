//! `snipdeck search` and `snipdeck tags`.
//!
//! Filtering and classification live in [`snipdeck_core::search`]; this
//! module loads the workspace and prints the results.

use std::collections::BTreeSet;

use anyhow::Result;

use snipdeck_core::search::SearchResultPage;
use snipdeck_core::tags::normalize_tags;

use crate::backend::open_workspace;
use crate::config::Config;

pub async fn run_search(config: &Config, query: &str, tags: Vec<String>) -> Result<()> {
    let workspace = open_workspace(config).await?;
    let selected: BTreeSet<String> = normalize_tags(&tags).into_iter().collect();

    let available = workspace.available_tags();
    let unknown: Vec<&String> = selected.iter().filter(|t| !available.contains(*t)).collect();
    if !unknown.is_empty() {
        eprintln!(
            "Warning: no page or console is tagged {}",
            unknown
                .iter()
                .map(|t| format!("'{}'", t))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let results = workspace.search(query, &selected);
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        print_result(i + 1, result);
    }
    println!("{} page(s)", results.len());
    Ok(())
}

fn print_result(n: usize, result: &SearchResultPage) {
    let page = &result.page;
    match result.match_type {
        Some(kind) => println!("{}. [{}] {}", n, kind.as_str(), page.title),
        None => println!("{}. {}", n, page.title),
    }
    println!("    id:   {}", page.id);
    if !page.tags.is_empty() {
        println!("    tags: {}", page.tags.join(", "));
    }
    if !result.matching_consoles.is_empty() {
        println!("    matched within:");
        for console in &result.matching_consoles {
            println!(
                "      - {} ({}) {}",
                console.comment,
                console.language,
                first_line(&console.code)
            );
        }
    }
    println!();
}

fn first_line(code: &str) -> &str {
    code.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

/// `snipdeck tags`: every tag in use, sorted.
pub async fn run_tags(config: &Config) -> Result<()> {
    let workspace = open_workspace(config).await?;
    let tags = workspace.available_tags();
    if tags.is_empty() {
        println!("No tags.");
        return Ok(());
    }
    for tag in tags.iter() {
        println!("{}", tag);
    }
    Ok(())
}
