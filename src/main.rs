//! # Snipdeck CLI (`snipdeck`)
//!
//! ## Usage
//!
//! ```bash
//! snipdeck --config ./config/snipdeck.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `snipdeck init` | Create the store (schema or empty document) |
//! | `snipdeck pages` | List pages |
//! | `snipdeck show <id>` | Print a page and its consoles |
//! | `snipdeck page new\|rename\|delete` | Manage pages |
//! | `snipdeck console add\|delete\|toggle` | Manage consoles |
//! | `snipdeck edit <entity> <id> <field> <value>` | Edit one field |
//! | `snipdeck tag add\|remove <entity> <id> <tag>` | Change tags |
//! | `snipdeck tags` | List every tag in use |
//! | `snipdeck search [query] --tag <t>` | Search and filter pages |
//! | `snipdeck export` / `import` | JSON backup and restore |
//!
//! Logging goes to stderr and is controlled by `SNIPDECK_LOG`
//! (e.g. `SNIPDECK_LOG=snipdeck=debug`). The default level is `warn`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use snipdeck::{backend, config, edit, export, pages, search};

/// Snipdeck: organize code snippets into tagged pages.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without one, a SQLite store under `./data` is used.
#[derive(Parser)]
#[command(
    name = "snipdeck",
    about = "Snipdeck: organize code snippets into tagged pages",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/snipdeck.toml`. If the file does not exist,
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/snipdeck.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the store.
    ///
    /// Creates the SQLite schema or an empty JSON document. Safe to run
    /// more than once.
    Init,

    /// List pages, newest first.
    Pages,

    /// Print a page with all its consoles.
    Show {
        /// Page id.
        id: String,
    },

    /// Create, rename, or delete pages.
    Page {
        #[command(subcommand)]
        action: PageAction,
    },

    /// Add, delete, or toggle consoles.
    Console {
        #[command(subcommand)]
        action: ConsoleAction,
    },

    /// Edit a single field of a page or console.
    ///
    /// Page fields: title, tags. Console fields: code, comment, language,
    /// tags, before_text, after_text, show_before_text, show_after_text.
    /// Tags are comma-separated.
    Edit {
        /// `page` or `console`.
        entity: String,
        id: String,
        field: String,
        value: String,
    },

    /// Add or remove a single tag.
    Tag {
        /// `add` or `remove`.
        action: String,
        /// `page` or `console`.
        entity: String,
        id: String,
        tag: String,
    },

    /// List every tag used by any page or console.
    Tags,

    /// Search pages by text and filter by tag.
    ///
    /// A page matches if its title, one of its tags, or one of its consoles
    /// contains the query (case-insensitive). With `--tag`, only pages
    /// carrying at least one of the given tags are considered.
    Search {
        /// Text to look for. Empty lists every page passing the tag filter.
        #[arg(default_value = "")]
        query: String,

        /// Tag to filter by. Repeat for several; any one matching is enough.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Export all pages and consoles as JSON.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import pages from a JSON export. Existing pages are kept.
    Import {
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum PageAction {
    /// Create a page.
    New {
        #[arg(long)]
        title: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Change a page's title.
    Rename { id: String, title: String },
    /// Delete a page and all its consoles.
    Delete { id: String },
}

#[derive(Subcommand)]
enum ConsoleAction {
    /// Append a console to a page.
    Add {
        page_id: String,
        #[arg(long)]
        comment: Option<String>,
        /// One of: javascript, python, java, cpp, csharp, php, ruby, go,
        /// rust, typescript, html, css, sql, bash, json, xml, yaml.
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Delete a console.
    Delete { id: String },
    /// Show or hide the notes before or after the code.
    Toggle {
        id: String,
        /// `before` or `after`.
        section: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SNIPDECK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!(path = %cli.config.display(), "config not found, using defaults");
        config::Config::minimal()
    };

    match cli.command {
        Commands::Init => {
            backend::run_init(&cfg).await?;
        }
        Commands::Pages => {
            pages::run_pages(&cfg).await?;
        }
        Commands::Show { id } => {
            pages::run_show(&cfg, &id).await?;
        }
        Commands::Page { action } => match action {
            PageAction::New { title, tags } => {
                pages::run_page_new(&cfg, title, tags).await?;
            }
            PageAction::Rename { id, title } => {
                pages::run_page_rename(&cfg, &id, &title).await?;
            }
            PageAction::Delete { id } => {
                pages::run_page_delete(&cfg, &id).await?;
            }
        },
        Commands::Console { action } => match action {
            ConsoleAction::Add {
                page_id,
                comment,
                language,
                code,
                tags,
            } => {
                let args = pages::ConsoleArgs {
                    comment,
                    language,
                    code,
                    tags,
                };
                pages::run_console_add(&cfg, &page_id, args).await?;
            }
            ConsoleAction::Delete { id } => {
                pages::run_console_delete(&cfg, &id).await?;
            }
            ConsoleAction::Toggle { id, section } => {
                pages::run_console_toggle(&cfg, &id, &section).await?;
            }
        },
        Commands::Edit {
            entity,
            id,
            field,
            value,
        } => {
            edit::run_edit(&cfg, &entity, &id, &field, &value).await?;
        }
        Commands::Tag {
            action,
            entity,
            id,
            tag,
        } => {
            edit::run_tag(&cfg, &action, &entity, &id, &tag).await?;
        }
        Commands::Tags => {
            search::run_tags(&cfg).await?;
        }
        Commands::Search { query, tags } => {
            search::run_search(&cfg, &query, tags).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Import { file } => {
            export::run_import(&cfg, &file).await?;
        }
    }

    Ok(())
}
