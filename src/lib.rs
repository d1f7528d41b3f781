//! # Snipdeck
//!
//! A personal code-snippet organizer. Snippets ("consoles": code, comment,
//! language, optional before/after notes, tags) are grouped under pages and
//! can be searched and filtered by text and tag.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌────────────────┐   ┌───────────┐
//! │   CLI    │──▶│   Workspace    │──▶│ SyncScheduler  │──▶│   Store   │
//! │(snipdeck)│   │ snapshot+buffer│   │ debounced keys │   │ SQLite/JSON│
//! └──────────┘   └───────┬────────┘   └────────────────┘   └───────────┘
//!                        │
//!                        ▼
//!              search / tag aggregation
//!               (snipdeck-core, pure)
//! ```
//!
//! Edits are shown immediately from the pending-write buffer and committed
//! after a per-field debounce delay. A failed commit keeps the local value
//! and raises a [`workspace::Notice`].
//!
//! ## Quick Start
//!
//! ```bash
//! snipdeck init
//! snipdeck page new --title "Algorithms" --tag math
//! snipdeck console add <page-id> --comment "binary search" --language rust
//! snipdeck search binary --tag math
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`sync`] | Keyed debounce timers |
//! | [`workspace`] | Editing controller: snapshot, buffer, commits |
//! | [`backend`] | Store selection from config |
//! | [`db`] | SQLite connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite [`Store`] |
//! | [`file_store`] | JSON document [`Store`] |
//! | [`pages`] | Page and console commands |
//! | [`edit`] | Field and tag edit commands |
//! | [`search`] | Search and tag listing commands |
//! | [`export`] | JSON backup and restore |

pub mod backend;
pub mod config;
pub mod db;
pub mod edit;
pub mod export;
pub mod file_store;
pub mod migrate;
pub mod pages;
pub mod search;
pub mod sqlite_store;
pub mod sync;
pub mod workspace;

pub use snipdeck_core::models::{Console, Language, NewConsole, NewPage, Page};
pub use snipdeck_core::store::Store;
pub use snipdeck_core::{Result, SnipError};
