//! Field edits and tag changes from the command line.

use anyhow::Result;

use snipdeck_core::fields::{EntityKind, Field, FieldValue, PageField};
use snipdeck_core::pending::WriteKey;

use crate::backend::{finish, open_workspace};
use crate::config::Config;

/// `snipdeck edit <page|console> <id> <field> <value>`
///
/// The value is parsed according to the field: comma-separated lists for
/// `tags`, `true`/`false` for the `show_*` flags, a language name for
/// `language`, and plain text otherwise.
pub async fn run_edit(
    config: &Config,
    entity: &str,
    id: &str,
    field: &str,
    value: &str,
) -> Result<()> {
    let entity: EntityKind = entity.parse()?;
    let field = Field::parse(entity, field)?;
    let value = field.parse_value(value)?;

    let blank_title = field == Field::Page(PageField::Title)
        && matches!(&value, FieldValue::Text(t) if t.trim().is_empty());

    let workspace = open_workspace(config).await?;
    let key = WriteKey::new(id, field);
    workspace.edit(key.clone(), value).await?;
    finish(workspace).await?;
    if blank_title {
        println!("Title unchanged (blank titles are ignored).");
    } else {
        println!("Saved {}", key);
    }
    Ok(())
}

/// `snipdeck tag add|remove <page|console> <id> <tag>`
pub async fn run_tag(config: &Config, action: &str, entity: &str, id: &str, tag: &str) -> Result<()> {
    let entity: EntityKind = entity.parse()?;
    let workspace = open_workspace(config).await?;
    match action {
        "add" => workspace.add_tag(entity, id, tag).await?,
        "remove" => workspace.remove_tag(entity, id, tag).await?,
        other => anyhow::bail!("Unknown tag action: {}. Use add or remove.", other),
    }
    finish(workspace).await
}
