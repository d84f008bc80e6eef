//! Stats command implementation.

use super::CommandResult;
use sqlkv_core::KvStore;

/// Renders the backend statistics in `format`.
pub fn render(store: &dyn KvStore, format: &str) -> CommandResult<String> {
    let stats = store.stats();
    let rendered = match format {
        "json" => serde_json::to_string_pretty(&stats)?,
        _ if stats.is_empty() => "No statistics reported".to_string(),
        _ => stats
            .iter()
            .map(|(name, value)| format!("{name:<24} {value}"))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    Ok(rendered)
}

/// Runs the stats command.
pub fn run(store: &dyn KvStore, format: &str) -> CommandResult {
    println!("{}", render(store, format)?);
    Ok(())
}
