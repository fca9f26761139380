//! Console client picker: substring search, numbered selection.

use async_trait::async_trait;
use docassign_core::coordinator::ClientPicker;
use docassign_core::gateway::ClientDirectory;
use docassign_core::models::ClientRecord;
use std::io::Write;
use std::path::Path;

/// What a selection-prompt answer means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// 1-based list position, already bounds-checked.
    Index(usize),
    /// Start a new search.
    Again,
    Cancel,
}

/// Parses the answer to the numbered prompt. Empty or `q` cancels, `s`
/// searches again, an in-range number picks; anything else re-searches.
pub fn parse_choice(input: &str, len: usize) -> Choice {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("q") {
        return Choice::Cancel;
    }
    if trimmed.eq_ignore_ascii_case("s") {
        return Choice::Again;
    }
    match trimmed.parse::<usize>() {
        Ok(n) if n >= 1 && n <= len => Choice::Index(n - 1),
        _ => Choice::Again,
    }
}

pub struct ConsolePicker;

async fn prompt(label: &str) -> anyhow::Result<String> {
    let label = label.to_string();
    tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        print!("{label}");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_string())
    })
    .await?
}

#[async_trait]
impl ClientPicker for ConsolePicker {
    async fn pick(
        &self,
        path: &Path,
        directory: &dyn ClientDirectory,
    ) -> anyhow::Result<Option<ClientRecord>> {
        println!();
        println!("new download: {}", path.display());
        loop {
            let query = prompt("client search (empty cancels): ").await?;
            if query.is_empty() {
                return Ok(None);
            }
            let hits = directory.search(&query).await?;
            if hits.is_empty() {
                println!("no matching clients");
                continue;
            }
            for (i, client) in hits.iter().enumerate() {
                let folder = client
                    .folder
                    .as_ref()
                    .map(|f| f.display().to_string())
                    .unwrap_or_else(|| "<no folder>".into());
                println!("  {}. {} ({})", i + 1, client.name, folder);
            }
            let answer = prompt("pick a number ('s' searches again, empty cancels): ").await?;
            match parse_choice(&answer, hits.len()) {
                Choice::Cancel => return Ok(None),
                Choice::Again => continue,
                Choice::Index(i) => return Ok(Some(hits[i].clone())),
            }
        }
    }
}
