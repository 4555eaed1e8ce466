//! Repo-map input: a JSON array of file summaries, one record per entry.

use memo_core::{MemoError, MemoResult};

/// One parsed repo-map entry, defaults already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoMapEntry {
    pub path: String,
    pub language: String,
    pub symbols: Vec<String>,
    pub content: String,
}

impl RepoMapEntry {
    /// The record content: `"{path} [{language}] {symbols joined by ' '}"`,
    /// plus `"\n{content}"` when content is non-empty.
    pub fn to_record_content(&self) -> String {
        let head = format!("{} [{}] {}", self.path, self.language, self.symbols.join(" "));
        if self.content.is_empty() {
            head
        } else {
            format!("{head}\n{}", self.content)
        }
    }
}

/// Parse a repo-map JSON document. The top level must be an array; every
/// entry must carry a `path`.
pub fn parse_repo_map(raw: &str) -> MemoResult<Vec<RepoMapEntry>> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| MemoError::InvalidInput(format!("repo map is not valid JSON: {e}")))?;
    let entries = value
        .as_array()
        .ok_or_else(|| MemoError::InvalidInput("repo map must be a JSON array".into()))?;

    let mut out = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let path = entry
            .get("path")
            .and_then(|p| p.as_str())
            .ok_or_else(|| MemoError::InvalidInput(format!("repo map entry {i} has no path")))?;
        out.push(RepoMapEntry {
            path: path.to_string(),
            language: entry
                .get("language")
                .and_then(|l| l.as_str())
                .unwrap_or("unknown")
                .to_string(),
            symbols: entry
                .get("symbols")
                .and_then(|s| s.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            content: entry
                .get("content")
                .and_then(|c| c.as_str())
                .unwrap_or("")
                .to_string(),
        });
    }
    Ok(out)
}
