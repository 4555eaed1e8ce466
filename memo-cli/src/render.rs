//! Terminal rendering for search hits and listings.

use chrono::DateTime;

use memo_core::memory::RecordMetadata;
use memo_core::MemoryRecord;
use memo_search::SearchResult;

/// `YYYY-MM-DD` of a millisecond timestamp.
fn iso_date(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// One search hit: a header with similarity (3 decimals), id, and date;
/// a `sourcePath:start-end` line for markdown-imported chunks; the content.
pub fn render_result(result: &SearchResult) -> String {
    let mut out = format!(
        "{:.3} ({}) {}\n",
        result.similarity,
        result.id,
        iso_date(result.created_at)
    );
    if result.record_type.as_deref() == Some("doc_chunk") {
        if let Some(RecordMetadata::MarkdownChunk(meta)) = result
            .metadata
            .as_deref()
            .and_then(|m| serde_json::from_str(m).ok())
        {
            out.push_str(&format!(
                "{}:{}-{}\n",
                meta.source_path, meta.start_line, meta.end_line
            ));
        }
    }
    out.push_str(&result.content);
    out
}

pub fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "no results".to_string();
    }
    results
        .iter()
        .map(render_result)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One listed record.
pub fn render_record(record: &MemoryRecord) -> String {
    format!(
        "({}) {}\n{}",
        record.id,
        iso_date(record.created_at),
        record.content
    )
}
