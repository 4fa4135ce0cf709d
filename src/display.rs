//! Plain-text rendering of results for terminal output.

use crate::admin::ListingState;
use crate::models::{GenerateResult, SummaryResult};

/// Render a summary: heading, body, then a chunk statistics line.
///
/// ```text
/// A
///
/// ...summary...
///
/// Chunks used: 0, 2, 4 • Total chunks: 5 • Selected: 3
/// ```
pub fn render_summary(result: &SummaryResult) -> String {
    let title = result
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("Summary");

    let chunks = match &result.chunks_used {
        Some(idxs) => idxs
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        None => "—".to_string(),
    };
    let stats = result.stats.as_ref();
    let total = stats
        .and_then(|s| s.chunks_total)
        .map(|n| n.to_string())
        .unwrap_or_else(|| "—".to_string());
    let selected = stats
        .and_then(|s| s.chunks_used)
        .map(|n| n.to_string())
        .unwrap_or_else(|| "—".to_string());

    format!(
        "{}\n\n{}\n\nChunks used: {} • Total chunks: {} • Selected: {}",
        title, result.summary, chunks, total, selected
    )
}

/// Render a generated answer followed by its retrieved sources, if any.
pub fn render_answer(result: &GenerateResult) -> String {
    let mut out = format!("Answer\n\n{}", result.answer);
    if !result.matches.is_empty() {
        out.push_str("\n\nSources:");
        for (i, m) in result.matches.iter().enumerate() {
            out.push_str(&format!(
                "\n  [Doc {}] {} (id={})",
                i,
                m.source().unwrap_or("unknown"),
                m.id
            ));
        }
    }
    out
}

/// Render a collection listing, one line per collection.
pub fn render_listing(listing: &ListingState) -> String {
    let Some(collections) = listing.collections() else {
        return "No listing loaded.".to_string();
    };
    if collections.is_empty() {
        return "Collections\n  (none)".to_string();
    }
    let mut out = String::from("Collections");
    for c in collections {
        let count = c
            .count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        out.push_str(&format!("\n  {:<24} {} docs", c.name, count));
    }
    out
}
