//! Token-budget selection policy.
//!
//! Walks an ordered candidate list and decides, per document, whether it
//! is included in full, truncated, or left out. Selection stops at the
//! first document that cannot be included whole: either a truncated tail
//! is packed (when enough budget remains) or the document is skipped,
//! and no later candidate is considered.
//!
//! Token counts are estimates derived from character length; nothing
//! here calls a tokenizer.

use tracing::debug;

use crate::models::ReferenceDocument;

/// Tuning knobs for the selection loop, sourced from `[assembly]` config.
#[derive(Debug, Clone, Copy)]
pub struct BudgetPolicy {
    /// Smallest tail worth truncating a document for. A document is only
    /// partially included when strictly more than this many tokens remain.
    pub min_partial_tokens: i64,
    /// Characters per token used to derive estimates.
    pub chars_per_token: f64,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        BudgetPolicy {
            min_partial_tokens: 1_000,
            chars_per_token: 3.5,
        }
    }
}

/// A document admitted to the selection, possibly truncated.
#[derive(Debug, Clone)]
pub struct SelectedDocument {
    pub title: String,
    pub content: String,
    pub page_count: Option<i64>,
    /// Tokens this document counts against the budget.
    pub tokens: i64,
}

/// Outcome of a selection pass.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub docs: Vec<SelectedDocument>,
    pub total_tokens: i64,
    /// One entry per truncated document, for the assembly banner.
    pub warnings: Vec<String>,
}

/// Estimated token count of `text` at `chars_per_token`, rounded up.
pub fn estimate_tokens(text: &str, chars_per_token: f64) -> i64 {
    (text.chars().count() as f64 / chars_per_token).ceil() as i64
}

/// Pack `candidates` (already in presentation order) into `max_tokens`.
///
/// Rules, in order, for each candidate:
/// - nothing selected yet and the document alone exceeds the budget:
///   truncate it to the full budget, annotate it, and stop;
/// - the document fits in the remaining budget: take it whole;
/// - otherwise, if strictly more than `min_partial_tokens` remain,
///   truncate it to the remainder; either way, stop.
pub fn select_within_budget(
    candidates: Vec<ReferenceDocument>,
    max_tokens: i64,
    policy: &BudgetPolicy,
) -> Selection {
    let mut selection = Selection::default();

    for doc in candidates {
        let doc_tokens = doc.effective_tokens(policy.chars_per_token);

        if selection.docs.is_empty() && doc_tokens > max_tokens {
            let ratio = max_tokens as f64 / doc_tokens as f64;
            let pages = match doc.page_count {
                Some(p) if p > 0 => p.to_string(),
                _ => "N/A".to_string(),
            };
            let content = format!(
                "{}\n\n[Note: Document truncated. Showing {}% of {} pages due to token limits. Full document: {}]",
                char_prefix(&doc.content, ratio),
                percent(ratio),
                pages,
                doc.title
            );
            selection.warnings.push(format!("{} (truncated to fit limit)", doc.title));
            selection.docs.push(SelectedDocument {
                title: doc.title,
                content,
                page_count: doc.page_count,
                tokens: max_tokens,
            });
            selection.total_tokens = max_tokens;
            break;
        }

        if selection.total_tokens + doc_tokens <= max_tokens {
            selection.total_tokens += doc_tokens;
            selection.docs.push(SelectedDocument {
                title: doc.title,
                content: doc.content,
                page_count: doc.page_count,
                tokens: doc_tokens,
            });
            continue;
        }

        let remaining = max_tokens - selection.total_tokens;
        if remaining > policy.min_partial_tokens {
            let ratio = remaining as f64 / doc_tokens as f64;
            let content = format!(
                "{}\n\n[Note: Document truncated. Showing {}% due to token limits.]",
                char_prefix(&doc.content, ratio),
                percent(ratio)
            );
            selection.warnings.push(format!("{} (partial)", doc.title));
            selection.docs.push(SelectedDocument {
                title: doc.title,
                content,
                page_count: doc.page_count,
                tokens: remaining,
            });
            selection.total_tokens += remaining;
        } else {
            debug!(title = %doc.title, remaining, "budget exhausted, document skipped");
        }
        break;
    }

    selection
}

/// Prefix of `content` holding `ratio` of its characters, cut on a char
/// boundary.
fn char_prefix(content: &str, ratio: f64) -> &str {
    let keep = (content.chars().count() as f64 * ratio).floor() as usize;
    match content.char_indices().nth(keep) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

fn percent(ratio: f64) -> i64 {
    (ratio * 100.0).floor() as i64
}

/// Format a number with comma separators (e.g. 1234567 -> "1,234,567").
pub fn format_number(n: i64) -> String {
    let s = n.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{}", out)
    } else {
        out
    }
}
