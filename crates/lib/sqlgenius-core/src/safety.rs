//! Keyword denylist guarding the warehouse against write statements.

/// Keywords whose presence marks a statement as unsafe to run.
const DENYLIST: &[&str] = &["insert", "update", "delete", "drop", "alter", "create"];

/// Returns true when the statement passes the read-only gate.
///
/// Substring match on the lowercased text, not a tokenizer: a SELECT over a
/// column named `created_at` is rejected, and mutations spelled through
/// constructs outside the list (MERGE, procedure calls) are not caught.
/// Both sides of that trade are load-bearing for callers, so the exact
/// semantics must not change.
#[must_use]
pub fn is_query_allowed(query: &str) -> bool {
    let lowered = query.to_lowercase();
    !DENYLIST.iter().any(|keyword| lowered.contains(keyword))
}
