//! Best-effort extraction of a SQL statement from free-text model output.

const FENCE: &str = "```";
const SQL_FENCE: &str = "```sql";

/// Scans model output for a single SQL statement.
///
/// Priority order: the first fenced block tagged `sql`, then the first
/// untagged fenced block containing `SELECT`, then a bare `SELECT`
/// substring truncated at the nearest paragraph or sentence break. Fences
/// are matched by delimiter substring only; this is a text heuristic, not
/// a parser, and it keeps the imprecision that entails.
pub fn extract_sql(response: &str) -> Option<String> {
    if let Some((_, rest)) = response.split_once(SQL_FENCE) {
        let block = rest.split(FENCE).next().unwrap_or(rest);
        return Some(block.trim().to_string());
    }

    if response.contains(FENCE) && find_select(response).is_some() {
        // Only odd-indexed segments of the delimiter split are block
        // contents; everything else is prose between fences.
        for segment in response.split(FENCE).skip(1).step_by(2) {
            if find_select(segment).is_some() {
                let block = segment.trim();
                let block = block.strip_prefix("sql").map_or(block, str::trim);
                return Some(block.to_string());
            }
        }
        return None;
    }

    if let Some(start) = find_select(response) {
        let candidate = &response[start..];
        let end = ["\n\n", "\r\n\r\n", ". ", ".\n"]
            .iter()
            .filter_map(|marker| candidate.find(marker))
            .min();
        let candidate = end.map_or(candidate, |end| &candidate[..end]);
        return Some(candidate.trim().to_string());
    }

    None
}

/// Byte offset of the first ASCII-case-insensitive `SELECT`, if any.
fn find_select(text: &str) -> Option<usize> {
    text.as_bytes()
        .windows(6)
        .position(|window| window.eq_ignore_ascii_case(b"select"))
}
