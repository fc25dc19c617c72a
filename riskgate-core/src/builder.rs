//! Index Builder: parses a feed file into canonical entries and
//! stages them into a registry index.

use std::collections::HashSet;
use std::path::Path;

use crate::category::Kind;
use crate::error::{LoaderError, LoaderResult};

/// Parse one line into a canonical entry. Returns `None` for lines that are
/// dropped (empty, comment-only, or empty after truncation).
fn parse_line(line: &str, kind: Kind) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('#') {
        return None;
    }

    // Truncate at the first occurrence of any of `#`, `;`, `\t` — a single
    // scan taking the minimum byte index is observably identical to trying
    // `#` first, then `;`, then `\t` with no backtracking (see DESIGN.md).
    let cut = trimmed
        .char_indices()
        .find(|(_, c)| matches!(c, '#' | ';' | '\t'))
        .map(|(i, _)| i);
    let truncated = match cut {
        Some(i) => &trimmed[..i],
        None => trimmed,
    };
    let truncated = truncated.trim();
    if truncated.is_empty() {
        return None;
    }

    Some(match kind {
        Kind::Email => truncated.to_lowercase(),
        Kind::Ip => truncated.to_string(),
    })
}

/// Parse a feed file's full contents into the set of canonical entries for a
/// category of the given kind.
pub fn parse_feed(contents: &str, kind: Kind) -> HashSet<String> {
    contents
        .lines()
        .filter_map(|line| parse_line(line, kind))
        .collect()
}

/// Build a staging index for `category` from `<dir>/<category>.txt`.
pub fn build_staging_from_file(
    dir: &Path,
    category_name: &str,
    kind: Kind,
) -> LoaderResult<HashSet<String>> {
    let path = dir.join(format!("{category_name}.txt"));
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| LoaderError::LoadFailed(format!("{}: {e}", path.display())))?;
    Ok(parse_feed(&contents, kind))
}
