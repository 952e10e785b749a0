//! Character-based pagination of captured command output.

use serde::Serialize;

use super::schema::DEFAULT_LIMIT;
use super::translate::ResponseConfig;

/// Where to go next. Hints are not clamped; callers clamp them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationHints {
    pub to_beginning: i64,
    pub to_end: i64,
    pub next_page: i64,
    pub prev_page: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMetadata {
    pub total_size: i64,
    pub limit: i64,
    pub offset: i64,
    pub actual_start: i64,
    pub actual_end: i64,
    pub actual_size: i64,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation_hints: Option<NavigationHints>,
}

/// Slice `output` by characters. A negative offset counts from the end.
pub fn paginate(output: &str, config: ResponseConfig) -> (String, PaginationMetadata) {
    let chars: Vec<char> = output.chars().collect();
    let n = chars.len() as i64;
    let limit = if config.limit > 0 { config.limit } else { DEFAULT_LIMIT };

    let start = if config.offset < 0 {
        n.saturating_add(config.offset).max(0)
    } else {
        config.offset.min(n)
    };
    let end = start.saturating_add(limit).min(n);

    let slice: String = if start < n {
        chars[start as usize..end as usize].iter().collect()
    } else {
        String::new()
    };

    let truncated = start > 0 || end < n;
    let navigation_hints = truncated.then(|| NavigationHints {
        to_beginning: 0,
        to_end: n - limit,
        next_page: end,
        prev_page: start - limit,
    });

    let metadata = PaginationMetadata {
        total_size: n,
        limit,
        offset: config.offset,
        actual_start: start,
        actual_end: end,
        actual_size: end - start,
        truncated,
        navigation_hints,
    };
    (slice, metadata)
}
