//! Result extractor for the human-readable suite summary.
//!
//! Suites expose a typed [`Ranking`](crate::report::Ranking); this module only
//! exists to read winners back out of printed logs.

use crate::error::BenchError;
use once_cell::sync::Lazy;
use regex::Regex;

const FASTEST_PREFIX: &str = "Fastest is";

static FASTEST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Fastest is \[([^\]]*)\]").expect("valid fastest pattern"));

/// Render the summary line for a list of winning candidates.
pub fn format_fastest<S: AsRef<str>>(names: &[S]) -> String {
    let joined: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    format!("{} [{}]", FASTEST_PREFIX, joined.join(", "))
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract the bracketed candidate list from the first `Fastest is [...]`
/// occurrence in `summary`.
pub fn extract(summary: &str) -> Result<Vec<String>, BenchError> {
    FASTEST_RE
        .captures(summary)
        .and_then(|caps| caps.get(1))
        .map(|list| split_names(list.as_str()))
        .ok_or_else(|| BenchError::Parse {
            input: summary.to_string(),
        })
}

/// Every `Fastest is [...]` list in `text`, in order of appearance.
pub fn extract_all(text: &str) -> Vec<Vec<String>> {
    FASTEST_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|list| split_names(list.as_str()))
        .collect()
}
