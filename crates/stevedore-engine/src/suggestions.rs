//! "Did you mean" hints for template errors
//!
//! Manifest templates see a flat set of override names, so most mistakes are
//! misspelled `--set` keys or filter names. Candidates are ranked by
//! Levenshtein distance.

/// Maximum distance for a candidate to be suggested
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Filters registered by the engine, plus the MiniJinja built-ins commonly
/// used in manifests
pub const AVAILABLE_FILTERS: &[&str] = &[
    "toyaml",
    "tojson",
    "quote",
    "squote",
    "required",
    "trimprefix",
    "trimsuffix",
    "trunc",
    "default",
    "upper",
    "lower",
    "replace",
    "trim",
    "join",
    "first",
    "last",
    "length",
    "int",
    "string",
    "urlencode",
];

/// Functions registered by the engine
pub const AVAILABLE_FUNCTIONS: &[&str] = &["fail", "env", "coalesce", "range"];

/// Closest candidates to `input`, best first, at most `max_results`
pub fn find_closest_matches<'a>(
    input: &str,
    candidates: &[&'a str],
    max_results: usize,
) -> Vec<&'a str> {
    let mut ranked: Vec<(usize, &str)> = candidates
        .iter()
        .map(|c| (strsim::levenshtein(input, c), *c))
        .filter(|(d, _)| *d > 0 && *d <= MAX_SUGGESTION_DISTANCE)
        .collect();

    ranked.sort_by_key(|(d, _)| *d);
    ranked.truncate(max_results);
    ranked.into_iter().map(|(_, c)| c).collect()
}

/// Hint for a variable the template uses but no override defines
pub fn suggest_undefined_variable(name: &str, overrides: &[&str]) -> String {
    if let Some(key) = name.strip_prefix("values.") {
        return suggest_undefined_variable(key, overrides);
    }

    let matches = find_closest_matches(name, overrides, 3);
    if matches.is_empty() {
        format!(
            "Pass it with `--set {}=<value>` or give it a fallback: `{{{{ {} | default(\"...\") }}}}`",
            name, name
        )
    } else {
        let quoted: Vec<String> = matches.iter().map(|m| format!("`{}`", m)).collect();
        format!("Did you mean {}?", quoted.join(" or "))
    }
}

pub fn suggest_unknown_filter(name: &str) -> String {
    let matches = find_closest_matches(name, AVAILABLE_FILTERS, 3);
    if matches.is_empty() {
        format!(
            "Unknown filter `{}`. Available filters: {}",
            name,
            AVAILABLE_FILTERS.join(", ")
        )
    } else {
        let quoted: Vec<String> = matches.iter().map(|m| format!("`{}`", m)).collect();
        format!("Did you mean {}?", quoted.join(" or "))
    }
}

pub fn suggest_unknown_function(name: &str) -> String {
    let matches = find_closest_matches(name, AVAILABLE_FUNCTIONS, 3);
    if matches.is_empty() {
        format!(
            "Unknown function `{}`. Available functions: {}",
            name,
            AVAILABLE_FUNCTIONS.join(", ")
        )
    } else {
        let quoted: Vec<String> = matches.iter().map(|m| format!("`{}`", m)).collect();
        format!("Did you mean {}?", quoted.join(" or "))
    }
}

/// First back-quoted or single-quoted word of an error message
pub fn extract_quoted_name(msg: &str) -> Option<String> {
    for delimiter in ['`', '\'', '"'] {
        if let Some(start) = msg.find(delimiter) {
            let rest = &msg[start + 1..];
            if let Some(end) = rest.find(delimiter) {
                return Some(rest[..end].to_string());
            }
        }
    }
    None
}
