//! Small string helpers shared by the strategies and the search filter.

use std::sync::LazyLock;

use regex::Regex;

static SEARCH_TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"|(\S+)"#).expect("search term pattern is valid"));

/// Returns the value passed for the argument `name` in a command-line string.
///
/// The value follows `name` after either `=` or whitespace and may be wrapped
/// in `"` or `'`. A quoted value runs to the matching quote that is followed
/// by whitespace or the end of the string; otherwise the value runs to the
/// next whitespace. Matching is case-sensitive. Returns an empty string when
/// the argument is absent.
///
/// ```
/// use regtest_collector::text::argument_value;
///
/// let args = r#"-i "in put.txt" -scenario=s1"#;
/// assert_eq!(argument_value(args, "-i"), "in put.txt");
/// assert_eq!(argument_value(args, "-scenario"), "s1");
/// assert_eq!(argument_value(args, "-o"), "");
/// ```
pub fn argument_value(s: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }

    let mut from = 0;
    while let Some(offset) = s[from..].find(name) {
        let start = from + offset;
        let rest = &s[start + name.len()..];

        let value = match rest.strip_prefix('=') {
            Some(after_eq) => Some(after_eq),
            None => {
                let trimmed = rest.trim_start();
                (trimmed.len() < rest.len()).then_some(trimmed)
            }
        };
        if let Some(value) = value {
            return read_value(value).to_string();
        }

        // Occurrences may overlap, so only step past one character.
        from = start + s[start..].chars().next().map_or(1, char::len_utf8);
    }

    String::new()
}

fn read_value(text: &str) -> &str {
    if let Some(quote) = text.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let inner = &text[1..];
        let closing = inner.match_indices(quote).find(|(idx, _)| {
            inner[idx + 1..]
                .chars()
                .next()
                .is_none_or(char::is_whitespace)
        });
        if let Some((idx, _)) = closing {
            return &inner[..idx];
        }
    }

    text.split(char::is_whitespace).next().unwrap_or_default()
}

/// Splits a search box input into terms.
///
/// Terms are separated by whitespace. When the input contains more than one
/// `"`, double-quoted phrases are kept together as single terms; a lone `"`
/// is treated as whitespace.
pub fn parse_search_terms(input: &str) -> Vec<String> {
    if input.trim().is_empty() {
        return Vec::new();
    }

    if input.matches('"').count() > 1 {
        return SEARCH_TERM_RE
            .captures_iter(input)
            .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)))
            .map(|m| m.as_str())
            .filter(|term| !term.trim().is_empty() && *term != "\"")
            .map(str::to_string)
            .collect();
    }

    input
        .replace('"', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Returns `true` if `haystack` contains every term, ignoring case.
pub fn contains_all<S: AsRef<str>>(haystack: &str, terms: &[S]) -> bool {
    let haystack = haystack.to_lowercase();
    terms
        .iter()
        .all(|term| haystack.contains(&term.as_ref().to_lowercase()))
}
