//! Public identifiers for owners.

use std::sync::OnceLock;

use regex::Regex;

static NON_WORD_RUN: OnceLock<Regex> = OnceLock::new();

fn non_word_run() -> &'static Regex {
    // Word characters and `+` are kept: "C++ Primer" -> "C++-Primer".
    NON_WORD_RUN.get_or_init(|| Regex::new(r"[^\w+]+").expect("Invalid slug pattern"))
}

/// Replace every run of characters that are neither word characters nor `+`
/// in `name` with a single hyphen.
///
/// Word characters are Unicode letters, digits and `_`. The result is stable
/// under repeated application: `slugify(&slugify(x)) == slugify(x)`.
pub fn slugify(name: &str) -> String {
    non_word_run().replace_all(name, "-").into_owned()
}
