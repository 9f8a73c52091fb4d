//! Placeholder scanning for template content

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::models::VariableSet;

lazy_static! {
    /// `{{name}}` with optional inner whitespace
    static ref PLACEHOLDER_PATTERN: Regex =
        Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").unwrap();
}

/// Variables every template offers, whether or not its content uses them yet
pub const IMPLICIT_VARIABLES: [&str; 2] = ["paidAmount", "remainingBalance"];

/// Names of all placeholders literally present in `content`.
///
/// Malformed tokens (unbalanced braces, illegal characters) do not match
/// and are ignored.
pub fn scan_placeholders(content: &str) -> VariableSet {
    PLACEHOLDER_PATTERN
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Declared variable set for a template: scanned placeholders plus
/// [`IMPLICIT_VARIABLES`]
pub fn extract_variables(content: &str) -> VariableSet {
    let mut variables = scan_placeholders(content);
    variables.extend(IMPLICIT_VARIABLES.iter().map(|v| v.to_string()));
    variables
}

/// Render a variable name as an insertable tag
pub fn placeholder_tag(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

/// Rewrite every placeholder in one scan of `content`.
///
/// Tokens for which `resolve` returns `None` are kept verbatim. Replacement
/// text is inserted literally and is never scanned again.
pub(crate) fn replace_placeholders<F>(content: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    PLACEHOLDER_PATTERN
        .replace_all(content, |caps: &Captures| {
            resolve(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
