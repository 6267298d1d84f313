//! Slug generation for catalog entities.
//!
//! Slugs are lowercase ASCII (`a-z0-9_-`) with collapsed separators. The
//! transformation is total and idempotent; callers reject names that produce an
//! empty slug through field validation.

use unicode_normalization::UnicodeNormalization;

/// Maps a display name to its URL-safe slug.
///
/// The name is NFKD-decomposed first so accented letters keep their base
/// letter (`"Crème"` becomes `"creme"`). Remaining characters outside
/// `[A-Za-z0-9_-]` and whitespace are dropped without splitting the word they
/// sit in (`"Joe's"` becomes `"joes"`). Each run of
/// whitespace and hyphens becomes one `-`, and leading or trailing `-`/`_` are
/// stripped.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name
        .nfkd()
        .filter(char::is_ascii)
        .map(|ch| ch.to_ascii_lowercase())
    {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch);
        } else if ch == '-' || ch.is_whitespace() {
            pending_separator = true;
        }
    }

    slug.trim_matches(|ch| ch == '-' || ch == '_').to_string()
}
