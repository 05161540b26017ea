//! Deterministic storage-namespace naming.

/// How much of the sanitized slug survives before the prefix is applied.
/// Keeps room for the prefix inside typical identifier limits.
const SLUG_PART_MAX: usize = 48;

/// Derive a storage-namespace name from a tenant slug.
///
/// Lower-cases the slug, collapses every run of characters outside
/// `[a-z0-9]` into a single `_`, strips leading/trailing `_`, truncates the
/// slug part, prepends the configured prefix and truncates the whole to the
/// store's maximum identifier length.
///
/// The derivation is deterministic and idempotent: the same slug always
/// yields the same namespace name, so a retried provisioning lands on the
/// namespace it already created.
#[must_use]
pub fn derive_namespace_name(slug: &str, prefix: &str, max_identifier_len: usize) -> String {
    let mut sanitized = String::with_capacity(slug.len());
    let mut last_was_sep = true; // swallow leading separators
    for ch in slug.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            sanitized.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            sanitized.push('_');
            last_was_sep = true;
        }
    }
    truncate_trimmed(&mut sanitized, SLUG_PART_MAX);

    let mut name = format!("{prefix}{sanitized}");
    truncate_trimmed(&mut name, max_identifier_len);
    name
}

/// Truncate to `max` characters and drop any `_` the cut left at the end.
fn truncate_trimmed(s: &mut String, max: usize) {
    if s.len() > max {
        s.truncate(max);
    }
    while s.ends_with('_') {
        s.pop();
    }
}
