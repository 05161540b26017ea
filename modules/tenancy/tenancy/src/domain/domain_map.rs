//! Custom domain to tenant slug mapping.

use std::collections::HashMap;

/// Static, read-only lookup from an exact custom domain to a tenant slug.
///
/// Built once from configuration at process start; there is no write path.
/// Updating it requires a restart, which is acceptable at its change
/// frequency.
#[derive(Debug, Clone, Default)]
pub struct DomainMap {
    entries: HashMap<String, String>,
}

impl DomainMap {
    #[must_use]
    pub fn new(entries: HashMap<String, String>) -> Self {
        // Host headers arrive lowercased or mixed; match case-insensitively
        // by normalizing both sides.
        let entries = entries
            .into_iter()
            .map(|(domain, slug)| (domain.to_lowercase(), slug))
            .collect();
        Self { entries }
    }

    /// Exact-match lookup. Ports must already be stripped from `host`.
    #[must_use]
    pub fn slug_for(&self, host: &str) -> Option<&str> {
        self.entries.get(&host.to_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
