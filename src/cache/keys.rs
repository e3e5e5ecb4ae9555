//! Cache key construction.
//!
//! Entity keys are `"{type}:{id}"`. List keys are a canonical rendering of a
//! query: pagination normalized the same way list endpoints normalize it,
//! every optional filter replaced by a fixed sentinel when absent, filters
//! sorted by name and values escaped so no two distinct queries render the
//! same string. A literal value equal to a sentinel has its first character
//! percent-escaped.

use std::fmt::{self, Display, Write as _};

/// Sentinel for an absent filter.
pub const ANY: &str = "any";
/// Sentinel for an absent search term.
pub const ALL: &str = "all";

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Key of a single cached entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(entity_type: &str, id: impl Display) -> Self {
        Self(format!("{}:{}", entity_type, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builder for the fingerprint of a list query.
#[derive(Debug, Clone)]
pub struct ListFingerprint {
    resource: String,
    page: i64,
    page_size: i64,
    filters: Vec<(String, Option<String>)>,
    search: Option<String>,
}

impl ListFingerprint {
    pub fn new(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            filters: Vec::new(),
            search: None,
        }
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Add a named filter. `None` and blank values render as [`ANY`].
    /// Adding the same name twice keeps the last value.
    pub fn filter<V: Display>(mut self, name: &str, value: Option<V>) -> Self {
        let value = value.map(|v| v.to_string());
        match self.filters.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value,
            None => self.filters.push((name.to_string(), value)),
        }
        self
    }

    /// Free-text search. `None` and blank values render as [`ALL`].
    pub fn search(mut self, term: Option<&str>) -> Self {
        self.search = term.map(str::to_string);
        self
    }

    /// Canonical key string.
    pub fn key(&self) -> String {
        let page = if self.page <= 0 { DEFAULT_PAGE } else { self.page };
        let page_size = if self.page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        };

        let mut filters: Vec<_> = self.filters.iter().collect();
        filters.sort_by(|a, b| a.0.cmp(&b.0));

        let mut key = format!("{}:list:p{}:ps{}", escape(&self.resource), page, page_size);
        for (name, value) in filters {
            let _ = write!(key, ":{}={}", escape(name), normalize(value.as_deref(), ANY));
        }
        let _ = write!(key, ":search={}", normalize(self.search.as_deref(), ALL));
        key
    }
}

impl Display for ListFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

fn normalize(value: Option<&str>, sentinel: &str) -> String {
    match value.map(str::trim) {
        Some(v) if v == sentinel => {
            let mut chars = v.chars();
            match chars.next() {
                Some(first) => format!("%{:02X}{}", first as u32, chars.as_str()),
                None => String::new(),
            }
        }
        Some(v) if !v.is_empty() => escape(v),
        _ => sentinel.to_string(),
    }
}

/// Percent-escape the characters that carry structure in a key.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            '=' => out.push_str("%3D"),
            _ => out.push(c),
        }
    }
    out
}
