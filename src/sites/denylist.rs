//! Title denylist for UI chrome picked up by loose selectors
//!
//! Search pages often carry menu entries, filter placeholders and
//! pagination labels inside the same containers as real listings. Titles
//! matching an entry here are discarded.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Labels that are never job titles
const BUILTIN_ENTRIES: &[&str] = &[
    // navigation
    "menu",
    "home",
    "jobs",
    "careers",
    "companies",
    "job search",
    "search",
    "search jobs",
    "my page",
    // account
    "login",
    "log in",
    "sign in",
    "sign up",
    "register",
    "logout",
    "log out",
    // filters and sorting
    "filter",
    "filters",
    "all",
    "select",
    "reset",
    "apply filter",
    "sort",
    "sort by",
    "latest",
    "newest",
    "popular",
    "location",
    "experience",
    "job type",
    // pagination
    "next",
    "previous",
    "prev",
    "first",
    "last",
    "more",
    "load more",
    "view more",
    "see more",
    "show more",
    "«",
    "»",
    "<",
    ">",
];

static BUILTIN: Lazy<HashSet<String>> =
    Lazy::new(|| BUILTIN_ENTRIES.iter().map(|e| normalize_title(e)).collect());

/// Case-insensitive set of titles to discard
#[derive(Debug, Clone)]
pub struct Denylist {
    entries: HashSet<String>,
}

impl Denylist {
    /// The built-in entries only
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN.clone(),
        }
    }

    /// The built-in entries plus site-specific ones
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut denylist = Self::builtin();
        denylist.entries.extend(
            extra
                .into_iter()
                .map(|e| normalize_title(e.as_ref()))
                .filter(|e| !e.is_empty()),
        );
        denylist
    }

    /// Returns true if `title` is empty, a bare page number, or a denylisted label
    pub fn rejects(&self, title: &str) -> bool {
        let normalized = normalize_title(title);
        normalized.is_empty()
            || normalized.chars().all(|c| c.is_ascii_digit())
            || self.entries.contains(&normalized)
    }
}

impl Default for Denylist {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Trims, collapses inner whitespace and lower-cases a title
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
