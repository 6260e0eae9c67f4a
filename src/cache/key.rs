use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Separator between hashed fields; cannot appear in ordinary input
const FIELD_SEPARATOR: u8 = 0x1f;

/// Keyword used in the key for "all listings" searches
const ALL_KEYWORD: &str = "all";

/// Deterministic identity of a logical crawl request
///
/// Hex SHA-256 over (site name, site URL, keyword or `"all"`, max results).
/// Identical requests always produce the same key; changing any input
/// changes the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(
        site_name: &str,
        site_url: &str,
        search_keyword: Option<&str>,
        max_results: usize,
    ) -> Self {
        let keyword = search_keyword
            .filter(|k| !k.trim().is_empty())
            .unwrap_or(ALL_KEYWORD);

        let mut hasher = Sha256::new();
        hasher.update(site_name.as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(site_url.as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(keyword.as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(max_results.to_string().as_bytes());

        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let a = CacheKey::new("Alpha", "https://alpha.example", Some("backend"), 10);
        let b = CacheKey::new("Alpha", "https://alpha.example", Some("backend"), 10);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_each_input_changes_key() {
        let base = CacheKey::new("Alpha", "https://alpha.example", Some("backend"), 10);
        let variants = [
            CacheKey::new("Beta", "https://alpha.example", Some("backend"), 10),
            CacheKey::new("Alpha", "https://beta.example", Some("backend"), 10),
            CacheKey::new("Alpha", "https://alpha.example", Some("frontend"), 10),
            CacheKey::new("Alpha", "https://alpha.example", None, 10),
            CacheKey::new("Alpha", "https://alpha.example", Some("backend"), 11),
        ];
        for variant in &variants {
            assert_ne!(&base, variant);
        }
    }

    #[test]
    fn test_missing_and_blank_keyword_mean_all() {
        let none = CacheKey::new("Alpha", "https://alpha.example", None, 5);
        let blank = CacheKey::new("Alpha", "https://alpha.example", Some("  "), 5);
        let all = CacheKey::new("Alpha", "https://alpha.example", Some("all"), 5);
        assert_eq!(none, blank);
        assert_eq!(none, all);
    }

    #[test]
    fn test_field_boundaries_matter() {
        let a = CacheKey::new("a|b", "c", None, 1);
        let b = CacheKey::new("a", "b|c", None, 1);
        assert_ne!(a, b);
    }
}
