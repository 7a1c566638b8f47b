//! Handler configuration.

use serde::{Deserialize, Serialize};

use crate::clients::MAX_LOGGING_LEVELS_PAGE;

/// Default cap on pages scanned by a single level lookup.
pub const DEFAULT_MAX_LOOKUP_PAGES: usize = 10_000;

/// Pagination settings for level scans.
///
/// Deserialized values go through the same bounds as [`LookupConfig::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "LookupDocument")]
pub struct LookupConfig {
    /// `maxResults` sent with each listing request (1..=250).
    pub page_size: u32,
    /// Pages a lookup may request before giving up.
    pub max_pages: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_LOGGING_LEVELS_PAGE,
            max_pages: DEFAULT_MAX_LOOKUP_PAGES,
        }
    }
}

impl LookupConfig {
    pub fn new(page_size: u32, max_pages: usize) -> Self {
        Self {
            page_size: page_size.clamp(1, MAX_LOGGING_LEVELS_PAGE),
            max_pages: max_pages.max(1),
        }
    }
}

/// Unchecked wire form of [`LookupConfig`].
#[derive(Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LookupDocument {
    page_size: u32,
    max_pages: usize,
}

impl Default for LookupDocument {
    fn default() -> Self {
        let defaults = LookupConfig::default();
        Self {
            page_size: defaults.page_size,
            max_pages: defaults.max_pages,
        }
    }
}

impl From<LookupDocument> for LookupConfig {
    fn from(doc: LookupDocument) -> Self {
        LookupConfig::new(doc.page_size, doc.max_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LookupConfig::default();
        assert_eq!(config.page_size, 250);
        assert_eq!(config.max_pages, 10_000);
    }

    #[test]
    fn test_new_clamps() {
        assert_eq!(LookupConfig::new(0, 0), LookupConfig::new(1, 1));
        assert_eq!(LookupConfig::new(1000, 5).page_size, 250);
    }

    #[test]
    fn test_partial_document() {
        let config: LookupConfig = serde_json::from_str(r#"{"maxPages": 3}"#).unwrap();
        assert_eq!(config.page_size, 250);
        assert_eq!(config.max_pages, 3);

        let config: LookupConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LookupConfig::default());
    }

    #[test]
    fn test_document_values_are_clamped() {
        let config: LookupConfig =
            serde_json::from_str(r#"{"pageSize": 0, "maxPages": 0}"#).unwrap();
        assert_eq!(config, LookupConfig::new(1, 1));

        let config: LookupConfig =
            serde_json::from_str(r#"{"pageSize": 5000, "maxPages": 7}"#).unwrap();
        assert_eq!(config.page_size, 250);
        assert_eq!(config.max_pages, 7);
    }
}
