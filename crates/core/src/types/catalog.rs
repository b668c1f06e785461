//! The cached catalog snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed catalog: the category and offer records from the product feed.
///
/// Category and offer records are free-form trees - their internal shape is
/// whatever the upstream feed produces, and the backend serves them verbatim.
/// A snapshot is only ever replaced wholesale by a successful feed
/// regeneration, never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Value>,
    pub offers: Vec<Value>,
}

impl Catalog {
    /// Create a catalog from already-normalized record sequences.
    #[must_use]
    pub const fn new(categories: Vec<Value>, offers: Vec<Value>) -> Self {
        Self { categories, offers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_serializes_verbatim() {
        let catalog = Catalog::new(
            vec![json!({"id": "1", "$text": "Software"})],
            vec![json!({"id": "42", "name": "Widget", "price": "100"})],
        );

        let value = serde_json::to_value(&catalog).expect("serializable");
        assert_eq!(value["categories"][0]["$text"], "Software");
        assert_eq!(value["offers"][0]["price"], "100");
    }

    #[test]
    fn test_default_is_empty() {
        let catalog = Catalog::default();
        assert!(catalog.categories.is_empty());
        assert!(catalog.offers.is_empty());
    }
}
