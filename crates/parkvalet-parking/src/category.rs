use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A sizing category name, or the `"unknown"` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Read-only mapping from category name to the raw vehicle types it groups.
///
/// Lookup is an exact, case-sensitive string match. When a raw type is listed
/// under several categories the first one in name order wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryMap {
    categories: BTreeMap<String, Vec<String>>,
}

impl CategoryMap {
    pub fn new(categories: BTreeMap<String, Vec<String>>) -> Self {
        Self { categories }
    }

    /// The built-in small / medium / large mapping.
    pub fn defaults() -> Self {
        Self::new(parkvalet_core::config::default_categories())
    }

    /// Resolve a raw vehicle type to its category, `"unknown"` if none lists it.
    pub fn categorize(&self, raw_type: &str) -> Category {
        self.categories
            .iter()
            .find(|(_, types)| types.iter().any(|t| t == raw_type))
            .map(|(name, _)| Category::new(name.as_str()))
            .unwrap_or_else(Category::unknown)
    }

    pub fn categories(&self) -> &BTreeMap<String, Vec<String>> {
        &self.categories
    }

    /// Every raw type across all categories, in category then list order.
    pub fn raw_types(&self) -> impl Iterator<Item = &str> {
        self.categories.values().flatten().map(String::as_str)
    }
}
