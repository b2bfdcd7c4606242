//! Cast roster and name normalization.
//!
//! Wiki pages spell competitors several ways ("Aubry Bracco", "Aubry", a piped
//! link label). Every spelling is mapped onto one stable [`MemberKey`] through an
//! [`AliasTable`] loaded once per season.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for a competitor, used as the join key across records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberKey(String);

impl MemberKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Many-to-one mapping from observed name strings to canonical member keys.
///
/// Every canonical key also resolves to itself.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, MemberKey>,
}

impl AliasTable {
    /// Build a table from `(alias, canonical key)` pairs.
    pub fn new<I, A, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, K)>,
        A: Into<String>,
        K: Into<String>,
    {
        let mut aliases = HashMap::new();
        for (alias, key) in pairs {
            let key = MemberKey::new(key);
            aliases
                .entry(key.as_str().to_owned())
                .or_insert_with(|| key.clone());
            aliases.insert(alias.into().trim().to_owned(), key);
        }
        Self { aliases }
    }

    /// Resolve an observed name to its canonical key.
    ///
    /// Tries the trimmed full string first, then only its first
    /// whitespace-delimited token. Anything else is unresolved; no partial or
    /// fuzzy matching is attempted.
    ///
    /// ```
    /// use survivor_pool::roster::{AliasTable, MemberKey};
    ///
    /// let table = AliasTable::new([("Rick Devens", "Devens"), ("Rick", "Devens")]);
    /// assert_eq!(table.resolve("  Rick Devens "), Some(MemberKey::new("Devens")));
    /// assert_eq!(table.resolve("Rick Whoever"), Some(MemberKey::new("Devens")));
    /// assert_eq!(table.resolve("Nobody"), None);
    /// ```
    pub fn resolve(&self, observed: &str) -> Option<MemberKey> {
        let trimmed = observed.trim();
        if let Some(key) = self.aliases.get(trimmed) {
            return Some(key.clone());
        }

        let first = trimmed.split_whitespace().next()?;
        self.aliases.get(first).cloned()
    }

    /// Iterate over `(alias, key)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MemberKey)> {
        self.aliases.iter().map(|(alias, key)| (alias.as_str(), key))
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
