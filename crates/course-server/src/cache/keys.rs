//! Cache key generation.

use std::fmt;

/// Key of a cache entry, derived from the entity kind and either a record
/// identifier or the collection listing.
///
/// Record keys render as `kind:one:name` and listing keys as `kind:all`, so
/// a record named `all` never collides with the listing. Names are kept as
/// given; lookups are case sensitive like the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A single record.
    Record { kind: String, name: String },
    /// Every record of a kind.
    Listing { kind: String },
}

impl CacheKey {
    /// Key of the record named `name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use course_server::cache::CacheKey;
    ///
    /// let key = CacheKey::record("course", "algebra");
    /// assert_eq!(key.to_string(), "course:one:algebra");
    /// ```
    pub fn record(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Record {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Key of the listing of every record of `kind`.
    pub fn listing(kind: impl Into<String>) -> Self {
        Self::Listing { kind: kind.into() }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Record { kind, .. } | Self::Listing { kind } => kind,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record { kind, name } => write!(f, "{}:one:{}", kind, name),
            Self::Listing { kind } => write!(f, "{}:all", kind),
        }
    }
}
