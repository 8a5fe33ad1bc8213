//! Work items: the units of crawl and query work

use crate::url::normalize_url;
use crate::UrlError;
use std::fmt;
use url::Url;

/// A unit of harvest work
///
/// A work item is either a page to visit or a directory search for a
/// category in a location. Its identity is [`WorkItem::key`], the canonical
/// string form used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkItem {
    /// A page URL, already in canonical form
    Url(Url),

    /// A (location, category) directory search
    ///
    /// `terms` holds a specific phrasing to search for; without one the
    /// category and location themselves are the search terms.
    Query {
        location: String,
        category: String,
        terms: Option<String>,
    },
}

impl WorkItem {
    /// Creates a URL work item, canonicalizing the URL
    pub fn url(url: &str) -> Result<Self, UrlError> {
        Ok(Self::Url(normalize_url(url)?))
    }

    /// Creates a query work item
    ///
    /// Surrounding whitespace is trimmed so that equivalent queries share
    /// an identity.
    pub fn query(location: &str, category: &str) -> Self {
        Self::Query {
            location: location.trim().to_string(),
            category: category.trim().to_string(),
            terms: None,
        }
    }

    /// Creates a query work item searched with a specific phrasing
    ///
    /// Blank terms fall back to a plain [`WorkItem::query`].
    pub fn search(location: &str, category: &str, terms: &str) -> Self {
        let terms = terms.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::Query {
            location: location.trim().to_string(),
            category: category.trim().to_string(),
            terms: Some(terms).filter(|t| !t.is_empty()),
        }
    }

    /// Returns the canonical identity string for this item
    ///
    /// URLs use their normalized form; queries use
    /// `query:<category>@<location>` lowercased, followed by `/<terms>` when
    /// the query has its own phrasing.
    pub fn key(&self) -> String {
        match self {
            Self::Url(url) => url.as_str().to_string(),
            Self::Query {
                location,
                category,
                terms: None,
            } => format!(
                "query:{}@{}",
                category.to_lowercase(),
                location.to_lowercase()
            ),
            Self::Query {
                location,
                category,
                terms: Some(terms),
            } => format!(
                "query:{}@{}/{}",
                category.to_lowercase(),
                location.to_lowercase(),
                terms.to_lowercase()
            ),
        }
    }

    /// Returns the URL for URL items
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Self::Url(url) => Some(url),
            Self::Query { .. } => None,
        }
    }

    /// Returns the location for query items
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Query { location, .. } => Some(location),
            Self::Url(_) => None,
        }
    }

    /// Returns the free-text search terms for query items
    pub fn search_terms(&self) -> Option<String> {
        match self {
            Self::Query {
                terms: Some(terms), ..
            } => Some(terms.clone()),
            Self::Query {
                location, category, ..
            } => Some(format!("{} {}", category, location)),
            Self::Url(_) => None,
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::Query {
                location,
                category,
                terms: None,
            } => write!(f, "{} in {}", category, location),
            Self::Query {
                location,
                category,
                terms: Some(terms),
            } => write!(f, "\"{}\" ({} in {})", terms, category, location),
        }
    }
}
