//! The normalized business record produced for each harvested work item

use crate::record::field::{Field, UNKNOWN_MARKER};
use crate::record::Category;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Name given to records whose name could not be extracted
pub const NAME_SENTINEL: &str = "Unknown";

/// Column headers for tabular sinks, in row order
pub const RECORD_HEADERS: [&str; 11] = [
    "business_name",
    "category",
    "source_url",
    "website",
    "address",
    "phone",
    "email",
    "social_links",
    "description",
    "location",
    "harvested_at",
];

/// A named record field, used for "required field" policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Name,
    Category,
    Website,
    Address,
    Phone,
    Email,
    SocialLinks,
    Description,
}

impl RecordField {
    /// Parses a config-file field name
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "name" | "business_name" => Some(Self::Name),
            "category" => Some(Self::Category),
            "website" => Some(Self::Website),
            "address" => Some(Self::Address),
            "phone" => Some(Self::Phone),
            "email" => Some(Self::Email),
            "social_links" | "social_media" => Some(Self::SocialLinks),
            "description" => Some(Self::Description),
            _ => None,
        }
    }

    /// Returns the snake_case name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Category => "category",
            Self::Website => "website",
            Self::Address => "address",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::SocialLinks => "social_links",
            Self::Description => "description",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized output entity for one discovered business
///
/// `name` is never empty: an unextracted name reads as [`NAME_SENTINEL`]
/// but is tracked separately, so a business literally named "Unknown"
/// still counts as known. Every other field is typed so that "not found"
/// is an explicit state. Once a record is accumulated the only permitted
/// mutation is filling unknown fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessRecord {
    pub name: String,
    pub category: Field<Category>,
    pub source_url: String,
    pub website: Field<String>,
    pub address: Field<String>,
    pub phone: Field<String>,
    pub email: Field<String>,
    /// Platform name (e.g. "Facebook") to profile URL
    pub social_links: BTreeMap<String, String>,
    pub description: Field<String>,
    /// Location a search query was run for, if the item was a query
    pub location: Field<String>,
    pub harvested_at: DateTime<Utc>,
    #[serde(skip)]
    name_extracted: bool,
}

impl BusinessRecord {
    /// Creates a record with every optional field unknown
    ///
    /// A missing or blank name is replaced with [`NAME_SENTINEL`].
    pub fn new(name: Option<&str>, source_url: impl Into<String>) -> Self {
        let (name, name_extracted) = match name.map(str::trim) {
            Some(n) if !n.is_empty() => (n.to_string(), true),
            _ => (NAME_SENTINEL.to_string(), false),
        };

        Self {
            name,
            category: Field::Unknown,
            source_url: source_url.into(),
            website: Field::Unknown,
            address: Field::Unknown,
            phone: Field::Unknown,
            email: Field::Unknown,
            social_links: BTreeMap::new(),
            description: Field::Unknown,
            location: Field::Unknown,
            harvested_at: Utc::now(),
            name_extracted,
        }
    }

    /// Returns true if the name was never extracted
    pub fn has_sentinel_name(&self) -> bool {
        !self.name_extracted
    }

    /// Returns true if the given field has no value
    pub fn is_unknown(&self, field: RecordField) -> bool {
        match field {
            RecordField::Name => self.has_sentinel_name(),
            RecordField::Category => self.category.is_unknown(),
            RecordField::Website => self.website.is_unknown(),
            RecordField::Address => self.address.is_unknown(),
            RecordField::Phone => self.phone.is_unknown(),
            RecordField::Email => self.email.is_unknown(),
            RecordField::SocialLinks => self.social_links.is_empty(),
            RecordField::Description => self.description.is_unknown(),
        }
    }

    /// Returns the subset of `fields` that are still unknown
    pub fn unknown_fields(&self, fields: &[RecordField]) -> Vec<RecordField> {
        fields
            .iter()
            .copied()
            .filter(|f| self.is_unknown(*f))
            .collect()
    }

    /// Fills the name if it was never extracted
    pub fn fill_name(&mut self, name: &str) -> bool {
        let name = name.trim();
        if self.has_sentinel_name() && !name.is_empty() {
            self.name = name.to_string();
            self.name_extracted = true;
            true
        } else {
            false
        }
    }

    /// Adds a social link for a platform that has none yet
    pub fn fill_social_link(&mut self, platform: &str, url: &str) -> bool {
        if self.social_links.contains_key(platform) || url.trim().is_empty() {
            return false;
        }
        self.social_links
            .insert(platform.to_string(), url.trim().to_string());
        true
    }

    /// Flattens the record into a row matching [`RECORD_HEADERS`]
    pub fn to_row(&self) -> Vec<String> {
        let social_links = if self.social_links.is_empty() {
            UNKNOWN_MARKER.to_string()
        } else {
            self.social_links
                .iter()
                .map(|(platform, url)| format!("{}={}", platform, url))
                .collect::<Vec<_>>()
                .join("; ")
        };

        vec![
            self.name.clone(),
            self.category.to_string(),
            self.source_url.clone(),
            self.website.to_string(),
            self.address.to_string(),
            self.phone.to_string(),
            self.email.to_string(),
            social_links,
            self.description.to_string(),
            self.location.to_string(),
            self.harvested_at.to_rfc3339(),
        ]
    }
}
