//! Typed "unknown vs known" field representation

use serde::{Serialize, Serializer};
use std::fmt;

/// Marker written to tabular sinks for fields that were never filled
pub const UNKNOWN_MARKER: &str = "unknown";

/// A record field that is either explicitly unknown or holds a value
///
/// `Unknown` is a typed state rather than a sentinel string, so a field that
/// literally contains the text "unknown" stays distinguishable from one that
/// was never found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Field<T> {
    /// No extractor has produced a value yet
    #[default]
    Unknown,

    /// A value produced by structured or fallback extraction
    Known(T),
}

impl<T> Field<T> {
    /// Returns true if the field has no value
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns true if the field holds a value
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Returns a reference to the value, if known
    pub fn as_known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown => None,
        }
    }

    /// Fills the field only if it is currently unknown
    ///
    /// Returns true if the field was filled. A known field is never
    /// overwritten.
    pub fn fill(&mut self, value: T) -> bool {
        if self.is_unknown() {
            *self = Self::Known(value);
            true
        } else {
            false
        }
    }
}

impl Field<String> {
    /// Builds a field from an optional string, treating blank text as unknown
    pub fn from_text(text: Option<&str>) -> Self {
        match text.map(str::trim) {
            Some(t) if !t.is_empty() => Self::Known(t.to_string()),
            _ => Self::Unknown,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Known(v),
            None => Self::Unknown,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(value) => write!(f, "{}", value),
            Self::Unknown => write!(f, "{}", UNKNOWN_MARKER),
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(value) => value.serialize(serializer),
            Self::Unknown => serializer.serialize_str(UNKNOWN_MARKER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unknown() {
        let field: Field<String> = Field::default();
        assert!(field.is_unknown());
        assert_eq!(field.to_string(), "unknown");
    }

    #[test]
    fn test_fill_only_when_unknown() {
        let mut field = Field::Known("+389 70 111 222".to_string());
        assert!(!field.fill("+389 2 999 999".to_string()));
        assert_eq!(field.as_known().map(String::as_str), Some("+389 70 111 222"));

        let mut empty: Field<String> = Field::Unknown;
        assert!(empty.fill("x".to_string()));
        assert!(empty.is_known());
    }

    #[test]
    fn test_from_text_blank_is_unknown() {
        assert!(Field::from_text(Some("   ")).is_unknown());
        assert!(Field::from_text(None).is_unknown());
        assert_eq!(
            Field::from_text(Some("  Skopje ")),
            Field::Known("Skopje".to_string())
        );
    }

    #[test]
    fn test_literal_unknown_text_is_known() {
        let field = Field::from_text(Some("unknown"));
        assert!(field.is_known());
    }
}
