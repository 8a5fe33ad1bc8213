//! Business category taxonomy
//!
//! Listings are classified into one of a fixed set of wellness categories.
//! Anything outside the taxonomy stays unknown on the record.

use serde::{Serialize, Serializer};
use std::fmt;

/// A category from the fixed taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Barbering,
    FaceBeauty,
    Nails,
    HairRemoval,
    Massage,
    BodyTreatments,
    CounselingMentalHealth,
    AntiAgingTreatments,
    WeightLossTreatments,
    DentistsDentalClinics,
}

impl Category {
    /// Every category, in taxonomy order
    pub const ALL: [Category; 10] = [
        Self::Barbering,
        Self::FaceBeauty,
        Self::Nails,
        Self::HairRemoval,
        Self::Massage,
        Self::BodyTreatments,
        Self::CounselingMentalHealth,
        Self::AntiAgingTreatments,
        Self::WeightLossTreatments,
        Self::DentistsDentalClinics,
    ];

    /// Returns the display label used in prompts and output files
    pub fn label(&self) -> &'static str {
        match self {
            Self::Barbering => "Barbering",
            Self::FaceBeauty => "Face Beauty",
            Self::Nails => "Nails",
            Self::HairRemoval => "Hair Removal",
            Self::Massage => "Massage",
            Self::BodyTreatments => "Body Treatments",
            Self::CounselingMentalHealth => "Counseling & Mental Health",
            Self::AntiAgingTreatments => "Anti-Aging Treatments",
            Self::WeightLossTreatments => "Weight Loss Treatments",
            Self::DentistsDentalClinics => "Dentists & Dental Clinics",
        }
    }

    /// Parses a category label
    ///
    /// Matching ignores case, punctuation and the difference between `&`
    /// and `and`. Returns None for labels outside the taxonomy.
    pub fn parse(label: &str) -> Option<Self> {
        let wanted = simplify(label);
        if wanted.is_empty() {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|category| simplify(category.label()) == wanted)
    }

    /// Returns the taxonomy as a comma separated list for prompts
    pub fn taxonomy_list() -> String {
        Self::ALL
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Lowercases and strips everything but letters and digits
fn simplify(label: &str) -> String {
    label
        .to_lowercase()
        .replace('&', " and ")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_label() {
        assert_eq!(Category::parse("Massage"), Some(Category::Massage));
    }

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!(
            Category::parse("counseling and mental health"),
            Some(Category::CounselingMentalHealth)
        );
        assert_eq!(
            Category::parse("  ANTI-AGING treatments "),
            Some(Category::AntiAgingTreatments)
        );
    }

    #[test]
    fn test_parse_unknown_label() {
        assert_eq!(Category::parse("Car Wash"), None);
        assert_eq!(Category::parse(""), None);
    }

    #[test]
    fn test_labels_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.label()), Some(category));
        }
    }
}
