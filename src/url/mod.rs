//! URL handling module
//!
//! This module provides the canonical URL form used to identify work items
//! and decide whether two links point at the same page.

mod normalize;

pub use normalize::normalize_url;

use ::url::Url;

/// Returns true if the URL uses a scheme the fetch transport can visit
pub fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
