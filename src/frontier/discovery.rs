//! Link discovery for growing the frontier
//!
//! This module handles parsing fetched HTML to find candidate work items:
//! - Links from `<a href>` tags and canonical links
//! - Resolution of relative links against the page URL
//! - A pluggable relevance predicate deciding which links are in scope

use crate::frontier::WorkItem;
use scraper::{Html, Selector};
use url::Url;

/// Decides whether a discovered link is worth visiting
///
/// Implementations see the canonical URL. Any `Fn(&Url) -> bool` closure
/// is a policy as well.
pub trait DiscoveryPolicy: Send + Sync {
    /// Returns true if the link should be pushed onto the frontier
    fn is_in_scope(&self, url: &Url) -> bool;
}

impl<F> DiscoveryPolicy for F
where
    F: Fn(&Url) -> bool + Send + Sync,
{
    fn is_in_scope(&self, url: &Url) -> bool {
        self(url)
    }
}

/// Substring relevance filter
///
/// A link is in scope when its canonical form contains any of the
/// keywords, compared case-insensitively. With no keywords nothing is in
/// scope, which limits a run to its seeds.
#[derive(Debug, Clone)]
pub struct KeywordDiscovery {
    keywords: Vec<String>,
}

impl KeywordDiscovery {
    /// Creates a policy from a keyword list; blank keywords are ignored
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Returns the configured keywords
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl DiscoveryPolicy for KeywordDiscovery {
    fn is_in_scope(&self, url: &Url) -> bool {
        let candidate = url.as_str().to_lowercase();
        self.keywords.iter().any(|k| candidate.contains(k.as_str()))
    }
}

/// Extracts in-scope work items from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links
/// - Relative links when no base URL is known
/// - Links the policy rejects
///
/// Results are deduplicated and keep document order.
pub fn discover_items(
    html: &str,
    base_url: Option<&Url>,
    policy: &dyn DiscoveryPolicy,
) -> Vec<WorkItem> {
    let document = Html::parse_document(html);
    let mut items: Vec<WorkItem> = Vec::new();

    for href in collect_hrefs(&document) {
        let Some(absolute) = resolve_link(&href, base_url) else {
            continue;
        };

        let item = match WorkItem::url(&absolute) {
            Ok(item) => item,
            Err(e) => {
                tracing::trace!("Ignoring link {}: {}", absolute, e);
                continue;
            }
        };

        let in_scope = item.as_url().is_some_and(|url| policy.is_in_scope(url));
        if in_scope && !items.contains(&item) {
            items.push(item);
        }
    }

    items
}

/// Collects raw href values in document order
fn collect_hrefs(document: &Html) -> Vec<String> {
    let mut hrefs = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                hrefs.push(href.to_string());
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                hrefs.push(href.to_string());
            }
        }
    }

    hrefs
}

/// Resolves a link href to an absolute HTTP(S) URL string
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: Option<&Url>) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = match base_url {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };

    if crate::url::is_web_url(&resolved) {
        Some(resolved.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://guide.example.com/wellness/index").unwrap()
    }

    fn wellness() -> KeywordDiscovery {
        KeywordDiscovery::new(["wellness"])
    }

    #[test]
    fn test_keyword_filter() {
        let html = r#"<html><body>
            <a href="https://guide.example.com/wellness/spa-one">Spa</a>
            <a href="https://guide.example.com/wellness/spa-two">Spa</a>
            <a href="https://guide.example.com/restaurants/grill">Grill</a>
        </body></html>"#;
        let items = discover_items(html, Some(&base_url()), &wellness());
        let keys: Vec<String> = items.iter().map(|i| i.key()).collect();
        assert_eq!(
            keys,
            vec![
                "https://guide.example.com/wellness/spa-one",
                "https://guide.example.com/wellness/spa-two",
            ]
        );
    }

    #[test]
    fn test_relative_links_resolved() {
        let html = r#"<a href="/wellness/aura-spa">Aura</a><a href="studio">Studio</a>"#;
        let items = discover_items(html, Some(&base_url()), &wellness());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key(), "https://guide.example.com/wellness/aura-spa");
        assert_eq!(items[1].key(), "https://guide.example.com/wellness/studio");
    }

    #[test]
    fn test_relative_links_dropped_without_base() {
        let html = r#"<a href="/wellness/aura-spa">Aura</a>"#;
        let items = discover_items(html, None, &wellness());
        assert!(items.is_empty());
    }

    #[test]
    fn test_skips_special_schemes() {
        let html = r##"
            <a href="javascript:void(0)">x</a>
            <a href="mailto:wellness@example.com">x</a>
            <a href="tel:+38970000000">x</a>
            <a href="#wellness">x</a>
            <a href="/wellness/file.pdf" download>x</a>
        "##;
        let items = discover_items(html, Some(&base_url()), &wellness());
        assert!(items.is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let html = r#"
            <a href="/wellness/spa">1</a>
            <a href="/wellness/spa/">2</a>
            <a href="/wellness/spa#hours">3</a>
        "#;
        let items = discover_items(html, Some(&base_url()), &wellness());
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_closure_policy() {
        let html = r#"<a href="https://a.example/x">a</a><a href="https://b.example/y">b</a>"#;
        let only_b = |url: &Url| url.host_str() == Some("b.example");
        let items = discover_items(html, None, &only_b);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key(), "https://b.example/y");
    }

    #[test]
    fn test_empty_keywords_discover_nothing() {
        let html = r#"<a href="https://guide.example.com/wellness/spa">Spa</a>"#;
        let policy = KeywordDiscovery::new(Vec::<String>::new());
        assert!(discover_items(html, None, &policy).is_empty());
    }
}
