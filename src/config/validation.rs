use crate::config::types::{
    BudgetConfig, Config, ExtractionConfig, FetcherConfig, HarvesterConfig, ModelConfig,
    SeedConfig,
};
use crate::record::{Category, RecordField};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Placeholder the search URL template must contain
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvester_config(&config.harvester)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_budget_config(&config.budget)?;
    if config.model.enabled {
        validate_model_config(&config.model, &config.budget)?;
    }
    validate_extraction_config(&config.extraction)?;
    validate_seeds(&config.seeds, &config.fetcher)?;
    Ok(())
}

/// Validates harvest loop settings
fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    Ok(())
}

/// Validates fetch retry policy and transport settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.attempt_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "attempt_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(template) = &config.search_url_template {
        validate_search_template(template)?;
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(&proxy.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy url: {}", e)))?;
    }

    Ok(())
}

/// Validates that a search template has a placeholder and forms a web URL
fn validate_search_template(template: &str) -> Result<(), ConfigError> {
    if !template.contains(QUERY_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "search_url_template must contain {}, got '{}'",
            QUERY_PLACEHOLDER, template
        )));
    }

    let sample = template.replace(QUERY_PLACEHOLDER, "query");
    let url = Url::parse(&sample).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid search_url_template '{}': {}", template, e))
    })?;

    if !crate::url::is_web_url(&url) {
        return Err(ConfigError::Validation(format!(
            "search_url_template must use http or https, got '{}'",
            template
        )));
    }

    Ok(())
}

/// Validates budget gate limits
fn validate_budget_config(config: &BudgetConfig) -> Result<(), ConfigError> {
    if config.tokens_per_window < 1 {
        return Err(ConfigError::Validation(
            "tokens_per_window must be >= 1".to_string(),
        ));
    }

    if config.requests_per_window < 1 {
        return Err(ConfigError::Validation(
            "requests_per_window must be >= 1".to_string(),
        ));
    }

    if config.window_secs < 1 {
        return Err(ConfigError::Validation(
            "window_secs must be >= 1".to_string(),
        ));
    }

    if config.max_concurrent < 1 {
        return Err(ConfigError::Validation(
            "max_concurrent must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates model settings
fn validate_model_config(config: &ModelConfig, budget: &BudgetConfig) -> Result<(), ConfigError> {
    Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid model endpoint: {}", e)))?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation("model cannot be empty".to_string()));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api_key_env cannot be empty".to_string(),
        ));
    }

    if config.response_reserve >= config.context_tokens {
        return Err(ConfigError::Validation(format!(
            "response_reserve ({}) must be smaller than context_tokens ({})",
            config.response_reserve, config.context_tokens
        )));
    }

    if config.max_response_tokens < 1 {
        return Err(ConfigError::Validation(
            "max_response_tokens must be >= 1".to_string(),
        ));
    }

    if config.content_char_limit < 1 {
        return Err(ConfigError::Validation(
            "content_char_limit must be >= 1".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::Validation(format!(
            "temperature must be between 0.0 and 2.0, got {}",
            config.temperature
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    for field in &config.required_fields {
        if RecordField::parse(field).is_none() {
            return Err(ConfigError::Validation(format!(
                "Unknown required field '{}'",
                field
            )));
        }
    }

    if budget.tokens_per_window < u64::from(config.response_reserve) {
        tracing::warn!(
            "tokens_per_window ({}) is below response_reserve ({}); every model call will be skipped",
            budget.tokens_per_window,
            config.response_reserve
        );
    }

    Ok(())
}

/// Validates selector overrides
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    let lists = [
        &config.name_selectors,
        &config.phone_selectors,
        &config.email_selectors,
        &config.address_selectors,
    ];

    for selector in lists.into_iter().flatten().flatten() {
        Selector::parse(selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e))
        })?;
    }

    Ok(())
}

/// Validates seed URLs and query seeds
fn validate_seeds(seeds: &SeedConfig, fetcher: &FetcherConfig) -> Result<(), ConfigError> {
    if seeds.item_count() == 0 {
        return Err(ConfigError::Validation(
            "At least one seed url or location/category pair is required".to_string(),
        ));
    }

    for seed in &seeds.urls {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if !crate::url::is_web_url(&url) {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }
    }

    if seeds.locations.is_empty() != seeds.categories.is_empty() {
        return Err(ConfigError::Validation(
            "Seed locations and categories must be given together".to_string(),
        ));
    }

    for location in &seeds.locations {
        if location.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Seed locations cannot be empty".to_string(),
            ));
        }
    }

    for category in &seeds.categories {
        if Category::parse(category).is_none() {
            return Err(ConfigError::Validation(format!(
                "Seed category '{}' is not in the taxonomy",
                category
            )));
        }
    }

    if !seeds.locations.is_empty() && fetcher.search_url_template.is_none() {
        return Err(ConfigError::Validation(
            "Query seeds need fetcher.search_url_template".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ProxyConfig;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.seeds.urls = vec!["https://guide.example.com/wellness".to_string()];
        config
    }

    #[test]
    fn test_default_with_seed_is_valid() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_no_seeds_rejected() {
        let config = Config::default();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_workers_range() {
        let mut config = valid_config();
        config.harvester.workers = 0;
        assert!(validate(&config).is_err());

        config.harvester.workers = 65;
        assert!(validate(&config).is_err());

        config.harvester.workers = 64;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = valid_config();
        config.fetcher.max_attempts = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_search_template_needs_placeholder() {
        let mut config = valid_config();
        config.fetcher.search_url_template = Some("https://zk.example/search".to_string());
        assert!(validate(&config).is_err());

        config.fetcher.search_url_template =
            Some("https://zk.example/search?what={query}".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_proxy_url() {
        let mut config = valid_config();
        config.fetcher.proxy = Some(ProxyConfig {
            url: "not a url".to_string(),
            username_env: None,
            password_env: None,
        });
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut config = valid_config();
        config.budget.requests_per_window = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_reserve_must_fit_context() {
        let mut config = valid_config();
        config.model.response_reserve = 4096;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_model_checks_skipped_when_disabled() {
        let mut config = valid_config();
        config.model.enabled = false;
        config.model.endpoint = "not a url".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_required_field() {
        let mut config = valid_config();
        config.model.required_fields = vec!["favourite_colour".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_selector_override() {
        let mut config = valid_config();
        config.extraction.phone_selectors = Some(vec![".phone".to_string(), "[[".to_string()]);
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_non_web_seed_rejected() {
        let mut config = valid_config();
        config.seeds.urls = vec!["ftp://files.example.com/".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_query_seeds() {
        let mut config = Config::default();
        config.seeds.locations = vec!["Skopje".to_string()];
        config.seeds.categories = vec!["Massage".to_string()];
        // Missing template
        assert!(validate(&config).is_err());

        config.fetcher.search_url_template =
            Some("https://zk.example/search?what={query}".to_string());
        assert!(validate(&config).is_ok());

        config.seeds.categories = vec!["Bowling".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_locations_without_categories() {
        let mut config = valid_config();
        config.seeds.locations = vec!["Skopje".to_string()];
        assert!(validate(&config).is_err());
    }
}
