use crate::config::types::{ApiConfig, Config, HarvestConfig, NetworkConfig, OutputConfig, RateLimitConfig};
use crate::ConfigError;
use url::Url;

/// Longest pause accepted between scroll steps
const MAX_SCROLL_PAUSE_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_network_config(&config.network)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_harvest_config(&config.harvest)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;
    validate_http_url("web-url", &config.web_url)?;

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "api timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_network_config(config: &NetworkConfig) -> Result<(), ConfigError> {
    match config.proxy.as_deref().map(str::trim) {
        Some(proxy) if !proxy.is_empty() => {
            Url::parse(proxy)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
            Ok(())
        }
        _ => Ok(()),
    }
}

fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.window_seconds == 0 {
        return Err(ConfigError::Validation(
            "window-seconds must be >= 1".to_string(),
        ));
    }

    if !config.min_interval.is_finite() || config.min_interval < 0.0 {
        return Err(ConfigError::Validation(format!(
            "min-interval must be a non-negative number of seconds, got {}",
            config.min_interval
        )));
    }

    Ok(())
}

fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.stable_rounds == 0 {
        return Err(ConfigError::Validation(
            "stable-rounds must be >= 1".to_string(),
        ));
    }

    if config.scroll_pause_ms > MAX_SCROLL_PAUSE_MS {
        return Err(ConfigError::Validation(format!(
            "scroll-pause-ms must be <= {}ms, got {}ms",
            MAX_SCROLL_PAUSE_MS, config.scroll_pause_ms
        )));
    }

    if config.page_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "page-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.anchor_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "anchor-selector cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.media_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "media-dir cannot be empty".to_string(),
        ));
    }

    if config.report_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "report-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field,
            url.scheme()
        )));
    }

    Ok(())
}
