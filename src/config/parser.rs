use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable that overrides `[auth] cookies`
pub const COOKIES_ENV_VAR: &str = "NOTE_HARVESTER_COOKIES";

/// Loads and parses a configuration file from the given path
///
/// The cookie string from the environment (if set and non-empty) replaces the
/// one in the file, so credentials can stay out of the configuration.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use note_harvester::config::load_config;
///
/// let config = load_config(Path::new("harvester.toml")).unwrap();
/// println!("Scroll pause: {}ms", config.harvest.scroll_pause_ms);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;

    if let Ok(cookies) = std::env::var(COOKIES_ENV_VAR) {
        apply_cookie_override(&mut config, &cookies);
    }

    validate(&config)?;

    Ok(config)
}

/// Parses configuration text without touching the environment
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

fn apply_cookie_override(config: &mut Config, cookies: &str) {
    let cookies = cookies.trim();
    if !cookies.is_empty() {
        config.auth.cookies = cookies.to_string();
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a crawl can be matched to the settings it ran with.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
