//! Configuration module for Note-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The loaded [`Config`] is an explicit value handed to the crawl engine at
//! submission time; nothing here is process-global.
//!
//! # Example
//!
//! ```no_run
//! use note_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Record cap: {}", config.crawl.max_notes);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, AuthConfig, Config, CrawlConfig, HarvestConfig, NetworkConfig, OutputConfig,
    RateLimitConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, COOKIES_ENV_VAR,
};
pub use validation::validate;
