//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    /// IANA timezone used for dates without an explicit offset
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub content_dir: String,
    pub public_dir: String,

    // Writing
    pub words_per_minute: usize,
    pub featured_count: usize,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Store
    #[serde(default)]
    pub cart: CartConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Folio".to_string(),
            description: String::new(),
            author: "John Doe".to_string(),
            language: "en".to_string(),
            timezone: String::new(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            content_dir: "content".to_string(),
            public_dir: "public".to_string(),

            words_per_minute: 200,
            featured_count: 3,
            highlight: HighlightConfig::default(),

            cart: CartConfig::default(),
            checkout: CheckoutConfig::default(),

            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// The configured timezone, if it names a known IANA zone
    pub fn tz(&self) -> Option<chrono_tz::Tz> {
        if self.timezone.trim().is_empty() {
            return None;
        }
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => Some(tz),
            Err(e) => {
                tracing::warn!("Ignoring unknown timezone {:?}: {}", self.timezone, e);
                None
            }
        }
    }

    /// Base URL for checkout redirects, falling back to the site url
    pub fn checkout_base_url(&self) -> String {
        self.checkout
            .base_url
            .clone()
            .unwrap_or_else(|| self.url.clone())
            .trim_end_matches('/')
            .to_string()
    }
}

/// Syntax highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub line_number: bool,
    pub theme: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            line_number: false,
            theme: "base16-ocean.dark".to_string(),
        }
    }
}

/// Persisted cart configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Directory (relative to the site root) holding persisted cart state
    pub storage_dir: String,
    pub storage_key: String,
    /// Product catalog (YAML list of products) relative to the site root
    pub catalog: String,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_dir: ".folio".to_string(),
            storage_key: "cart-storage".to_string(),
            catalog: "_products.yml".to_string(),
        }
    }
}

/// Hosted checkout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    pub base_url: Option<String>,
    pub api_base: String,
    /// Name of the environment variable holding the provider secret key
    pub secret_key_env: String,
    pub success_path: String,
    pub cancel_path: String,
    pub automatic_tax: bool,
    #[serde(default)]
    pub allowed_countries: Vec<String>,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_base: "https://api.stripe.com/v1".to_string(),
            secret_key_env: "STRIPE_SECRET_KEY".to_string(),
            success_path: "/checkout/success?session_id={CHECKOUT_SESSION_ID}".to_string(),
            cancel_path: "/checkout/cancelled".to_string(),
            automatic_tax: true,
            allowed_countries: vec!["US".to_string(), "CA".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.content_dir, "content");
        assert_eq!(config.words_per_minute, 200);
        assert_eq!(config.cart.storage_key, "cart-storage");
        assert_eq!(config.checkout.allowed_countries, vec!["US", "CA"]);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: Nina's Notes
author: Test User
url: https://example.com/
timezone: America/Chicago
checkout:
  automatic_tax: false
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "Nina's Notes");
        assert_eq!(config.author, "Test User");
        assert!(!config.checkout.automatic_tax);
        // Untouched nested fields keep their defaults
        assert_eq!(config.checkout.cancel_path, "/checkout/cancelled");
        assert_eq!(config.tz(), Some(chrono_tz::America::Chicago));
        assert_eq!(config.checkout_base_url(), "https://example.com");
    }

    #[test]
    fn test_unknown_timezone_is_ignored() {
        let config = SiteConfig {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert_eq!(config.tz(), None);
    }
}
