//! folio-rs: a static site generator and storefront toolkit
//!
//! Loads a Markdown content tree (blog posts, pages, a home entry and audio
//! excerpts), expands shortcodes into components, writes the site with
//! embedded Tera templates, and keeps a persisted shopping cart that can be
//! handed to a hosted checkout.

pub mod cart;
pub mod checkout;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod render;
pub mod server;
pub mod shortcode;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// The main Folio application
#[derive(Debug, Clone)]
pub struct Folio {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content directory
    pub content_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Folio {
    /// Create a new Folio instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        let content_dir = base_dir.join(&config.content_dir);
        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            content_dir,
            public_dir,
        })
    }

    /// Path of the product catalog
    pub fn catalog_path(&self) -> PathBuf {
        self.base_dir.join(&self.config.cart.catalog)
    }

    /// Directory holding the persisted cart
    pub fn cart_dir(&self) -> PathBuf {
        self.base_dir.join(&self.config.cart.storage_dir)
    }

    /// Generate the static site
    pub fn generate(&self) -> Result<()> {
        commands::generate::run(self)
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
