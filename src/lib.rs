//! spacetraveling: a statically generated blog backed by a headless CMS
//!
//! Posts are fetched from a Prismic-compatible REST API, normalized into a
//! stable schema and rendered with embedded Tera templates.

pub mod cache;
pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod listing;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cms::{ContentStore, PrismicClient};

/// The blog site rooted at a directory
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets copied verbatim into the output
    pub static_dir: PathBuf,
    /// Language files
    pub i18n_dir: PathBuf,
}

impl Blog {
    /// Load `_config.yml` and `.env` from a directory
    ///
    /// Environment variables take precedence over the config file.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        if dotenvy::from_path(base_dir.join(".env")).is_ok() {
            tracing::debug!("Loaded .env from {:?}", base_dir);
        }
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Build a site from an already loaded configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let i18n_dir = base_dir.join(&config.i18n_dir);

        Self {
            config,
            base_dir,
            public_dir,
            static_dir,
            i18n_dir,
        }
    }

    /// The CMS client configured for this site
    pub fn content_store(&self) -> Result<Arc<dyn ContentStore>> {
        Ok(Arc::new(PrismicClient::new(&self.config.cms)?))
    }

    /// Generate the static site
    pub async fn generate(&self, all: bool) -> Result<()> {
        commands::generate::run(self, all).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_new_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("_config.yml"),
            "title: Blog\npublic_dir: out\ncms:\n  endpoint: https://blog.cdn.prismic.io/api/v2\n",
        )
        .unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.config.title, "Blog");
        assert_eq!(blog.public_dir, dir.path().join("out"));
        assert_eq!(blog.static_dir, dir.path().join("static"));
    }

    #[test]
    fn test_content_store_requires_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::with_config(dir.path(), config::SiteConfig::default());
        assert!(blog.content_store().is_err());
    }
}
