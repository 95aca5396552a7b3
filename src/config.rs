//! Configuration for the schema resolver
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (resolver.toml)
//! - Environment variables (RESOLVER__*)
//!
//! ## Example config file (resolver.toml):
//! ```toml
//! [catalog]
//! path = "./schemas"
//!
//! [resolution]
//! expansion = "inline"
//!
//! [cache]
//! enabled = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::definitions::ExpansionPolicy;
use crate::resolver::ResolverOptions;

/// Main configuration for the resolver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Where formats and definitions are read from
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Resolution settings
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog directory; the embedded catalog is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Resolution configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// How shared definition references are emitted
    #[serde(default)]
    pub expansion: ExpansionPolicy,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Memoize resolved trees per (format, version)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ResolverConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["resolver.toml", ".resolver.toml", "config/resolver.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "bedrock", "schemas") {
            let xdg_config = config_dir.config_dir().join("resolver.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // RESOLVER__CACHE__ENABLED=false and friends
        builder = builder.add_source(
            Environment::with_prefix("RESOLVER")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            expansion: self.resolution.expansion,
            cache_enabled: self.cache.enabled,
        }
    }

    /// Catalog directory, resolved against the working directory
    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.catalog.path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                std::env::current_dir().unwrap_or_default().join(p)
            }
        })
    }
}
