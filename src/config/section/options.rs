//! `[options]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [options]
//! debug = false                          # Disable the cache and optional filters
//! formulae_cache_dir = ".cache/assetkit" # Compiled-asset cache (`~` is expanded)
//! auto_dump_assets = true                # Dump after every served request
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Pipeline options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Recompile every asset on every dump and drop `?optional` filters.
    pub debug: bool,

    /// Compiled-asset cache directory. Caching is off when unset or in debug mode.
    pub formulae_cache_dir: Option<PathBuf>,

    /// Whether the after-request hook dumps assets.
    pub auto_dump_assets: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            debug: false,
            formulae_cache_dir: None,
            auto_dump_assets: true,
        }
    }
}

impl PipelineOptions {
    /// Whether the compiled-asset cache is in effect.
    pub fn caching_enabled(&self) -> bool {
        !self.debug && self.formulae_cache_dir.is_some()
    }
}
