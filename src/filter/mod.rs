//! Filters: named, composable byte transforms.
//!
//! ```text
//! filter/
//! ├── mod.rs        # Filter trait, FilterMode, FnFilter
//! ├── registry.rs   # FilterRegistry, FilterChain
//! └── builtin.rs    # minify-js, minify-css, banner, trim
//! ```

pub mod builtin;
mod registry;

pub use registry::{FilterChain, FilterRegistry};

use serde::{Deserialize, Serialize};

/// When a filter runs relative to input concatenation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    /// Runs on every input separately, before inputs are joined.
    PerInput,
    /// Runs once on the joined content.
    #[default]
    Combined,
}

/// A stateless transform over asset content.
pub trait Filter: Send + Sync {
    /// Transform `input` into the filtered bytes.
    fn apply(&self, input: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// Stage this filter runs in.
    fn mode(&self) -> FilterMode {
        FilterMode::Combined
    }

    /// Option identity folded into the cache key.
    ///
    /// Two instances registered under one name with different options must
    /// return different strings, otherwise stale cache entries are served.
    fn options(&self) -> String {
        String::new()
    }
}

/// Adapt a closure into a [`Filter`].
pub struct FnFilter<F> {
    func: F,
    mode: FilterMode,
    options: String,
}

impl<F> FnFilter<F>
where
    F: Fn(&[u8]) -> anyhow::Result<Vec<u8>> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            mode: FilterMode::Combined,
            options: String::new(),
        }
    }

    pub fn with_mode(mut self, mode: FilterMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }
}

impl<F> Filter for FnFilter<F>
where
    F: Fn(&[u8]) -> anyhow::Result<Vec<u8>> + Send + Sync,
{
    fn apply(&self, input: &[u8]) -> anyhow::Result<Vec<u8>> {
        (self.func)(input)
    }

    fn mode(&self) -> FilterMode {
        self.mode
    }

    fn options(&self) -> String {
        self.options.clone()
    }
}
