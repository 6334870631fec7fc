//! `[templates]` section configuration.
//!
//! Enables the template formula loader.
//!
//! ```toml
//! [templates]
//! dir = "templates"
//! extensions = ["twig", "html"]
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Template root, relative to the config file.
    pub dir: PathBuf,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["twig".into(), "html".into()]
}
