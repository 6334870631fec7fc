//! Pipeline configuration from `assetkit.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Section definitions
//! │   ├── assets     # [[assets]], [[formulae]]
//! │   ├── filters    # [[filters]]
//! │   ├── options    # [options]
//! │   ├── serve      # [serve]
//! │   └── templates  # [templates]
//! ├── error.rs       # ConfigError, ConfigDiagnostics
//! ├── util.rs        # config discovery, path expansion
//! └── mod.rs         # PipelineConfig (this file)
//! ```
//!
//! # Top-level keys
//!
//! | Key             | Purpose                                          |
//! |-----------------|--------------------------------------------------|
//! | `web`           | Web root, where dumped assets are written        |
//! | `source`        | Root for asset inputs (default: config dir)      |
//! | `formulae_file` | JSON mapping of name -> formula (lazy assets)    |

mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use section::{
    AssetEntry, FilterEntry, FormulaEntry, PipelineOptions, ServeConfig, TemplatesConfig,
};
pub use util::find_config_file;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::filter::FilterRegistry;
use crate::lazy::Formula;
use crate::log;

/// Default config file name.
pub const CONFIG_FILE: &str = "assetkit.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing `assetkit.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory holding the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub web: PathBuf,

    #[serde(default = "default_source")]
    pub source: PathBuf,

    #[serde(default)]
    pub formulae_file: Option<PathBuf>,

    #[serde(default)]
    pub options: PipelineOptions,

    #[serde(default)]
    pub filters: Vec<FilterEntry>,

    #[serde(default)]
    pub assets: Vec<AssetEntry>,

    #[serde(default)]
    pub formulae: Vec<FormulaEntry>,

    #[serde(default)]
    pub templates: Option<TemplatesConfig>,

    #[serde(default)]
    pub serve: ServeConfig,
}

fn default_source() -> PathBuf {
    PathBuf::from(".")
}

impl PipelineConfig {
    /// Find `config_name` upward from the cwd, parse, validate and
    /// normalize it.
    pub fn load(config_name: &Path) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let Some(config_path) = find_config_file(config_name, &cwd) else {
            bail!(
                "config file `{}` not found in `{}` or any parent directory",
                config_name.display(),
                cwd.display()
            );
        };
        Self::from_path(&config_path)
    }

    /// Load a specific config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.validate()?;

        let config_path = crate::utils::path::normalize_path(path);
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.config_path = config_path;
        config.normalize_paths(&root);
        Ok(config)
    }

    /// Parse configuration from a TOML string, without path normalization.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} ignored: {}", display_path, fields.join(", "));
    }

    // ========================================================================
    // paths
    // ========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve every configured path against `root`.
    fn normalize_paths(&mut self, root: &Path) {
        let root = crate::utils::path::normalize_path(root);

        self.web = util::expand_path(&self.web, &root);
        self.source = util::expand_path(&self.source, &root);
        if let Some(file) = self.formulae_file.take() {
            self.formulae_file = Some(util::expand_path(&file, &root));
        }
        if let Some(dir) = self.options.formulae_cache_dir.take() {
            self.options.formulae_cache_dir = Some(util::expand_path(&dir, &root));
        }
        if let Some(templates) = self.templates.as_mut() {
            templates.dir = util::expand_path(&templates.dir, &root);
        }
        self.root = root;
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate raw (not yet normalized) values, reporting all errors at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        if self.web.as_os_str().is_empty() {
            diag.error_with_hint("web", "web root must be set", "add `web = \"web\"`");
        }
        for (i, filter) in self.filters.iter().enumerate() {
            filter.validate(i, &mut diag);
        }
        for (i, asset) in self.assets.iter().enumerate() {
            section::validate_asset(i, asset, &mut diag);
        }
        for (i, formula) in self.formulae.iter().enumerate() {
            formula.validate(i, &mut diag);
        }
        self.warn_unknown_filters(&mut diag);

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Filter names used by entries but never declared in `[[filters]]`.
    ///
    /// Only a warning: embedding applications may register more filters.
    fn warn_unknown_filters(&self, diag: &mut ConfigDiagnostics) {
        let declared = |name: &str| {
            let name = name.strip_prefix('?').unwrap_or(name);
            self.filters.iter().any(|f| f.name == name)
        };
        let used = self
            .assets
            .iter()
            .map(|a| (format!("assets `{}`", a.name), &a.filters))
            .chain(
                self.formulae
                    .iter()
                    .map(|f| (format!("formulae `{}`", f.name), &f.filters)),
            );
        for (owner, filters) in used {
            for name in filters.iter().filter(|n| !declared(n)) {
                diag.warn(owner.clone(), format!("filter `{name}` is not declared in [[filters]]"));
            }
        }
    }

    // ========================================================================
    // pipeline inputs
    // ========================================================================

    /// Register every `[[filters]]` entry.
    pub fn register_filters(&self, registry: &FilterRegistry) {
        for entry in &self.filters {
            registry.register_arc(entry.name.clone(), entry.build());
        }
    }

    /// Inline `[[formulae]]` followed by the `formulae_file` mapping.
    pub fn load_formulae(&self) -> Result<Vec<(String, Formula)>, ConfigError> {
        let origin = self
            .config_path
            .file_name()
            .map_or_else(|| CONFIG_FILE.to_string(), |n| n.to_string_lossy().into_owned());
        let mut formulae: Vec<(String, Formula)> = self
            .formulae
            .iter()
            .map(|entry| (entry.name.clone(), entry.to_formula(&origin)))
            .collect();

        if let Some(path) = &self.formulae_file {
            formulae.extend(read_formulae_file(path)?);
        }
        Ok(formulae)
    }
}

/// Read a JSON `{ "name": { "inputs": [...], ... } }` mapping, keeping order.
fn read_formulae_file(path: &Path) -> Result<Vec<(String, Formula)>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&content).map_err(|e| ConfigError::Formulae(path.to_path_buf(), e))?;

    let origin = path.display().to_string();
    map.into_iter()
        .map(|(name, value)| {
            let formula: Formula = serde_json::from_value(value)
                .map_err(|e| ConfigError::Formulae(path.to_path_buf(), e))?;
            Ok((name, formula.with_origin(origin.clone())))
        })
        .collect()
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config without normalization.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PipelineConfig {
    let (parsed, ignored) = PipelineConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(PipelineConfig::from_str("[options\ndebug = true").is_err());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "web = \"web\"\n[options]\ndebgu = true";
        let (config, ignored) = PipelineConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.web, PathBuf::from("web"));
        assert!(ignored.iter().any(|f| f.contains("debgu")));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let config = test_parse_config(
            r#"
[[assets]]
name = ""
inputs = []
output = "/abs.js"
"#,
        );
        let err = config.validate().unwrap_err();
        let Some(ConfigError::Diagnostics(diag)) = err.downcast_ref::<ConfigError>() else {
            panic!("expected diagnostics, got {err}");
        };
        // web + name + inputs + output
        assert_eq!(diag.errors().len(), 4);
    }

    #[test]
    fn test_from_path_normalizes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "web = \"public\"\nsource = \"assets\"\n[options]\nformulae_cache_dir = \".cache\"\n",
        )
        .unwrap();

        let config = PipelineConfig::from_path(&path).unwrap();
        assert!(config.web.is_absolute());
        assert!(config.web.ends_with("public"));
        assert!(config.source.ends_with("assets"));
        assert!(config.options.formulae_cache_dir.as_ref().unwrap().ends_with(".cache"));
        assert_eq!(config.root(), config.config_path.parent().unwrap());
    }

    #[test]
    fn test_formulae_file_keeps_order() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("formulae.json");
        fs::write(
            &json,
            r#"{"zeta": {"inputs": ["z.js"]}, "alpha": {"inputs": ["a.css"], "filters": ["cssmin"]}}"#,
        )
        .unwrap();

        let mut config = test_parse_config(
            "web = \"web\"\n[[formulae]]\nname = \"inline\"\ninputs = [\"i.js\"]",
        );
        config.formulae_file = Some(json);

        let names: Vec<_> = config
            .load_formulae()
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["inline", "zeta", "alpha"]);
    }

    #[test]
    fn test_formulae_file_invalid() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("formulae.json");
        fs::write(&json, r#"["not", "a", "map"]"#).unwrap();

        let mut config = test_parse_config("web = \"web\"");
        config.formulae_file = Some(json);
        assert!(matches!(config.load_formulae(), Err(ConfigError::Formulae(..))));
    }

    #[test]
    fn test_register_filters() {
        let config = test_parse_config(
            "web = \"web\"\n[[filters]]\nname = \"t\"\nkind = \"trim\"",
        );
        let registry = FilterRegistry::new();
        config.register_filters(&registry);
        assert!(registry.has("t"));
    }
}
