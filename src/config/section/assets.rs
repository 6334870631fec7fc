//! `[[assets]]` (eager) and `[[formulae]]` (lazy) entries.
//!
//! ```toml
//! [[assets]]
//! name = "app.js"
//! inputs = ["js/a.js", "js/b.js"]
//! filters = ["jsmin"]
//! output = "js/app.js"
//!
//! [[formulae]]
//! name = "site.css"
//! inputs = ["css/*.css"]
//! filters = ["?cssmin"]       # output defaults to `assetkit/*.css`
//! ```

use serde::{Deserialize, Serialize};

use crate::asset::AssetDefinition;
use crate::config::ConfigDiagnostics;
use crate::lazy::{Formula, is_valid_output};

/// Eager assets are plain definitions.
pub type AssetEntry = AssetDefinition;

/// A named formula declared inline in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulaEntry {
    pub name: String,
    pub inputs: Vec<String>,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub output: Option<String>,
}

impl FormulaEntry {
    pub fn to_formula(&self, origin: &str) -> Formula {
        Formula {
            inputs: self.inputs.clone(),
            filters: self.filters.clone(),
            output: self.output.clone(),
            origin: origin.to_string(),
        }
    }

    pub fn validate(&self, index: usize, diag: &mut ConfigDiagnostics) {
        let field = format!("formulae[{index}]");
        check_name(&field, &self.name, diag);
        if let Some(output) = &self.output {
            check_output(&field, output, diag);
        }
    }
}

pub(crate) fn validate_asset(index: usize, asset: &AssetEntry, diag: &mut ConfigDiagnostics) {
    let field = format!("assets[{index}]");
    check_name(&field, &asset.name, diag);
    if asset.inputs.is_empty() {
        diag.error(format!("{field}.inputs"), "an asset needs at least one input");
    }
    check_output(&field, &asset.output, diag);
}

fn check_name(field: &str, name: &str, diag: &mut ConfigDiagnostics) {
    if name.trim().is_empty() {
        diag.error(format!("{field}.name"), "name must not be empty");
    }
}

fn check_output(field: &str, output: &str, diag: &mut ConfigDiagnostics) {
    if !is_valid_output(&output.replace("{name}", "name")) {
        diag.error_with_hint(
            format!("{field}.output"),
            format!("`{output}` must be a relative path inside the web root"),
            "remove leading `/` and any `..` components",
        );
    }
}
