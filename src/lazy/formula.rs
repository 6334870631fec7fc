//! Raw asset formulae and their promotion to definitions.

use serde::{Deserialize, Serialize};

use crate::asset::{AssetDefinition, check_relative};
use crate::error::AssetError;

/// Output used when a formula does not name one.
const DEFAULT_OUTPUT_DIR: &str = "assetkit";

/// A not-yet-validated asset descriptor.
///
/// Formulae come from configuration, an external mapping file, or template
/// scanning. Nothing is checked until the formula is first resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Formula {
    pub inputs: Vec<String>,
    pub filters: Vec<String>,
    pub output: Option<String>,
    /// Where the formula was found (for diagnostics).
    #[serde(skip)]
    pub origin: String,
}

impl Formula {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Validate and promote into an [`AssetDefinition`].
    pub fn to_definition(&self, name: &str) -> Result<AssetDefinition, AssetError> {
        let invalid = |reason: String| AssetError::InvalidFormula {
            name: name.to_string(),
            reason,
        };

        if self.inputs.is_empty() {
            return Err(invalid("no inputs".into()));
        }
        if let Some(i) = self.inputs.iter().position(|s| s.trim().is_empty()) {
            return Err(invalid(format!("input #{i} is empty")));
        }
        if let Some(i) = self.filters.iter().position(|s| s.trim().is_empty()) {
            return Err(invalid(format!("filter #{i} is empty")));
        }

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| default_output(&self.inputs[0]));
        let definition = AssetDefinition {
            name: name.to_string(),
            inputs: self.inputs.clone(),
            filters: self.filters.clone(),
            output,
        };

        // Placeholders are checked with a dummy fingerprint
        definition
            .render_output("0")
            .map_err(|_| invalid(format!("output `{}` escapes the web root", definition.output)))?;
        Ok(definition)
    }
}

/// `assetkit/*.<ext>` using the first input's extension.
fn default_output(first_input: &str) -> String {
    let ext = std::path::Path::new(first_input)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.contains('*'));
    match ext {
        Some(ext) => format!("{DEFAULT_OUTPUT_DIR}/*.{ext}"),
        None => format!("{DEFAULT_OUTPUT_DIR}/*"),
    }
}

/// Check a relative output without placeholders (used by config validation).
pub fn is_valid_output(output: &str) -> bool {
    check_relative(&output.replace('*', "0")).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_definition() {
        let formula = Formula::new(["css/a.css", "css/b.css"])
            .with_filters(["cssmin"])
            .with_output("css/site.css");
        let def = formula.to_definition("site").unwrap();
        assert_eq!(def.name, "site");
        assert_eq!(def.inputs, ["css/a.css", "css/b.css"]);
        assert_eq!(def.output, "css/site.css");
    }

    #[test]
    fn test_default_output_uses_extension() {
        let def = Formula::new(["js/app.js"]).to_definition("app").unwrap();
        assert_eq!(def.output, "assetkit/*.js");

        let def = Formula::new(["js/*"]).to_definition("all").unwrap();
        assert_eq!(def.output, "assetkit/*");
    }

    #[test]
    fn test_invalid_formulae() {
        let cases = [
            Formula::default(),
            Formula::new([""]),
            Formula::new(["a.js"]).with_filters([" "]),
            Formula::new(["a.js"]).with_output("../escape.js"),
        ];
        for formula in cases {
            assert!(matches!(
                formula.to_definition("x"),
                Err(AssetError::InvalidFormula { .. })
            ));
        }
    }

    #[test]
    fn test_deserialize_partial() {
        let formula: Formula = toml::from_str(r#"inputs = ["a.css"]"#).unwrap();
        assert_eq!(formula.inputs, ["a.css"]);
        assert!(formula.filters.is_empty());
        assert!(formula.output.is_none());
    }
}
