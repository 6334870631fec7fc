//! Asset definitions and output templates.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// Input prefix referencing another registered asset (`@jquery`).
pub const REFERENCE_PREFIX: char = '@';

/// A named asset: ordered inputs, ordered filter names and an output template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDefinition {
    pub name: String,
    pub inputs: Vec<String>,
    #[serde(default)]
    pub filters: Vec<String>,
    pub output: String,
}

impl AssetDefinition {
    pub fn new(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            filters: Vec::new(),
            output: output.into(),
        }
    }

    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.extend(filters.into_iter().map(Into::into));
        self
    }

    /// Names of assets referenced with `@name` inputs.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .filter_map(|i| i.strip_prefix(REFERENCE_PREFIX))
    }

    /// Render the output template into a path relative to the web root.
    ///
    /// `{name}` becomes the asset name and `*` becomes `fingerprint`.
    pub fn render_output(&self, fingerprint: &str) -> Result<PathBuf, AssetError> {
        let rendered = self
            .output
            .replace("{name}", &self.name)
            .replace('*', fingerprint);
        check_relative(&rendered).ok_or_else(|| AssetError::InvalidOutput {
            output: self.output.clone(),
        })
    }
}

/// Accept only non-empty relative paths without `..`, root or prefix parts.
pub fn check_relative(path: &str) -> Option<PathBuf> {
    let path = Path::new(path);
    let mut has_normal = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => has_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    has_normal.then(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let def = AssetDefinition::new("app.js", "js/app.js")
            .inputs(["js/a.js", "js/b.js"])
            .filter("jsmin");
        assert_eq!(def.inputs, ["js/a.js", "js/b.js"]);
        assert_eq!(def.filters, ["jsmin"]);
    }

    #[test]
    fn test_render_output_placeholders() {
        let def = AssetDefinition::new("site", "css/{name}-*.css");
        let path = def.render_output("1a2b3c4d").unwrap();
        assert_eq!(path, PathBuf::from("css/site-1a2b3c4d.css"));
    }

    #[test]
    fn test_render_output_rejects_escape() {
        for output in ["../outside.js", "/etc/passwd", "", "./"] {
            let def = AssetDefinition::new("x", output);
            assert!(
                matches!(def.render_output("0"), Err(AssetError::InvalidOutput { .. })),
                "{output} should be rejected"
            );
        }
    }

    #[test]
    fn test_references() {
        let def = AssetDefinition::new("all", "all.js").inputs(["@jquery", "js/app.js", "@ui"]);
        assert_eq!(def.references().collect::<Vec<_>>(), ["jquery", "ui"]);
    }
}
