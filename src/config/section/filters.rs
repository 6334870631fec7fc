//! `[[filters]]` entries: named instances of built-in filters.
//!
//! ```toml
//! [[filters]]
//! name = "jsmin"
//! kind = "minify-js"
//!
//! [[filters]]
//! name = "license"
//! kind = "banner"
//! text = "/* (c) example */"
//! mode = "per-input"          # optional, overrides the kind's stage
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::filter::builtin::{self, BuiltinKind};
use crate::filter::{Filter, FilterMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterEntry {
    pub name: String,
    pub kind: BuiltinKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub mode: Option<FilterMode>,
}

impl FilterEntry {
    pub fn build(&self) -> Arc<dyn Filter> {
        builtin::create(self.kind, self.text.as_deref(), self.mode)
    }

    pub fn validate(&self, index: usize, diag: &mut ConfigDiagnostics) {
        let field = format!("filters[{index}]");
        if self.name.trim().is_empty() {
            diag.error(format!("{field}.name"), "filter name must not be empty");
        }
        if self.name.starts_with('?') {
            diag.error_with_hint(
                format!("{field}.name"),
                "`?` marks optional filters in asset lists, not in filter names",
                format!("name the filter `{}`", self.name.trim_start_matches('?')),
            );
        }
        match (self.kind, &self.text) {
            (BuiltinKind::Banner, None) => {
                diag.error(format!("{field}.text"), "`banner` filters need a `text`");
            }
            (kind, Some(_)) if kind != BuiltinKind::Banner => {
                diag.warn(format!("{field}.text"), format!("ignored by `{}`", kind.as_str()));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_filter_entries() {
        let config = test_parse_config(
            r#"
[[filters]]
name = "jsmin"
kind = "minify-js"

[[filters]]
name = "license"
kind = "banner"
text = "/* x */"
mode = "per-input"
"#,
        );
        assert_eq!(config.filters.len(), 2);
        assert_eq!(config.filters[0].kind, BuiltinKind::MinifyJs);

        let banner = config.filters[1].build();
        assert_eq!(banner.mode(), FilterMode::PerInput);
        assert_eq!(banner.apply(b"a").unwrap(), b"/* x */\na");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = crate::config::PipelineConfig::from_str(
            "[[filters]]\nname = \"x\"\nkind = \"uglify\"",
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_validate_banner_without_text() {
        let entry = FilterEntry {
            name: "b".into(),
            kind: BuiltinKind::Banner,
            text: None,
            mode: None,
        };
        let mut diag = ConfigDiagnostics::new();
        entry.validate(0, &mut diag);
        assert!(diag.has_errors());
        assert_eq!(diag.errors()[0].field, "filters[0].text");
    }
}
