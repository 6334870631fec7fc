//! Pipeline error types.

use owo_colors::OwoColorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// AssetError
// ============================================================================

/// Errors raised while registering, resolving or dumping a single asset.
///
/// None of these abort a dump: the dumper records them per asset and keeps
/// processing siblings.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset `{0}` is already registered")]
    DuplicateName(String),

    #[error("asset `{0}` not found")]
    NotFound(String),

    #[error("unknown filter `{0}`")]
    UnknownFilter(String),

    #[error("unknown formula `{0}`")]
    UnknownFormula(String),

    #[error("invalid formula `{name}`: {reason}")]
    InvalidFormula { name: String, reason: String },

    #[error("asset `{0}` is defined both eagerly and as a formula")]
    Conflict(String),

    #[error("cannot read source `{}`", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("asset reference cycle: {}", .chain.join(" -> "))]
    ReferenceCycle { chain: Vec<String> },

    #[error("filter `{filter}` failed: {message}")]
    Filter { filter: String, message: String },

    #[error("invalid output path `{output}`: must be relative and stay inside the web root")]
    InvalidOutput { output: String },

    #[error("cannot write `{}`", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("asset registration failed: {0}")]
    Registration(String),
}

impl AssetError {
    /// Shorthand for a source that could not be read.
    pub fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for an output that could not be written.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Render the error with its full source chain on one line.
    pub fn detail(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}

// ============================================================================
// AssetFailure / BuildFailures
// ============================================================================

/// A failed asset in a dump, with the error that stopped it.
#[derive(Debug)]
pub struct AssetFailure {
    pub name: String,
    pub error: AssetError,
}

impl AssetFailure {
    pub fn new(name: impl Into<String>, error: AssetError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

impl fmt::Display for AssetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{} {} {}",
            "[".dimmed(),
            self.name.cyan(),
            "]".dimmed(),
            "→".red(),
            self.error.detail()
        )
    }
}

/// Every failure of one dump, surfaced as a single reportable error.
#[derive(Debug, Default)]
pub struct BuildFailures {
    failures: Vec<AssetFailure>,
}

impl BuildFailures {
    pub fn new(failures: Vec<AssetFailure>) -> Self {
        Self { failures }
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetFailure> {
        self.failures.iter()
    }

    pub fn into_inner(self) -> Vec<AssetFailure> {
        self.failures
    }
}

impl fmt::Display for BuildFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "asset dump failed:".red().bold())?;
        for (i, failure) in self.failures.iter().enumerate() {
            write!(f, "{failure}")?;
            if i + 1 < self.failures.len() {
                writeln!(f)?;
            }
        }
        if self.failures.len() > 1 {
            write!(
                f,
                "\n\n{} {} {}",
                "found".dimmed(),
                self.failures.len().to_string().red().bold(),
                "failures".dimmed()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildFailures {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_asset_error_display() {
        let err = AssetError::UnknownFilter("jsmin".into());
        assert_eq!(err.to_string(), "unknown filter `jsmin`");

        let err = AssetError::ReferenceCycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn test_detail_includes_source() {
        let err = AssetError::source_unavailable(
            "js/a.js",
            Error::new(ErrorKind::NotFound, "no such file"),
        );
        let detail = err.detail();
        assert!(detail.contains("js/a.js"));
        assert!(detail.contains("no such file"));
    }

    #[test]
    fn test_build_failures_display_lists_every_asset() {
        let failures = BuildFailures::new(vec![
            AssetFailure::new("app.js", AssetError::UnknownFilter("jsmin".into())),
            AssetFailure::new("site.css", AssetError::NotFound("site.css".into())),
        ]);
        let display = failures.to_string();
        assert!(display.contains("app.js"));
        assert!(display.contains("unknown filter `jsmin`"));
        assert!(display.contains("asset `site.css` not found"));
    }
}
