//! Built-in filters available from configuration.
//!
//! Uses oxc for JavaScript and lightningcss for CSS minification.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use serde::{Deserialize, Serialize};

use super::{Filter, FilterMode};

/// Kinds of built-in filters, as written in `[[filters]] kind = "..."`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuiltinKind {
    MinifyJs,
    MinifyCss,
    Banner,
    Trim,
}

impl BuiltinKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MinifyJs => "minify-js",
            Self::MinifyCss => "minify-css",
            Self::Banner => "banner",
            Self::Trim => "trim",
        }
    }

    /// Stage used when the configuration does not override it.
    pub const fn default_mode(self) -> FilterMode {
        match self {
            Self::Trim => FilterMode::PerInput,
            _ => FilterMode::Combined,
        }
    }
}

/// Build a built-in filter.
///
/// `text` is only used by `banner`; `mode` overrides the kind's default stage.
pub fn create(kind: BuiltinKind, text: Option<&str>, mode: Option<FilterMode>) -> Arc<dyn Filter> {
    let mode = mode.unwrap_or(kind.default_mode());
    match kind {
        BuiltinKind::MinifyJs => Arc::new(MinifyJs { mode }),
        BuiltinKind::MinifyCss => Arc::new(MinifyCss { mode }),
        BuiltinKind::Banner => Arc::new(Banner {
            text: text.unwrap_or_default().to_string(),
            mode,
        }),
        BuiltinKind::Trim => Arc::new(Trim { mode }),
    }
}

fn utf8(input: &[u8]) -> Result<&str> {
    std::str::from_utf8(input).context("input is not valid UTF-8")
}

// ============================================================================
// Minifiers
// ============================================================================

/// Minify JavaScript source code.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}

struct MinifyJs {
    mode: FilterMode,
}

impl Filter for MinifyJs {
    fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
        let source = utf8(input)?;
        minify_js(source)
            .map(String::into_bytes)
            .ok_or_else(|| anyhow!("javascript parse error"))
    }

    fn mode(&self) -> FilterMode {
        self.mode
    }
}

struct MinifyCss {
    mode: FilterMode,
}

impl Filter for MinifyCss {
    fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
        let source = utf8(input)?;
        minify_css(source)
            .map(String::into_bytes)
            .ok_or_else(|| anyhow!("css parse error"))
    }

    fn mode(&self) -> FilterMode {
        self.mode
    }
}

// ============================================================================
// Text filters
// ============================================================================

/// Prepends a fixed line of text.
struct Banner {
    text: String,
    mode: FilterMode,
}

impl Filter for Banner {
    fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.text.len() + 1 + input.len());
        out.extend_from_slice(self.text.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(input);
        Ok(out)
    }

    fn mode(&self) -> FilterMode {
        self.mode
    }

    fn options(&self) -> String {
        format!("text={}", self.text)
    }
}

/// Strips leading and trailing ASCII whitespace.
struct Trim {
    mode: FilterMode,
}

impl Filter for Trim {
    fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.trim_ascii().to_vec())
    }

    fn mode(&self) -> FilterMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_js_filter() {
        let source = b"function add(first, second) {\n  return first + second;\n}\nexport { add };\n";
        let filter = create(BuiltinKind::MinifyJs, None, None);
        let out = String::from_utf8(filter.apply(source).unwrap()).unwrap();
        assert!(out.len() < source.len());
        assert!(out.contains("export"));
    }

    #[test]
    fn test_minify_js_rejects_invalid_source() {
        let filter = create(BuiltinKind::MinifyJs, None, None);
        assert!(filter.apply(b"function (").is_err());
        assert!(filter.apply(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_minify_css_filter() {
        let filter = create(BuiltinKind::MinifyCss, None, None);
        let out = filter.apply(b"body {\n  color: red;\n}\n").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "body{color:red}");
    }

    #[test]
    fn test_banner_options_track_text() {
        let a = create(BuiltinKind::Banner, Some("/* a */"), None);
        let b = create(BuiltinKind::Banner, Some("/* b */"), None);
        assert_ne!(a.options(), b.options());
        assert_eq!(a.apply(b"x").unwrap(), b"/* a */\nx");
    }

    #[test]
    fn test_trim_defaults_to_per_input() {
        let trim = create(BuiltinKind::Trim, None, None);
        assert_eq!(trim.mode(), FilterMode::PerInput);
        assert_eq!(trim.apply(b"  a b \n").unwrap(), b"a b");

        let combined = create(BuiltinKind::Trim, None, Some(FilterMode::Combined));
        assert_eq!(combined.mode(), FilterMode::Combined);
    }
}
