//! Formulae discovered from asset tags in template sources.
//!
//! Recognized tags:
//!
//! ```text
//! {% javascripts 'js/a.js' 'js/b.js' filter='jsmin,?banner' output='js/app.js' %}
//! {% stylesheets 'css/*.css' name='site' %}
//! {% image 'img/logo.png' %}
//! ```
//!
//! Quoted positional arguments are inputs. A tag without `name` is named
//! `<tag>_<fingerprint of its inputs>`, so identical tags in different
//! templates collapse into one formula.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use jwalk::{Parallelism, WalkDir};
use regex::Regex;

use super::{Formula, FormulaLoader};
use crate::utils::hash;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{%-?\s*(javascripts|stylesheets|image)\b(.*?)-?%\}").expect("valid tag regex")
});

static ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:(\w+)\s*=\s*)?(?:'([^']*)'|"([^"]*)")"#).expect("valid argument regex")
});

/// Walks a template directory and extracts asset tags.
#[derive(Debug, Clone)]
pub struct TemplateFormulaLoader {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl TemplateFormulaLoader {
    pub fn new(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            extensions,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Template files under `dir`, sorted. Serial walk: loaders may run on
    /// a busy rayon worker.
    fn templates(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .sort(true)
            .parallelism(Parallelism::Serial)
        {
            let entry = entry
                .with_context(|| format!("failed to walk `{}`", self.dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let wanted = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| self.extensions.iter().any(|x| x == ext));
            if wanted {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl FormulaLoader for TemplateFormulaLoader {
    fn name(&self) -> &str {
        "template"
    }

    fn load(&self) -> Result<Vec<(String, Formula)>> {
        if !self.dir.is_dir() {
            bail!("template directory `{}` does not exist", self.dir.display());
        }

        let mut found = Vec::new();
        for path in self.templates()? {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read template `{}`", path.display()))?;
            let rel = path.strip_prefix(&self.dir).unwrap_or(&path);
            found.extend(parse_tags(&source, &rel.display().to_string()));
        }
        Ok(found)
    }
}

/// Extract `(name, formula)` pairs from one template.
pub fn parse_tags(source: &str, origin: &str) -> Vec<(String, Formula)> {
    TAG_RE
        .captures_iter(source)
        .filter_map(|caps| {
            let tag = caps.get(1)?.as_str();
            let args = caps.get(2).map_or("", |m| m.as_str());
            let line = source[..caps.get(0)?.start()].matches('\n').count() + 1;
            parse_tag(tag, args, &format!("{origin}:{line}"))
        })
        .collect()
}

fn parse_tag(tag: &str, args: &str, origin: &str) -> Option<(String, Formula)> {
    let mut formula = Formula::default().with_origin(origin);
    let mut name = None;

    for caps in ARG_RE.captures_iter(args) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str())
            .to_string();
        match caps.get(1).map(|m| m.as_str()) {
            None => formula.inputs.push(value),
            Some("filter") => formula.filters.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(String::from),
            ),
            Some("output") => formula.output = Some(value),
            Some("name") => name = Some(value),
            Some(other) => {
                crate::debug!("template"; "{}: ignoring `{}` attribute", origin, other);
            }
        }
    }

    if formula.inputs.is_empty() {
        crate::log!("warning"; "{}: `{}` tag without inputs", origin, tag);
        return None;
    }
    if formula.output.is_none() {
        formula.output = Some(default_output(tag).to_string());
    }

    let name = name.unwrap_or_else(|| format!("{tag}_{}", hash::fingerprint(&formula.inputs.join("\n"))));
    Some((name, formula))
}

fn default_output(tag: &str) -> &'static str {
    match tag {
        "javascripts" => "js/*.js",
        "stylesheets" => "css/*.css",
        _ => "images/*",
    }
}
