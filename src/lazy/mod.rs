//! Deferred assets: formulae that become definitions on first access.
//!
//! ```text
//! lazy/
//! ├── mod.rs        # LazyAssetManager, FormulaLoader
//! ├── formula.rs    # Formula -> AssetDefinition
//! └── template.rs   # formulae discovered in template tags
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! add_formula / add_loader       (assembly, &mut self)
//!         │
//!         ▼
//! first names() / get()          loaders run once, table is frozen
//!         │
//!         ▼
//! get(name)                      Unresolved -> Resolved, once per name
//! ```
//!
//! A resolution that fails is not memoized; the next access retries.

mod formula;
mod template;

pub use formula::{Formula, is_valid_output};
pub use template::TemplateFormulaLoader;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::asset::AssetDefinition;
use crate::cache::CompiledCache;
use crate::error::AssetError;
use crate::utils::lazy::Deferred;

/// A pluggable source of formulae (template scanner, external index, ...).
pub trait FormulaLoader: Send + Sync {
    /// Short identifier used in logs and failure reports.
    fn name(&self) -> &str;

    /// Discover formulae, in a stable order.
    fn load(&self) -> anyhow::Result<Vec<(String, Formula)>>;
}

/// A formula promoted to a definition, with its cache attached.
#[derive(Debug)]
pub struct ResolvedAsset {
    pub definition: AssetDefinition,
    /// Set when caching is enabled; attached once at resolution.
    pub cache: Option<Arc<CompiledCache>>,
}

impl ResolvedAsset {
    #[inline]
    pub fn cache(&self) -> Option<&CompiledCache> {
        self.cache.as_deref()
    }
}

/// A loader that failed during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderFailure {
    pub loader: String,
    pub message: String,
}

#[derive(Default)]
struct FormulaTable {
    /// Discovery order.
    order: Vec<String>,
    entries: FxHashMap<String, Entry>,
    failures: Vec<LoaderFailure>,
}

struct Entry {
    formula: Formula,
    resolved: Deferred<ResolvedAsset>,
}

impl FormulaTable {
    fn insert(&mut self, name: String, formula: Formula) -> bool {
        if let Some(existing) = self.entries.get(&name) {
            crate::log!(
                "warning";
                "formula `{}` from {} ignored, already defined by {}",
                name,
                origin(&formula),
                origin(&existing.formula)
            );
            return false;
        }
        self.order.push(name.clone());
        self.entries.insert(
            name,
            Entry {
                formula,
                resolved: Deferred::new(),
            },
        );
        true
    }
}

fn origin(formula: &Formula) -> &str {
    if formula.origin.is_empty() {
        "<inline>"
    } else {
        &formula.origin
    }
}

/// Holds formulae and resolves each at most once.
pub struct LazyAssetManager {
    pending: Vec<(String, Formula)>,
    loaders: Vec<Box<dyn FormulaLoader>>,
    cache: Option<Arc<CompiledCache>>,
    table: Deferred<FormulaTable>,
}

impl LazyAssetManager {
    pub fn new(cache: Option<Arc<CompiledCache>>) -> Self {
        Self {
            pending: Vec::new(),
            loaders: Vec::new(),
            cache,
            table: Deferred::new(),
        }
    }

    /// Add a formula. Discovery order is insertion order; loaders come after.
    pub fn add_formula(&mut self, name: impl Into<String>, formula: Formula) {
        self.pending.push((name.into(), formula));
        self.table = Deferred::new();
    }

    pub fn add_formulae(&mut self, formulae: impl IntoIterator<Item = (String, Formula)>) {
        self.pending.extend(formulae);
        self.table = Deferred::new();
    }

    pub fn add_loader(&mut self, loader: impl FormulaLoader + 'static) {
        self.loaders.push(Box::new(loader));
        self.table = Deferred::new();
    }

    pub fn has_loader(&self, name: &str) -> bool {
        self.loaders.iter().any(|l| l.name() == name)
    }

    /// All formula names in discovery order. Runs loaders on first call.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table().order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has(&self, name: &str) -> bool {
        self.table().entries.contains_key(name)
    }

    /// The raw formula, without resolving it.
    pub fn formula(&self, name: &str) -> Result<&Formula, AssetError> {
        self.entry(name).map(|e| &e.formula)
    }

    /// Resolve `name`, promoting its formula on first access.
    pub fn get(&self, name: &str) -> Result<&ResolvedAsset, AssetError> {
        let entry = self.entry(name)?;
        entry.resolved.get_or_try_init(|| {
            let definition = entry.formula.to_definition(name)?;
            crate::debug!("lazy"; "resolved {} -> {}", name, definition.output);
            Ok(ResolvedAsset {
                definition,
                cache: self.cache.clone(),
            })
        })
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.entry(name).is_ok_and(|e| e.resolved.is_initialized())
    }

    /// Loaders that failed during discovery.
    pub fn loader_failures(&self) -> &[LoaderFailure] {
        &self.table().failures
    }

    fn entry(&self, name: &str) -> Result<&Entry, AssetError> {
        self.table()
            .entries
            .get(name)
            .ok_or_else(|| AssetError::UnknownFormula(name.to_string()))
    }

    fn table(&self) -> &FormulaTable {
        self.table.get_or_init(|| {
            let mut table = FormulaTable::default();
            for (name, formula) in &self.pending {
                table.insert(name.clone(), formula.clone());
            }
            for loader in &self.loaders {
                match loader.load() {
                    Ok(found) => {
                        crate::debug!("lazy"; "{} loader found {} formula(e)", loader.name(), found.len());
                        for (name, formula) in found {
                            table.insert(name, formula);
                        }
                    }
                    Err(e) => {
                        crate::log!("error"; "{} loader failed: {:#}", loader.name(), e);
                        table.failures.push(LoaderFailure {
                            loader: loader.name().to_string(),
                            message: format!("{e:#}"),
                        });
                    }
                }
            }
            table
        })
    }
}

impl std::fmt::Debug for LazyAssetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyAssetManager")
            .field("pending", &self.pending.len())
            .field("loaders", &self.loaders.iter().map(|l| l.name()).collect::<Vec<_>>())
            .field("loaded", &self.table.is_initialized())
            .finish_non_exhaustive()
    }
}
