//! Filter registry and resolved filter chains.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use super::{Filter, FilterMode};
use crate::error::AssetError;

/// Prefix marking a filter that is skipped in debug mode (`?jsmin`).
pub const OPTIONAL_PREFIX: char = '?';

/// Name → filter mapping shared by every definition of a context.
///
/// Filters are bound to definitions at resolution time, so registering or
/// replacing a filter after definitions exist is allowed.
#[derive(Default)]
pub struct FilterRegistry {
    filters: DashMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter; an existing filter with the same name is replaced.
    pub fn register(&self, name: impl Into<String>, filter: impl Filter + 'static) {
        self.register_arc(name, Arc::new(filter));
    }

    /// Register an already shared filter.
    pub fn register_arc(&self, name: impl Into<String>, filter: Arc<dyn Filter>) {
        let name = name.into();
        if self.filters.insert(name.clone(), filter).is_some() {
            crate::debug!("filter"; "replaced `{}`", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Filter>> {
        self.filters.get(name).map(|f| Arc::clone(f.value()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.filters.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Resolve filter names into a chain, applying every filter.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<FilterChain, AssetError> {
        self.resolve_for(names, false)
    }

    /// Resolve filter names into a chain.
    ///
    /// In debug mode names prefixed with `?` are dropped. Fails on the first
    /// unregistered name, in sequence order.
    pub fn resolve_for<S: AsRef<str>>(
        &self,
        names: &[S],
        debug: bool,
    ) -> Result<FilterChain, AssetError> {
        let mut steps = Vec::with_capacity(names.len());
        for raw in names {
            let raw = raw.as_ref();
            let name = match raw.strip_prefix(OPTIONAL_PREFIX) {
                Some(_) if debug => continue,
                Some(stripped) => stripped,
                None => raw,
            };
            let filter = self
                .get(name)
                .ok_or_else(|| AssetError::UnknownFilter(name.to_string()))?;
            steps.push((name.to_string(), filter));
        }
        Ok(FilterChain { steps })
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

// ============================================================================
// FilterChain
// ============================================================================

/// Ordered filters bound from names at resolution time.
#[derive(Clone, Default)]
pub struct FilterChain {
    steps: Vec<(String, Arc<dyn Filter>)>,
}

impl FilterChain {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Filter names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|(name, _)| name.as_str())
    }

    /// `(name, mode, options)` per step, identifying this chain for cache
    /// keys.
    pub fn identity(&self) -> impl Iterator<Item = (&str, FilterMode, String)> {
        self.steps
            .iter()
            .map(|(name, filter)| (name.as_str(), filter.mode(), filter.options()))
    }

    /// Run the chain over input parts.
    ///
    /// `PerInput` filters run on each part, parts are joined with `\n`, then
    /// `Combined` filters run on the joined bytes. Order inside each stage
    /// follows the chain.
    pub fn execute(&self, parts: &[Vec<u8>]) -> Result<Vec<u8>, AssetError> {
        let per_input: Vec<_> = self.stage(FilterMode::PerInput).collect();

        let mut joined = Vec::with_capacity(parts.iter().map(Vec::len).sum::<usize>() + parts.len());
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                joined.push(b'\n');
            }
            if per_input.is_empty() {
                joined.extend_from_slice(part);
            } else {
                let mut bytes = part.clone();
                for (name, filter) in &per_input {
                    bytes = run_filter(name, filter.as_ref(), &bytes)?;
                }
                joined.extend_from_slice(&bytes);
            }
        }

        let mut output = joined;
        for (name, filter) in self.stage(FilterMode::Combined) {
            output = run_filter(name, filter.as_ref(), &output)?;
        }
        Ok(output)
    }

    fn stage(&self, mode: FilterMode) -> impl Iterator<Item = (&str, &Arc<dyn Filter>)> {
        self.steps
            .iter()
            .filter(move |(_, f)| f.mode() == mode)
            .map(|(name, f)| (name.as_str(), f))
    }
}

fn run_filter(name: &str, filter: &dyn Filter, input: &[u8]) -> Result<Vec<u8>, AssetError> {
    filter.apply(input).map_err(|e| AssetError::Filter {
        filter: name.to_string(),
        message: format!("{e:#}"),
    })
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
