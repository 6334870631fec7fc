//! Turning definitions into materialized assets.
//!
//! Resolution order is fixed: the filter chain is bound first, so an
//! unknown filter fails before any input is read. Inputs are then read in
//! definition order and the cache key is derived last.

use std::fs;
use std::path::{Path, PathBuf};

use super::source::{expand_glob, is_glob};
use super::{AssetDefinition, AssetManager, REFERENCE_PREFIX};
use crate::cache::{CacheKey, CompiledCache};
use crate::error::AssetError;
use crate::filter::{FilterChain, FilterRegistry};

/// A definition with its inputs read and its filter chain bound.
///
/// Built on demand for one write and never persisted.
#[derive(Debug, Clone)]
pub struct MaterializedAsset {
    pub definition: AssetDefinition,
    pub parts: Vec<Vec<u8>>,
    pub chain: FilterChain,
    pub key: CacheKey,
}

impl MaterializedAsset {
    #[inline]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Run the filter chain over the parts.
    pub fn compile(&self) -> Result<Vec<u8>, AssetError> {
        self.chain.execute(&self.parts)
    }

    /// Output path relative to the web root, with placeholders filled in.
    pub fn target_path(&self) -> Result<PathBuf, AssetError> {
        self.definition.render_output(&self.key.fingerprint())
    }
}

/// Resolves definitions against the filter registry and the source tree.
#[derive(Clone, Copy)]
pub struct AssetFactory<'a> {
    source_root: &'a Path,
    filters: &'a FilterRegistry,
    /// Lookup for `@name` inputs.
    manager: Option<&'a AssetManager>,
    /// Consulted for `@name` inputs before compiling them.
    cache: Option<&'a CompiledCache>,
    debug: bool,
}

impl<'a> AssetFactory<'a> {
    pub fn new(source_root: &'a Path, filters: &'a FilterRegistry) -> Self {
        Self {
            source_root,
            filters,
            manager: None,
            cache: None,
            debug: false,
        }
    }

    pub fn with_manager(mut self, manager: &'a AssetManager) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn with_cache(mut self, cache: Option<&'a CompiledCache>) -> Self {
        self.cache = cache;
        self
    }

    /// In debug mode optional (`?name`) filters are dropped.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn materialize(&self, definition: &AssetDefinition) -> Result<MaterializedAsset, AssetError> {
        let mut stack = Vec::new();
        self.materialize_in(definition, &mut stack)
    }

    fn materialize_in(
        &self,
        definition: &AssetDefinition,
        stack: &mut Vec<String>,
    ) -> Result<MaterializedAsset, AssetError> {
        let chain = self.filters.resolve_for(&definition.filters, self.debug)?;

        stack.push(definition.name.clone());
        let parts = self.read_inputs(definition, stack);
        stack.pop();
        let parts = parts?;

        let key = CacheKey::derive(&parts, &chain);
        crate::debug!("resolve"; "{} -> {} part(s), key {}", definition.name, parts.len(), key);

        Ok(MaterializedAsset {
            definition: definition.clone(),
            parts,
            chain,
            key,
        })
    }

    fn read_inputs(
        &self,
        definition: &AssetDefinition,
        stack: &mut Vec<String>,
    ) -> Result<Vec<Vec<u8>>, AssetError> {
        let mut parts = Vec::with_capacity(definition.inputs.len());
        for input in &definition.inputs {
            if let Some(name) = input.strip_prefix(REFERENCE_PREFIX) {
                parts.push(self.read_reference(name, stack)?);
            } else if is_glob(input) {
                let paths = expand_glob(self.source_root, input).map_err(|e| {
                    AssetError::source_unavailable(self.source_root.join(input), e)
                })?;
                for path in paths {
                    parts.push(read_file(&path)?);
                }
            } else {
                parts.push(read_file(&self.source_root.join(input))?);
            }
        }
        Ok(parts)
    }

    /// Compiled output of another eager asset, cache first.
    fn read_reference(&self, name: &str, stack: &mut Vec<String>) -> Result<Vec<u8>, AssetError> {
        if let Some(start) = stack.iter().position(|n| n == name) {
            let mut chain = stack[start..].to_vec();
            chain.push(name.to_string());
            return Err(AssetError::ReferenceCycle { chain });
        }
        let manager = self
            .manager
            .ok_or_else(|| AssetError::NotFound(name.to_string()))?;
        let referenced = manager.get(name)?;
        let nested = self.materialize_in(referenced, stack)?;
        if let Some(bytes) = self.cache.and_then(|c| c.lookup(&nested.key)) {
            return Ok(bytes);
        }
        let compiled = nested.compile()?;
        if let Some(cache) = self.cache {
            cache.store(&nested.key, &compiled);
        }
        Ok(compiled)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, AssetError> {
    fs::read(path).map_err(|e| AssetError::source_unavailable(path, e))
}
