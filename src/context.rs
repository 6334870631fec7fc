//! Build context: the pipeline's components, assembled once.
//!
//! Every component is created lazily on first access and memoized for the
//! lifetime of the context. The registration callbacks therefore run at
//! most once, on the first dump (or the first explicit accessor call).
//!
//! ```ignore
//! let ctx = BuildContext::builder("web")
//!     .source_root("assets")
//!     .filters(|fm| fm.register("upper", FnFilter::new(|b| Ok(b.to_ascii_uppercase()))))
//!     .assets(|am, _fm| {
//!         am.register(AssetDefinition::new("app.js", "js/app.js").input("js/app.js"))?;
//!         Ok(())
//!     })
//!     .build();
//! let report = ctx.dump();
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::asset::{AssetFactory, AssetManager};
use crate::cache::CompiledCache;
use crate::config::{ConfigError, PipelineConfig, PipelineOptions};
use crate::dumper::{BuildReport, Dumper};
use crate::filter::FilterRegistry;
use crate::lazy::{Formula, LazyAssetManager, TemplateFormulaLoader};
use crate::utils::lazy::Deferred;
use crate::writer::AssetWriter;

type FilterCallback = Box<dyn Fn(&FilterRegistry) + Send + Sync>;
type AssetCallback =
    Box<dyn Fn(&mut AssetManager, &FilterRegistry) -> anyhow::Result<()> + Send + Sync>;

/// Eager assets plus the outcome of the registration callback.
#[derive(Debug, Default)]
pub struct EagerAssets {
    pub manager: AssetManager,
    /// Set when the callback failed; assets registered before the failure stay.
    pub error: Option<String>,
}

pub struct BuildContext {
    options: PipelineOptions,
    source_root: PathBuf,
    web_root: PathBuf,
    register_filters: FilterCallback,
    register_assets: AssetCallback,
    formulae: Vec<(String, Formula)>,
    template_loader: Option<TemplateFormulaLoader>,

    filters: Deferred<FilterRegistry>,
    assets: Deferred<EagerAssets>,
    cache: Deferred<Option<Arc<CompiledCache>>>,
    lazy: Deferred<LazyAssetManager>,
    writer: Deferred<AssetWriter>,
}

impl BuildContext {
    pub fn builder(web_root: impl Into<PathBuf>) -> BuildContextBuilder {
        BuildContextBuilder::new(web_root)
    }

    /// Assemble a context from a loaded config file.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let filter_config = config.clone();
        let asset_entries = config.assets.clone();

        let mut builder = Self::builder(&config.web)
            .source_root(&config.source)
            .options(config.options.clone())
            .filters(move |registry| filter_config.register_filters(registry))
            .assets(move |manager, _| {
                for entry in &asset_entries {
                    manager.register(entry.clone())?;
                }
                Ok(())
            })
            .formulae(config.load_formulae()?);

        if let Some(templates) = &config.templates {
            builder = builder.templates(TemplateFormulaLoader::new(
                &templates.dir,
                templates.extensions.clone(),
            ));
        }
        Ok(builder.build())
    }

    // ========================================================================
    // accessors
    // ========================================================================

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn web_root(&self) -> &Path {
        &self.web_root
    }

    pub fn has_templates(&self) -> bool {
        self.template_loader.is_some()
    }

    pub fn filters(&self) -> &FilterRegistry {
        self.filters.get_or_init(|| {
            let registry = FilterRegistry::new();
            (self.register_filters)(&registry);
            crate::debug!("context"; "{} filter(s) registered", registry.names().len());
            registry
        })
    }

    pub fn eager_assets(&self) -> &EagerAssets {
        self.assets.get_or_init(|| {
            let filters = self.filters();
            let mut manager = AssetManager::new();
            let error = (self.register_assets)(&mut manager, filters)
                .err()
                .map(|e| format!("{e:#}"));
            if let Some(error) = &error {
                crate::log!("error"; "asset registration failed: {}", error);
            }
            EagerAssets { manager, error }
        })
    }

    pub fn asset_manager(&self) -> &AssetManager {
        &self.eager_assets().manager
    }

    /// The shared compiled-asset cache, when caching is enabled.
    pub fn cache(&self) -> Option<&Arc<CompiledCache>> {
        self.cache
            .get_or_init(|| CompiledCache::from_options(&self.options).map(Arc::new))
            .as_ref()
    }

    pub fn lazy_manager(&self) -> &LazyAssetManager {
        self.lazy.get_or_init(|| {
            let mut lazy = LazyAssetManager::new(self.cache().cloned());
            lazy.add_formulae(self.formulae.iter().cloned());
            if let Some(loader) = &self.template_loader {
                lazy.add_loader(loader.clone());
            }
            lazy
        })
    }

    pub fn writer(&self) -> &AssetWriter {
        self.writer.get_or_init(|| AssetWriter::new(&self.web_root))
    }

    /// A factory bound to this context's registry, eager assets and mode.
    pub fn factory(&self) -> AssetFactory<'_> {
        AssetFactory::new(&self.source_root, self.filters())
            .with_manager(self.asset_manager())
            .with_cache(self.cache().map(Arc::as_ref))
            .with_debug(self.options.debug)
    }

    pub fn dumper(&self) -> Dumper<'_> {
        Dumper::new(self)
    }

    /// Dump every eager and lazy asset.
    pub fn dump(&self) -> BuildReport {
        self.dumper().dump()
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("options", &self.options)
            .field("source_root", &self.source_root)
            .field("web_root", &self.web_root)
            .field("formulae", &self.formulae.len())
            .field("templates", &self.template_loader.as_ref().map(|t| t.dir()))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// builder
// ============================================================================

/// Assembles a [`BuildContext`]. Nothing runs until the context is used.
pub struct BuildContextBuilder {
    options: PipelineOptions,
    source_root: Option<PathBuf>,
    web_root: PathBuf,
    register_filters: FilterCallback,
    register_assets: AssetCallback,
    formulae: Vec<(String, Formula)>,
    template_loader: Option<TemplateFormulaLoader>,
}

impl BuildContextBuilder {
    fn new(web_root: impl Into<PathBuf>) -> Self {
        Self {
            options: PipelineOptions::default(),
            source_root: None,
            web_root: web_root.into(),
            register_filters: Box::new(|_: &FilterRegistry| {}),
            register_assets: Box::new(|_: &mut AssetManager, _: &FilterRegistry| Ok(())),
            formulae: Vec::new(),
            template_loader: None,
        }
    }

    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Root for relative inputs. Defaults to the cwd.
    pub fn source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    pub fn filters(mut self, callback: impl Fn(&FilterRegistry) + Send + Sync + 'static) -> Self {
        self.register_filters = Box::new(callback);
        self
    }

    pub fn assets(
        mut self,
        callback: impl Fn(&mut AssetManager, &FilterRegistry) -> anyhow::Result<()>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.register_assets = Box::new(callback);
        self
    }

    pub fn formula(mut self, name: impl Into<String>, formula: Formula) -> Self {
        self.formulae.push((name.into(), formula));
        self
    }

    pub fn formulae(mut self, formulae: impl IntoIterator<Item = (String, Formula)>) -> Self {
        self.formulae.extend(formulae);
        self
    }

    /// Plug in template-discovered formulae.
    pub fn templates(mut self, loader: TemplateFormulaLoader) -> Self {
        self.template_loader = Some(loader);
        self
    }

    pub fn build(self) -> BuildContext {
        BuildContext {
            options: self.options,
            source_root: self.source_root.unwrap_or_else(|| PathBuf::from(".")),
            web_root: self.web_root,
            register_filters: self.register_filters,
            register_assets: self.register_assets,
            formulae: self.formulae,
            template_loader: self.template_loader,
            filters: Deferred::new(),
            assets: Deferred::new(),
            cache: Deferred::new(),
            lazy: Deferred::new(),
            writer: Deferred::new(),
        }
    }
}
