//! assetkit - named assets, filter chains and a compiled-output cache,
//! dumped to a web root.
//!
//! ```text
//! FilterRegistry ─┐
//! AssetManager ───┼─► AssetFactory ─► AssetWriter ─► web root
//! LazyAssetManager┘        │               │
//!                     CacheKey ◄──── CompiledCache
//! ```
//!
//! [`BuildContext`] wires the pieces together; [`Dumper`] runs one dump and
//! [`DumpHook`] triggers one after each request of an embedding server.

pub mod asset;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod dumper;
pub mod error;
pub mod filter;
pub mod hooks;
pub mod lazy;
pub mod logger;
pub mod utils;
pub mod writer;

pub use asset::{AssetDefinition, AssetFactory, AssetManager, MaterializedAsset};
pub use cache::{CacheKey, CompiledCache};
pub use config::{PipelineConfig, PipelineOptions};
pub use context::{BuildContext, BuildContextBuilder};
pub use dumper::{BuildReport, Dumper};
pub use error::{AssetError, AssetFailure, BuildFailures};
pub use filter::{Filter, FilterChain, FilterMode, FilterRegistry, FnFilter};
pub use hooks::DumpHook;
pub use lazy::{Formula, FormulaLoader, LazyAssetManager, TemplateFormulaLoader};
pub use writer::{AssetWriter, WriteOutcome};
