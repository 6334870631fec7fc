//! Configuration sections of `assetkit.toml`.

mod assets;
mod filters;
mod options;
mod serve;
mod templates;

pub use assets::{AssetEntry, FormulaEntry};
pub(crate) use assets::validate_asset;
pub use filters::FilterEntry;
pub use options::PipelineOptions;
pub use serve::ServeConfig;
pub use templates::TemplatesConfig;
