//! Eager asset definitions and their resolution.
//!
//! ```text
//! asset/
//! ├── definition.rs   # AssetDefinition, output templates
//! ├── manager.rs      # AssetManager (name -> definition)
//! ├── factory.rs      # AssetFactory -> MaterializedAsset
//! └── source.rs       # glob expansion for inputs
//! ```

mod definition;
mod factory;
mod manager;
mod source;

pub use definition::{AssetDefinition, REFERENCE_PREFIX, check_relative};
pub use factory::{AssetFactory, MaterializedAsset};
pub use manager::AssetManager;
pub use source::{expand_glob, is_glob};
