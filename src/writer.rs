//! Writing compiled assets under the web root.

use std::fs;
use std::path::{Path, PathBuf};

use crate::asset::MaterializedAsset;
use crate::cache::CompiledCache;
use crate::error::AssetError;
use crate::utils::fs::{file_content_matches, write_atomic};

/// Result of writing one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub name: String,
    /// Absolute target path.
    pub path: PathBuf,
    /// Output came from the compiled cache; no filter ran.
    pub cache_hit: bool,
    /// The target already held these bytes; nothing was written.
    pub unchanged: bool,
    pub bytes: usize,
}

#[derive(Debug, Clone)]
pub struct AssetWriter {
    web_root: PathBuf,
}

impl AssetWriter {
    pub fn new(web_root: impl Into<PathBuf>) -> Self {
        Self {
            web_root: web_root.into(),
        }
    }

    pub fn web_root(&self) -> &Path {
        &self.web_root
    }

    /// Produce the asset's bytes (cache first) and place them at the target.
    pub fn write(
        &self,
        asset: &MaterializedAsset,
        cache: Option<&CompiledCache>,
    ) -> Result<WriteOutcome, AssetError> {
        let target = self.web_root.join(asset.target_path()?);

        let (content, cache_hit) = match cache.and_then(|c| c.lookup(&asset.key)) {
            Some(bytes) => (bytes, true),
            None => {
                let compiled = asset.compile()?;
                if let Some(cache) = cache {
                    cache.store(&asset.key, &compiled);
                }
                (compiled, false)
            }
        };

        let unchanged = file_content_matches(&target, &content);
        if unchanged {
            crate::debug!("write"; "{} unchanged", target.display());
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| AssetError::write(parent, e))?;
            }
            write_atomic(&target, &content).map_err(|e| AssetError::write(&target, e))?;
            crate::debug!("write"; "{} ({} bytes)", target.display(), content.len());
        }

        Ok(WriteOutcome {
            name: asset.name().to_string(),
            path: target,
            cache_hit,
            unchanged,
            bytes: content.len(),
        })
    }
}
