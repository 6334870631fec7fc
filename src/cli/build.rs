//! `assetkit build`: one-shot dump of every asset.

use anyhow::{Result, bail};

use super::BuildArgs;
use crate::config::PipelineConfig;
use crate::context::BuildContext;
use crate::log;

/// Apply command-line overrides on top of the loaded config.
pub fn apply_overrides(config: &mut PipelineConfig, args: &BuildArgs) {
    if args.debug {
        config.options.debug = true;
    }
    if args.no_cache {
        config.options.formulae_cache_dir = None;
    }
}

/// Dump everything once. Any asset failure turns into an error so the
/// process exits with a non-zero status.
pub fn build_assets(config: &PipelineConfig) -> Result<()> {
    let ctx = BuildContext::from_config(config)?;
    let report = ctx.dumper().with_progress(true).dump();

    for outcome in report.outcomes.iter().filter(|o| !o.unchanged) {
        crate::debug!("write"; "{} -> {}", outcome.name, outcome.path.display());
    }
    if let Some(cache) = ctx.cache()
        && cache.is_degraded()
    {
        log!("cache"; "compiled cache unavailable, assets were recompiled");
    }

    log!("dump"; "{}", report.summary());
    if let Err(failures) = report.into_result() {
        eprintln!("{failures}");
        bail!("{} asset(s) failed", failures.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(extra: &str) -> (TempDir, PipelineConfig) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "var a = 1;").unwrap();
        let config_path = dir.path().join("assetkit.toml");
        fs::write(
            &config_path,
            format!(
                r#"
web = "web"

[options]
formulae_cache_dir = "cache"

[[assets]]
name = "app.js"
inputs = ["a.js"]
output = "app.js"
{extra}
"#
            ),
        )
        .unwrap();
        let config = PipelineConfig::from_path(&config_path).unwrap();
        (dir, config)
    }

    #[test]
    fn test_build_writes_assets() {
        let (dir, config) = project("");
        build_assets(&config).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("web/app.js")).unwrap(),
            "var a = 1;"
        );
        assert!(dir.path().join("cache").exists());
    }

    #[test]
    fn test_build_fails_on_asset_failure() {
        let (dir, config) = project(
            r#"
[[assets]]
name = "broken.js"
inputs = ["missing.js"]
output = "broken.js"
"#,
        );
        let err = build_assets(&config).unwrap_err();
        assert!(err.to_string().contains("1 asset(s) failed"));
        // Siblings are still written
        assert!(dir.path().join("web/app.js").exists());
    }

    #[test]
    fn test_overrides() {
        let (_dir, mut config) = project("");
        let args = BuildArgs {
            debug: true,
            no_cache: true,
            verbose: false,
        };
        apply_overrides(&mut config, &args);
        assert!(config.options.debug);
        assert!(config.options.formulae_cache_dir.is_none());
    }
}
