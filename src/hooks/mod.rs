//! Lifecycle hook that dumps assets after a request completes.
//!
//! The embedding application calls [`DumpHook::after_request`] once its own
//! request handling is done; the pipeline itself knows nothing about
//! requests. Overlapping calls from concurrent requests are fine: a dump is
//! safe to run concurrently.

use std::sync::Arc;

use crate::context::BuildContext;
use crate::dumper::BuildReport;

/// Post-request trigger for [`BuildContext::dump`].
#[derive(Debug, Clone)]
pub struct DumpHook {
    ctx: Arc<BuildContext>,
}

impl DumpHook {
    pub fn new(ctx: Arc<BuildContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Whether `after_request` dumps at all (`auto_dump_assets`).
    pub fn is_enabled(&self) -> bool {
        self.ctx.options().auto_dump_assets
    }

    /// Dump all assets unless automatic dumping is disabled.
    ///
    /// Failures are logged here and also returned in the report.
    pub fn after_request(&self) -> Option<BuildReport> {
        if !self.is_enabled() {
            return None;
        }

        let report = self.ctx.dump();
        for failure in &report.failures {
            crate::log!("failed"; "{}", failure);
        }
        if report.written() > 0 {
            crate::log!("hook"; "{}", report.summary());
        } else {
            crate::debug!("hook"; "{}", report.summary());
        }
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetDefinition;
    use crate::config::PipelineOptions;
    use std::fs;
    use tempfile::TempDir;

    fn context(dir: &TempDir, auto_dump_assets: bool) -> Arc<BuildContext> {
        fs::write(dir.path().join("a.js"), "a").unwrap();
        let ctx = BuildContext::builder(dir.path().join("web"))
            .source_root(dir.path())
            .options(PipelineOptions {
                auto_dump_assets,
                ..PipelineOptions::default()
            })
            .assets(|am, _| {
                am.register(AssetDefinition::new("a", "a.js").input("a.js"))?;
                Ok(())
            })
            .build();
        Arc::new(ctx)
    }

    #[test]
    fn test_after_request_dumps() {
        let dir = TempDir::new().unwrap();
        let hook = DumpHook::new(context(&dir, true));

        let report = hook.after_request().unwrap();
        assert!(report.is_success());
        assert!(dir.path().join("web/a.js").exists());

        // Second request: nothing changed
        assert_eq!(hook.after_request().unwrap().unchanged(), 1);
    }

    #[test]
    fn test_disabled_hook_does_nothing() {
        let dir = TempDir::new().unwrap();
        let hook = DumpHook::new(context(&dir, false));

        assert!(hook.after_request().is_none());
        assert!(!dir.path().join("web").exists());

        // Explicit dumps still work
        assert!(hook.context().dump().is_success());
        assert!(dir.path().join("web/a.js").exists());
    }
}
