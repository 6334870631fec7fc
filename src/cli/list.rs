//! `assetkit list`: show eager assets and lazy formulae.

use std::fmt::Write;

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config::PipelineConfig;
use crate::context::BuildContext;
use crate::log;

/// Print every known asset with its inputs, filters and output.
pub fn list_assets(config: &PipelineConfig) -> Result<()> {
    let ctx = BuildContext::from_config(config)?;
    print!("{}", render(&ctx));

    let eager = ctx.eager_assets();
    if let Some(error) = &eager.error {
        log!("error"; "asset registration failed: {}", error);
    }
    for failure in ctx.lazy_manager().loader_failures() {
        log!("error"; "{}: {}", failure.loader, failure.message);
    }
    Ok(())
}

fn render(ctx: &BuildContext) -> String {
    let mut out = String::new();
    let manager = ctx.asset_manager();
    let lazy = ctx.lazy_manager();

    let _ = writeln!(out, "{} ({})", "eager".bold(), manager.len());
    for (name, def) in manager.all() {
        entry(&mut out, name, &def.inputs, &def.filters, &def.output);
    }

    let _ = writeln!(out, "{} ({})", "lazy".bold(), lazy.len());
    for name in lazy.names() {
        let Ok(formula) = lazy.formula(name) else {
            continue;
        };
        let output = formula.output.as_deref().unwrap_or("(default)");
        entry(&mut out, name, &formula.inputs, &formula.filters, output);
        if !formula.origin.is_empty() {
            let _ = writeln!(out, "    {} {}", "from".dimmed(), formula.origin);
        }
    }
    out
}

fn entry(out: &mut String, name: &str, inputs: &[String], filters: &[String], output: &str) {
    let _ = writeln!(out, "  {} {} {}", name.cyan(), "→".dimmed(), output);
    let _ = writeln!(out, "    {} {}", "inputs".dimmed(), inputs.join(", "));
    if !filters.is_empty() {
        let _ = writeln!(out, "    {} {}", "filters".dimmed(), filters.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetDefinition;
    use crate::lazy::Formula;

    #[test]
    fn test_render_lists_both_kinds() {
        let ctx = BuildContext::builder("web")
            .assets(|am, _| {
                am.register(
                    AssetDefinition::new("app.js", "js/app.js")
                        .inputs(["a.js", "b.js"])
                        .filter("jsmin"),
                )?;
                Ok(())
            })
            .formula("site.css", Formula::new(["css/*.css"]))
            .build();

        let out = render(&ctx);
        assert!(out.contains("js/app.js"));
        assert!(out.contains("a.js, b.js"));
        assert!(out.contains("jsmin"));
        assert!(out.contains("css/*.css"));
        assert!(out.contains("(default)"));
        assert_eq!(out.matches(" (1)").count(), 2);
    }
}
