use super::Context;
use crate::output::print_json;
use clap::Subcommand;
use learnloop_core::config::WarnLevel;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration and resolved paths
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate => validate(ctx),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(ctx: &Context) -> anyhow::Result<()> {
    let template = ctx.config.template_path(&ctx.root);
    if ctx.json {
        return print_json(&serde_json::json!({
            "root": ctx.root,
            "store": ctx.store,
            "config": ctx.config,
            "template": template,
        }));
    }
    println!("root:           {}", ctx.root.display());
    println!("store:          {}", ctx.store.display());
    println!("min_occurrences: {}", ctx.config.detection.min_occurrences);
    println!("min_severity:   {}", ctx.config.detection.min_severity);
    match template {
        Some(path) => println!("template:       {}", path.display()),
        None => println!("template:       (built-in)"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(ctx: &Context) -> anyhow::Result<()> {
    let warnings = ctx.config.validate(&ctx.root);

    if ctx.json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
