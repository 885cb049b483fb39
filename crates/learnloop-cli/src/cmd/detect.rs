use super::Context;
use crate::output::print_json;
use anyhow::Context as _;
use learnloop_core::{detect, io, store};
use std::path::Path;

/// The report is always JSON: it feeds `vision --pattern-json`.
pub fn run(
    ctx: &Context,
    min_occurrences: Option<u32>,
    min_severity: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let mut opts = ctx.config.detection.options();
    if let Some(n) = min_occurrences {
        opts.min_occurrences = n;
    }
    if let Some(s) = min_severity {
        opts.min_severity = s.parse()?;
    }

    let report = detect::detect(&ctx.store, &opts, &store::timestamp())
        .context("pattern detection failed")?;
    tracing::debug!(found = report.patterns_found, "detection complete");

    match output {
        Some(path) if path != Path::new("-") => {
            let json = serde_json::to_string_pretty(&report)?;
            io::atomic_write(path, json.as_bytes())?;
            eprintln!("Patterns written to {}", path.display());
            Ok(())
        }
        _ => print_json(&report),
    }
}
