use super::Context;
use crate::output::print_json;
use anyhow::Context as _;
use learnloop_core::store::{self, Provenance};
use std::path::Path;

pub fn run(
    ctx: &Context,
    iteration_learnings: &Path,
    provenance: Provenance,
) -> anyhow::Result<()> {
    let summary = store::merge_learnings(iteration_learnings, &ctx.store, &provenance)
        .with_context(|| format!("failed to merge {}", iteration_learnings.display()))?;

    if ctx.json {
        return print_json(&summary);
    }

    println!(
        "Merged {} learnings into global knowledge base",
        summary.processed
    );
    if !summary.created.is_empty() {
        println!("  new patterns:    {}", summary.created.join(", "));
    }
    if !summary.merged.is_empty() {
        println!("  merged into:     {}", summary.merged.join(", "));
    }
    Ok(())
}
