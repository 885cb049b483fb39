use super::Context;
use crate::output::print_json;
use anyhow::Context as _;
use learnloop_core::store::{self, Metadata};
use learnloop_core::types::PatternStatus;

pub fn run(
    ctx: &Context,
    pattern_id: &str,
    status: &str,
    meta: &[String],
    metadata_json: Option<&str>,
) -> anyhow::Result<()> {
    let metadata = build_metadata(meta, metadata_json)?;
    let update = store::update_pattern_status(
        &ctx.store,
        pattern_id,
        PatternStatus::from(status),
        &metadata,
    )
    .with_context(|| format!("failed to update {pattern_id}"))?;

    if ctx.json {
        return print_json(&update);
    }
    if update.changed {
        println!("{}: status set to {}", update.pattern.pattern_id, update.pattern.status);
    } else {
        println!(
            "{}: already {} (no change)",
            update.pattern.pattern_id, update.pattern.status
        );
    }
    Ok(())
}

/// `--metadata-json` first, then `--meta` pairs on top.
fn build_metadata(pairs: &[String], json: Option<&str>) -> anyhow::Result<Metadata> {
    let mut metadata = Metadata::new();
    if let Some(raw) = json {
        let object: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(raw).context("--metadata-json must be a JSON object")?;
        for (key, value) in object {
            metadata.insert(key, serde_yaml::to_value(value)?);
        }
    }
    for pair in pairs {
        let (key, value) = store::parse_metadata_pair(pair)?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}
