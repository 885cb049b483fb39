use super::Context;
use crate::output::print_json;
use anyhow::Context as _;
use learnloop_core::store::{self, Store};
use learnloop_core::{io, vision, LearnError};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

pub enum PatternSource {
    Json(PathBuf),
    Store(String),
}

impl PatternSource {
    pub fn from_args(json: Option<PathBuf>, id: Option<String>) -> anyhow::Result<Self> {
        match (json, id) {
            (Some(path), None) => Ok(Self::Json(path)),
            (None, Some(id)) => Ok(Self::Store(id)),
            _ => anyhow::bail!("pass exactly one of --pattern-json or --pattern"),
        }
    }
}

pub fn run(
    ctx: &Context,
    source: PatternSource,
    plan_id: &str,
    template: Option<&Path>,
    output: &Path,
) -> anyhow::Result<()> {
    let pattern = match source {
        PatternSource::Json(path) => vision::load_pattern_json(&path)?,
        PatternSource::Store(id) => {
            let store = Store::load(&ctx.store)?;
            store
                .get(&id)
                .cloned()
                .ok_or(LearnError::PatternNotFound(id))?
        }
    };

    let template_path = template
        .map(Path::to_path_buf)
        .or_else(|| ctx.config.template_path(&ctx.root));
    let template: Cow<'static, str> = match &template_path {
        Some(path) => Cow::Owned(
            io::read_required(path)
                .with_context(|| format!("failed to read template {}", path.display()))?,
        ),
        None => Cow::Borrowed(vision::DEFAULT_TEMPLATE),
    };

    let rendered = vision::generate(&pattern, plan_id, &template, output, &store::timestamp())
        .with_context(|| format!("failed to write {}", output.display()))?;
    if !rendered.unreplaced.is_empty() {
        tracing::warn!(
            placeholders = ?rendered.unreplaced,
            "unreplaced placeholders detected"
        );
    }

    if ctx.json {
        return print_json(&serde_json::json!({
            "output": output,
            "pattern_id": pattern.pattern_id,
            "plan_id": plan_id,
            "unreplaced": rendered.unreplaced,
        }));
    }
    println!("Vision generated: {}", output.display());
    println!("   Pattern: {} - {}", pattern.pattern_id, pattern.name);
    println!(
        "   Severity: {} | Occurrences: {}",
        pattern.severity, pattern.occurrences
    );
    Ok(())
}
