//! Improvement-vision documents rendered from a single pattern.
//!
//! Templates use `{UPPER_SNAKE}` placeholders. Substitution is a single
//! pass, so placeholder-like text inside pattern fields is never expanded a
//! second time. Placeholders with no value are left in place and reported
//! back to the caller.

use crate::error::{LearnError, Result};
use crate::io;
use crate::store::Pattern;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/improvement-vision.md");

const HIGH_RISK_OCCURRENCES: u32 = 3;
const AFFECTED_FILES_FALLBACK: &str = "See source learnings for file details";
const COMPONENTS_FALLBACK: &str = "TBD - Requires manual analysis of root cause during planning";

/// Root-cause keywords and the workflow component each one implicates.
const COMPONENT_RULES: &[(&[&str], &str)] = &[
    (
        &["tsconfig", "path", "import"],
        "agents/2l-planner.md - Add tsconfig validation step before builders start",
    ),
    (
        &["duplicate"],
        "agents/2l-iplanner.md - Add duplicate file detection across zones",
    ),
    (
        &["integration", "conflict"],
        "agents/2l-integrator.md - Enhanced conflict detection",
    ),
    (
        &["validation", "test"],
        "agents/2l-validator.md - Improve validation checks",
    ),
    (&["builder"], "agents/2l-builder.md - Add safety checks"),
];

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{([A-Z][A-Z0-9_]*)\}").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content: String,
    /// Placeholders still present after substitution, in document order.
    pub unreplaced: Vec<String>,
}

/// Components worth changing for a given root cause, inferred from keywords.
pub fn infer_affected_components(root_cause: &str) -> Vec<&'static str> {
    let lower = root_cause.to_lowercase();
    let components: Vec<&'static str> = COMPONENT_RULES
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, component)| *component)
        .collect();
    if components.is_empty() {
        vec![COMPONENTS_FALLBACK]
    } else {
        components
    }
}

fn bullets<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| format!("- {}", s.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_unknown(s: &str) -> String {
    if s.is_empty() {
        "unknown".to_string()
    } else {
        s.to_string()
    }
}

fn affected_files(pattern: &Pattern) -> Vec<String> {
    let files: Vec<String> = pattern
        .extra
        .get("affected_files")
        .and_then(|v| v.as_sequence())
        .map(|seq| {
            seq.iter()
                .filter_map(|f| f.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if files.is_empty() {
        vec![AFFECTED_FILES_FALLBACK.to_string()]
    } else {
        files
    }
}

/// Placeholder values for `pattern`.
pub fn placeholders(pattern: &Pattern, plan_id: &str, now: &str) -> HashMap<&'static str, String> {
    let meta = &pattern.iteration_metadata;
    let recurrence_risk = if pattern.occurrences >= HIGH_RISK_OCCURRENCES {
        "high"
    } else {
        "medium"
    };
    let components = bullets(infer_affected_components(&pattern.root_cause));
    let occurrence_details = pattern
        .projects
        .iter()
        .zip(&pattern.source_learnings)
        .map(|(project, id)| format!("- Project: {project}, Learning ID: {id}"))
        .collect::<Vec<_>>()
        .join("\n");

    HashMap::from([
        ("PATTERN_NAME", pattern.name.clone()),
        ("ISO_TIMESTAMP", now.to_string()),
        ("PLAN_ID", plan_id.to_string()),
        ("PATTERN_ID", pattern.pattern_id.clone()),
        ("OCCURRENCES", pattern.occurrences.to_string()),
        ("PROJECT_COUNT", pattern.projects.len().to_string()),
        ("PATTERN_ISSUE_DESCRIPTION", pattern.name.clone()),
        ("PROJECT_LIST", bullets(&pattern.projects)),
        ("DISCOVERED_IN", or_unknown(&pattern.discovered_in)),
        ("DISCOVERED_AT", or_unknown(&pattern.discovered_at)),
        ("SEVERITY", pattern.severity.as_str().to_uppercase()),
        ("RECURRENCE_RISK", recurrence_risk.to_string()),
        ("PATTERN_ROOT_CAUSE", pattern.root_cause.clone()),
        ("SOURCE_LEARNINGS_LIST", bullets(&pattern.source_learnings)),
        ("SOURCE_LEARNING_IDS", pattern.source_learnings.join(", ")),
        ("AVG_HEALING_ROUNDS", format!("{:.1}", f64::from(meta.healing_rounds))),
        ("AVG_FILES_MODIFIED", format!("{:.1}", f64::from(meta.files_modified))),
        ("AVG_DURATION_SECONDS", meta.duration_seconds.to_string()),
        ("PATTERN_PROPOSED_SOLUTION", pattern.proposed_solution.clone()),
        ("SPECIFIC_IMPLEMENTATION", pattern.proposed_solution.clone()),
        ("AFFECTED_COMPONENTS_LIST", components.clone()),
        ("INFERRED_COMPONENTS_TO_MODIFY", components),
        ("AFFECTED_FILES_FROM_PATTERN", bullets(affected_files(pattern))),
        ("OCCURRENCE_DETAILS", occurrence_details),
    ])
}

/// Fill `template` with values derived from `pattern`.
pub fn render(pattern: &Pattern, plan_id: &str, template: &str, now: &str) -> Rendered {
    let values = placeholders(pattern, plan_id, now);
    let mut unreplaced = Vec::new();
    let content = placeholder_re()
        .replace_all(template, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => {
                unreplaced.push(caps[0].to_string());
                caps[0].to_string()
            }
        })
        .into_owned();
    Rendered {
        content,
        unreplaced,
    }
}

/// Read a single pattern from a JSON file (e.g. one entry of a detection report).
pub fn load_pattern_json(path: &Path) -> Result<Pattern> {
    let content = io::read_required(path)?;
    serde_json::from_str(&content).map_err(|source| LearnError::ParseJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Render the vision for `pattern` and write it to `output`.
pub fn generate(
    pattern: &Pattern,
    plan_id: &str,
    template: &str,
    output: &Path,
    now: &str,
) -> Result<Rendered> {
    let rendered = render(pattern, plan_id, template, now);
    io::atomic_write(output, rendered.content.as_bytes())?;
    Ok(rendered)
}
