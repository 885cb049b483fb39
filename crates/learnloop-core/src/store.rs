//! Global learning store: the deduplicated knowledge base of recurring
//! issue patterns across iterations and projects.
//!
//! Layout:
//!   .learnloop/global-learnings.yaml       the store
//!   .learnloop/global-learnings.yaml.bak   the store as it was before the last write
//!
//! Pattern IDs are sequential: PATTERN-001, PATTERN-002, …
//!
//! Patterns are deduplicated on the exact `(root_cause, severity)` pair.
//! Writes go through [`io::atomic_write_with`], so readers see either the old
//! or the new store. There is no cross-process lock: two concurrent writers
//! race and the last one wins.

use crate::error::{LearnError, Result};
use crate::io;
use crate::learning::{IterationLearnings, Learning};
use crate::types::{PatternStatus, Severity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

pub const SCHEMA_VERSION: &str = "1.0";
pub const PATTERN_PREFIX: &str = "PATTERN-";
pub const NAME_MAX_CHARS: usize = 60;

/// Free-form fields merged into a pattern on status updates.
pub type Metadata = BTreeMap<String, serde_yaml::Value>;

static METADATA_KEY_RE: OnceLock<Regex> = OnceLock::new();

fn metadata_key_re() -> &'static Regex {
    METADATA_KEY_RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

/// Parse a `key=value` metadata pair. The value is read as a YAML scalar,
/// so `rounds=3` stores a number and `plan=plan-6` a string. Anything that
/// is not a bool, number or string is kept as the raw text.
pub fn parse_metadata_pair(pair: &str) -> Result<(String, serde_yaml::Value)> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| LearnError::InvalidMetadata(format!("expected key=value, got '{pair}'")))?;
    let key = key.trim();
    if !metadata_key_re().is_match(key) {
        return Err(LearnError::InvalidMetadata(format!("invalid key '{key}'")));
    }
    Ok((key.to_string(), metadata_scalar(raw)))
}

fn metadata_scalar(raw: &str) -> serde_yaml::Value {
    use serde_yaml::Value;

    // A leading '#' would parse as a comment and drop the text.
    if raw.trim_start().starts_with('#') {
        return Value::String(raw.to_string());
    }
    match serde_yaml::from_str::<Value>(raw) {
        Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => v,
        _ => Value::String(raw.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationMetadata {
    pub duration_seconds: u64,
    pub healing_rounds: u32,
    pub files_modified: u32,
}

/// Caller-supplied context for one merge, applied to every pattern the
/// merge touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub discovered_in: String,
    pub duration_seconds: u64,
    pub healing_rounds: u32,
    pub files_modified: u32,
}

impl Provenance {
    pub fn iteration_metadata(&self) -> IterationMetadata {
        IterationMetadata {
            duration_seconds: self.duration_seconds,
            healing_rounds: self.healing_rounds,
            files_modified: self.files_modified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(default)]
    pub pattern_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_occurrences")]
    pub occurrences: u32,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub root_cause: String,
    #[serde(default)]
    pub proposed_solution: String,
    #[serde(default)]
    pub status: PatternStatus,
    #[serde(default)]
    pub discovered_in: String,
    #[serde(default)]
    pub discovered_at: String,
    #[serde(default)]
    pub source_learnings: Vec<String>,
    #[serde(default)]
    pub iteration_metadata: IterationMetadata,
    /// Fields this crate does not model (`implemented_in_plan`,
    /// `affected_files`, …). Kept verbatim across rewrites.
    #[serde(flatten)]
    pub extra: Metadata,
}

fn default_occurrences() -> u32 {
    1
}

fn default_severity() -> Severity {
    Severity::Low
}

impl Pattern {
    fn from_learning(
        pattern_id: String,
        learning: &Learning,
        project: &str,
        provenance: &Provenance,
        now: &str,
    ) -> Self {
        Self {
            pattern_id,
            name: learning.issue.chars().take(NAME_MAX_CHARS).collect(),
            occurrences: 1,
            projects: vec![project.to_string()],
            severity: learning.severity,
            root_cause: learning.root_cause.clone(),
            proposed_solution: learning.solution.clone(),
            status: PatternStatus::Identified,
            discovered_in: provenance.discovered_in.clone(),
            discovered_at: now.to_string(),
            source_learnings: vec![learning.id.clone()],
            iteration_metadata: provenance.iteration_metadata(),
            extra: Metadata::new(),
        }
    }

    /// Number of distinct projects that exhibited this pattern.
    pub fn project_count(&self) -> usize {
        self.projects.iter().collect::<BTreeSet<_>>().len()
    }

    /// Overlay `metadata` onto this pattern. Keys naming modelled fields
    /// replace them; everything else lands in `extra`.
    fn with_metadata(&self, metadata: &Metadata) -> Result<Pattern> {
        if metadata.contains_key("pattern_id") {
            return Err(LearnError::InvalidMetadata(
                "pattern_id cannot be changed".to_string(),
            ));
        }
        let serde_yaml::Value::Mapping(mut map) = serde_yaml::to_value(self)? else {
            return Err(LearnError::InvalidMetadata(format!(
                "pattern {} is not a mapping",
                self.pattern_id
            )));
        };
        for (key, value) in metadata {
            map.insert(serde_yaml::Value::String(key.clone()), value.clone());
        }
        serde_yaml::from_value(serde_yaml::Value::Mapping(map))
            .map_err(|e| LearnError::InvalidMetadata(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub aggregated_at: String,
    #[serde(default)]
    pub total_projects: usize,
    /// Count of merges that created a new pattern.
    #[serde(default)]
    pub total_learnings: usize,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// What a merge did, per learning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub project: String,
    pub processed: usize,
    /// IDs of patterns created by this merge, in creation order.
    pub created: Vec<String>,
    /// IDs of existing patterns a learning was folded into (one entry per learning).
    pub merged: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub pattern: Pattern,
    /// False when the call was an idempotent no-op.
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Current time in the format stored in `aggregated_at` / `discovered_at`.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Store {
    pub fn new(now: &str) -> Self {
        Self {
            schema_version: default_schema_version(),
            aggregated_at: now.to_string(),
            total_projects: 0,
            total_learnings: 0,
            patterns: Vec::new(),
        }
    }

    /// Load an existing store. Fails with `MissingFile` if there is none.
    pub fn load(path: &Path) -> Result<Self> {
        let content = io::read_required(path)?;
        Self::parse(path, &content)
    }

    /// Load the store if the file exists.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        match Self::load(path) {
            Ok(store) => Ok(Some(store)),
            Err(LearnError::MissingFile(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new(""));
        }
        serde_yaml::from_str(content).map_err(|source| LearnError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write_to(&self, w: &mut dyn std::io::Write) -> std::io::Result<()> {
        serde_yaml::to_writer(w, self).map_err(std::io::Error::other)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        io::atomic_write_with(path, |w| self.write_to(w))
    }

    /// Back up whatever is on disk at `path`, then atomically replace it.
    pub fn commit(&self, path: &Path) -> Result<()> {
        io::backup(path)?;
        self.save(path)
    }

    pub fn get(&self, pattern_id: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.pattern_id == pattern_id)
    }

    /// Next free ID: highest `PATTERN-NNN` suffix + 1, at least three digits.
    /// IDs that don't parse are ignored.
    pub fn next_pattern_id(&self) -> String {
        let max = self
            .patterns
            .iter()
            .filter_map(|p| pattern_number(&p.pattern_id))
            .max()
            .unwrap_or(0);
        format!("{PATTERN_PREFIX}{:03}", max.saturating_add(1))
    }

    pub fn distinct_projects(&self) -> BTreeSet<&str> {
        self.patterns
            .iter()
            .flat_map(|p| p.projects.iter().map(String::as_str))
            .collect()
    }

    fn find_match(&self, root_cause: &str, severity: Severity) -> Option<usize> {
        self.patterns
            .iter()
            .position(|p| p.root_cause == root_cause && p.severity == severity)
    }

    /// Fold one iteration's learnings into the store.
    ///
    /// Learnings are matched against every pattern, including ones created
    /// earlier in the same batch. A match bumps `occurrences`, records the
    /// project once, appends the learning id (repeats are kept) and replaces
    /// `iteration_metadata` with this merge's numbers.
    pub fn merge(
        &mut self,
        batch: &IterationLearnings,
        provenance: &Provenance,
        now: &str,
    ) -> MergeSummary {
        let project = batch.project.as_str();
        let mut summary = MergeSummary {
            project: project.to_string(),
            processed: batch.learnings.len(),
            created: Vec::new(),
            merged: Vec::new(),
        };

        for learning in &batch.learnings {
            match self.find_match(&learning.root_cause, learning.severity) {
                Some(idx) => {
                    let existing = &mut self.patterns[idx];
                    existing.occurrences = existing.occurrences.saturating_add(1);
                    if !existing.projects.iter().any(|p| p == project) {
                        existing.projects.push(project.to_string());
                    }
                    existing.source_learnings.push(learning.id.clone());
                    existing.iteration_metadata = provenance.iteration_metadata();
                    summary.merged.push(existing.pattern_id.clone());
                }
                None => {
                    let id = self.next_pattern_id();
                    self.patterns.push(Pattern::from_learning(
                        id.clone(),
                        learning,
                        project,
                        provenance,
                        now,
                    ));
                    self.total_learnings += 1;
                    summary.created.push(id);
                }
            }
        }

        self.total_projects = self.distinct_projects().len();
        self.aggregated_at = now.to_string();
        summary
    }

    /// Move a pattern to `status` and overlay `metadata` onto it.
    ///
    /// IMPLEMENTED → IMPLEMENTED is a no-op so retried callers don't rewrite
    /// the store. No other transition is validated.
    pub fn update_status(
        &mut self,
        pattern_id: &str,
        status: PatternStatus,
        metadata: &Metadata,
        now: &str,
    ) -> Result<StatusUpdate> {
        let idx = self
            .patterns
            .iter()
            .position(|p| p.pattern_id == pattern_id)
            .ok_or_else(|| LearnError::PatternNotFound(pattern_id.to_string()))?;

        let current = &self.patterns[idx];
        if current.status == PatternStatus::Implemented && status == PatternStatus::Implemented {
            return Ok(StatusUpdate {
                pattern: current.clone(),
                changed: false,
            });
        }

        let mut updated = current.clone();
        updated.status = status;
        if !metadata.is_empty() {
            updated = updated.with_metadata(metadata)?;
        }
        self.patterns[idx] = updated.clone();
        self.aggregated_at = now.to_string();
        Ok(StatusUpdate {
            pattern: updated,
            changed: true,
        })
    }
}

fn pattern_number(id: &str) -> Option<u64> {
    let digits = id.strip_prefix(PATTERN_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ---------------------------------------------------------------------------
// File-level operations
// ---------------------------------------------------------------------------

/// Merge the learnings file at `iteration_path` into the store at
/// `store_path`, creating the store if it does not exist.
///
/// Either the whole batch is persisted or the store file is untouched.
pub fn merge_learnings(
    iteration_path: &Path,
    store_path: &Path,
    provenance: &Provenance,
) -> Result<MergeSummary> {
    let batch = IterationLearnings::load(iteration_path)?;
    let now = timestamp();
    let mut store = Store::load_optional(store_path)?.unwrap_or_else(|| Store::new(&now));

    let summary = store.merge(&batch, provenance, &now);
    store.commit(store_path)?;

    tracing::debug!(
        store = %store_path.display(),
        project = %summary.project,
        created = summary.created.len(),
        merged = summary.merged.len(),
        "merged learnings"
    );
    Ok(summary)
}

/// Update the status of one pattern in the store at `store_path`.
///
/// Nothing is written (and no backup is taken) when the pattern is missing
/// or the update is a no-op.
pub fn update_pattern_status(
    store_path: &Path,
    pattern_id: &str,
    status: PatternStatus,
    metadata: &Metadata,
) -> Result<StatusUpdate> {
    let mut store = Store::load(store_path)?;
    let update = store.update_status(pattern_id, status, metadata, &timestamp())?;
    if update.changed {
        store.commit(store_path)?;
    } else {
        tracing::debug!(pattern = pattern_id, "status unchanged, store not rewritten");
    }
    Ok(update)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
