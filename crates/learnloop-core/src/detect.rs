//! Recurring-pattern detection over the global store.
//!
//! Only IDENTIFIED patterns are candidates. Each survivor is ranked by
//!
//! ```text
//! impact = severity_weight × occurrences × (1.5 if seen in >1 project else 1.0)
//! ```
//!
//! with weights critical=10, medium=5, low=1.

use crate::error::Result;
use crate::store::{Pattern, Store};
use crate::types::{PatternStatus, Severity};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

pub const CROSS_PROJECT_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectOptions {
    pub min_occurrences: u32,
    pub min_severity: Severity,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            min_occurrences: 2,
            min_severity: Severity::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    #[serde(flatten)]
    pub pattern: Pattern,
    pub impact_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub patterns_found: usize,
    pub min_occurrences: u32,
    pub min_severity: Severity,
    pub detected_at: String,
    pub patterns: Vec<DetectedPattern>,
}

pub fn impact_score(pattern: &Pattern) -> f64 {
    let recurrence = if pattern.project_count() > 1 {
        CROSS_PROJECT_FACTOR
    } else {
        1.0
    };
    f64::from(pattern.severity.weight()) * f64::from(pattern.occurrences) * recurrence
}

/// Rank recurring IDENTIFIED patterns, highest impact first. Equal scores
/// are ordered by ascending `pattern_id`.
pub fn detect_recurring(store: &Store, opts: &DetectOptions) -> Vec<DetectedPattern> {
    let min_rank = opts.min_severity.rank();
    let mut found: Vec<DetectedPattern> = store
        .patterns
        .iter()
        .filter(|p| p.status == PatternStatus::Identified)
        .filter(|p| p.occurrences >= opts.min_occurrences)
        .filter(|p| p.severity.rank() >= min_rank)
        .map(|p| DetectedPattern {
            impact_score: impact_score(p),
            pattern: p.clone(),
        })
        .collect();

    found.sort_by(|a, b| {
        b.impact_score
            .partial_cmp(&a.impact_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.pattern.pattern_id.cmp(&b.pattern.pattern_id))
    });
    found
}

/// Load the store at `store_path` and build a detection report.
pub fn detect(store_path: &Path, opts: &DetectOptions, now: &str) -> Result<DetectionReport> {
    let store = Store::load(store_path)?;
    let patterns = detect_recurring(&store, opts);
    Ok(DetectionReport {
        patterns_found: patterns.len(),
        min_occurrences: opts.min_occurrences,
        min_severity: opts.min_severity,
        detected_at: now.to_string(),
        patterns,
    })
}
