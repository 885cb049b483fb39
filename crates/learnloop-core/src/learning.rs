//! Per-iteration learnings: the raw input to the global store.
//!
//! Layout of an iteration's `learnings.yaml`:
//!
//! ```yaml
//! project: my-app
//! learnings:
//!   - id: my-app-iter2-001
//!     issue: Builders duplicated shared types
//!     severity: medium
//!     root_cause: No ownership map for shared files
//!     solution: Assign shared files to a single builder
//! ```

use crate::error::{LearnError, Result};
use crate::io;
use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const UNKNOWN_PROJECT: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Learning {
    pub id: String,
    pub issue: String,
    pub severity: Severity,
    pub root_cause: String,
    pub solution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationLearnings {
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default)]
    pub learnings: Vec<Learning>,
}

fn default_project() -> String {
    UNKNOWN_PROJECT.to_string()
}

impl IterationLearnings {
    pub fn new(project: impl Into<String>, learnings: Vec<Learning>) -> Self {
        Self {
            project: project.into(),
            learnings,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = io::read_required(path)?;
        if content.trim().is_empty() {
            return Ok(Self::new(UNKNOWN_PROJECT, Vec::new()));
        }
        serde_yaml::from_str(&content).map_err(|source| LearnError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
