use crate::detect::DetectOptions;
use crate::error::{LearnError, Result};
use crate::paths;
use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DetectionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_min_occurrences")]
    pub min_occurrences: u32,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

fn default_min_occurrences() -> u32 {
    2
}

fn default_min_severity() -> Severity {
    Severity::Medium
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_occurrences: default_min_occurrences(),
            min_severity: default_min_severity(),
        }
    }
}

impl DetectionConfig {
    pub fn options(&self) -> DetectOptions {
        DetectOptions {
            min_occurrences: self.min_occurrences,
            min_severity: self.min_severity,
        }
    }
}

// ---------------------------------------------------------------------------
// VisionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Template used when `--template` is not given. Relative to the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Project settings from `.learnloop/config.yaml`. The file is optional and
/// every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Store location, relative to the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<PathBuf>,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub vision: VisionConfig,
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&data).map_err(|source| LearnError::Parse { path, source })
    }

    pub fn store_path(&self, root: &Path) -> PathBuf {
        match &self.store {
            Some(p) => paths::resolve(root, p),
            None => paths::store_path(root),
        }
    }

    pub fn template_path(&self, root: &Path) -> Option<PathBuf> {
        self.vision
            .template
            .as_deref()
            .map(|p| paths::resolve(root, p))
    }

    pub fn validate(&self, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.detection.min_occurrences == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "detection.min_occurrences is 0; every pattern counts as recurring"
                    .to_string(),
            });
        }

        if let Some(template) = self.template_path(root) {
            if !template.is_file() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("vision.template not found: {}", template.display()),
                });
            }
        }

        if let Some(store) = &self.store {
            if store.as_os_str().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "store path is empty".to_string(),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
