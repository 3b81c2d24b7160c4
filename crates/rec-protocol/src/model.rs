//! Model artifacts and the serving-state singleton (spec §3, §4.3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Staging,
    Active,
    Shadow,
    Archived,
}

impl ModelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelStatus::Staging => "staging",
            ModelStatus::Active => "active",
            ModelStatus::Shadow => "shadow",
            ModelStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "staging" => Some(ModelStatus::Staging),
            "active" => Some(ModelStatus::Active),
            "shadow" => Some(ModelStatus::Shadow),
            "archived" => Some(ModelStatus::Archived),
            _ => None,
        }
    }
}

/// A versioned popularity-model artifact. `version` is monotone
/// semver-like; no two artifacts share a version (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelArtifact {
    pub version: String,
    pub status: ModelStatus,
    pub counts: HashMap<String, f64>,
    pub trained_at: String,
    #[serde(default)]
    pub metrics: serde_json::Value,
    pub data_snapshot_id: String,
    pub pipeline_git_sha: String,
    pub container_image_digest: String,
    pub artifact_uri: String,
}

/// `target` for `setServingVersion` (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServingTarget {
    All,
    Control,
    Treatment,
}

impl ServingTarget {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(ServingTarget::All),
            "control" => Some(ServingTarget::Control),
            "treatment" => Some(ServingTarget::Treatment),
            _ => None,
        }
    }
}

/// The singleton serving-state document, id = `model-serving-state`
/// (spec §3). The `variants` map is the source of truth for serving and
/// experimentation lookups; `default_version` is the fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServingState {
    #[serde(default)]
    pub default_version: Option<String>,
    #[serde(default)]
    pub control_version: Option<String>,
    #[serde(default)]
    pub treatment_version: Option<String>,
    pub updated_at: String,
}

impl ServingState {
    pub fn version_for(&self, variant: &str) -> Option<&str> {
        let pinned = match variant {
            "treatment" => self.treatment_version.as_deref(),
            _ => self.control_version.as_deref(),
        };
        pinned.or(self.default_version.as_deref())
    }
}
