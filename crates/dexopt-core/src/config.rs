use crate::errors::OptimizerError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default iteration cap of the single-implementation pass
pub const DEFAULT_MAX_CYCLES: usize = 8;

/// Options of the single-implementation interface pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleImplConfig {
    /// Only these interfaces may be erased (empty: no restriction)
    #[serde(default)]
    pub white_list: Vec<String>,

    /// Only interfaces under these package prefixes may be erased
    #[serde(default)]
    pub package_white_list: Vec<String>,

    /// Interfaces that must never be erased
    #[serde(default)]
    pub black_list: Vec<String>,

    /// Package prefixes whose interfaces must never be erased
    #[serde(default)]
    pub package_black_list: Vec<String>,

    /// Annotations that pin the interface they are applied to
    #[serde(default)]
    pub anno_black_list: Vec<String>,

    /// Maximum number of build/analyze/rewrite cycles (default: 8)
    #[serde(default = "default_max_cycles")]
    pub max_cycles: usize,
}

fn default_max_cycles() -> usize {
    DEFAULT_MAX_CYCLES
}

impl Default for SingleImplConfig {
    fn default() -> Self {
        Self {
            white_list: Vec::new(),
            package_white_list: Vec::new(),
            black_list: Vec::new(),
            package_black_list: Vec::new(),
            anno_black_list: Vec::new(),
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}

impl SingleImplConfig {
    /// Whether the white/black lists allow erasing `descriptor`
    pub fn allows(&self, descriptor: &str) -> bool {
        let in_package = |prefixes: &[String]| prefixes.iter().any(|p| descriptor.starts_with(p.as_str()));

        let whitelisted = (self.white_list.is_empty() && self.package_white_list.is_empty())
            || self.white_list.iter().any(|w| w == descriptor)
            || in_package(&self.package_white_list);
        let blacklisted =
            self.black_list.iter().any(|b| b == descriptor) || in_package(&self.package_black_list);

        whitelisted && !blacklisted
    }
}

/// Profile-guided optimization input.
///
/// Opaque to the optimizer: it is accepted and handed to every pass unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PgoInput(pub serde_json::Value);

impl PgoInput {
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

/// Main optimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerConfig {
    /// Passes to run, in order
    #[serde(default = "default_passes")]
    pub passes: Vec<String>,

    /// Single-implementation interface pass options
    #[serde(default)]
    pub single_impl: SingleImplConfig,

    /// Profile-guided optimization input
    #[serde(default)]
    pub pgo: PgoInput,
}

fn default_passes() -> Vec<String> {
    vec!["single-impl".to_string()]
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            passes: default_passes(),
            single_impl: SingleImplConfig::default(),
            pgo: PgoInput::default(),
        }
    }
}

impl OptimizerConfig {
    /// Load configuration from a JSON or YAML file (chosen by extension)
    pub fn from_file(path: &Path) -> Result<Self, OptimizerError> {
        let content = std::fs::read_to_string(path)?;
        if is_yaml(path) {
            serde_yaml::from_str(&content).map_err(|e| OptimizerError::Config(e.to_string()))
        } else {
            serde_json::from_str(&content).map_err(|e| OptimizerError::Config(e.to_string()))
        }
    }

    /// Create a default configuration and write it to a file
    pub fn init_file(path: &Path) -> Result<(), OptimizerError> {
        let config = OptimizerConfig::default();
        let text = if is_yaml(path) {
            serde_yaml::to_string(&config).map_err(|e| OptimizerError::Config(e.to_string()))?
        } else {
            serde_json::to_string_pretty(&config)
                .map_err(|e| OptimizerError::Config(e.to_string()))?
        };
        std::fs::write(path, text)?;
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
