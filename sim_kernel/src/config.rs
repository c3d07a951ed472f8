//! Kernel configuration.

use program_metadata::{LoadOptions, MagicPolicy};
use serde::{Deserialize, Serialize};
use thread_scheduling::PriorityRange;

/// HLE kernel configuration
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use sim_kernel::KernelConfig;
///
/// let config = KernelConfig::from_json(r#"{ "magic_policy": "Strict" }"#).unwrap();
/// assert_eq!(config.host_priority, KernelConfig::default().host_priority);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Host scale guest priorities are mapped onto
    pub host_priority: PriorityRange,
    /// How program descriptor magic strings are checked
    pub magic_policy: MagicPolicy,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            host_priority: PriorityRange::HOST,
            magic_policy: MagicPolicy::Permissive,
        }
    }
}

impl KernelConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            magic_policy: self.magic_policy,
        }
    }
}
