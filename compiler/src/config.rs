//! TOML configuration parsing for `flowc.toml`.

use serde::Deserialize;

use crate::ir::ValidatorConfig;

/// Default configuration file name, looked up next to the input program
pub const CONFIG_FILE: &str = "flowc.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowcConfig {
    /// `[validate]` section
    #[serde(default)]
    pub validate: ValidateSection,
}

/// Validator profile named in configuration or on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    #[default]
    Standard,
    Final,
}

impl Profile {
    pub fn validator_config(self) -> ValidatorConfig {
        match self {
            Profile::Standard => ValidatorConfig::standard(),
            Profile::Final => ValidatorConfig::final_form(),
        }
    }
}

/// `[validate]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ValidateSection {
    /// Base profile
    #[serde(default)]
    pub profile: Profile,
    /// Reject nested-block continuations
    pub no_nested_blocks: Option<bool>,
    /// Check execution contexts
    pub check_exec_context: Option<bool>,
    /// Recompute passed-variable lists before checking
    pub run_fixup: Option<bool>,
}

impl ValidateSection {
    /// Profile defaults with the section's overrides applied
    pub fn validator_config(&self) -> ValidatorConfig {
        let mut config = self.profile.validator_config();
        if let Some(v) = self.no_nested_blocks {
            config.no_nested_blocks = v;
        }
        if let Some(v) = self.check_exec_context {
            config.check_exec_context = v;
        }
        if let Some(v) = self.run_fixup {
            config.run_fixup = v;
        }
        config
    }
}

/// Parse a `flowc.toml` string.
pub fn parse_config(content: &str) -> Result<FlowcConfig, String> {
    toml::from_str(content).map_err(|e| format!("Failed to parse {}: {}", CONFIG_FILE, e))
}
