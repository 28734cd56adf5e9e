use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverwatchConfig {
    /// Action supervision settings
    #[serde(default)]
    pub supervision: SupervisionConfig,

    /// Vision model judging sensitive clicks
    #[serde(default = "ProviderConfig::default_judge")]
    pub judge: ProviderConfig,

    /// Computer-use model settings
    #[serde(default)]
    pub computer_use: ComputerUseConfig,

    /// Where agent actions write files
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for OverwatchConfig {
    fn default() -> Self {
        Self {
            supervision: SupervisionConfig::default(),
            judge: ProviderConfig::default_judge(),
            computer_use: ComputerUseConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisionConfig {
    /// Tool name carrying the agent's action batch
    #[serde(default = "default_tool_name")]
    pub tool_name: String,

    /// Domains whose navigation is escalated to a human
    #[serde(default)]
    pub navigation_denylist: Vec<String>,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            tool_name: default_tool_name(),
            navigation_denylist: Vec::new(),
        }
    }
}

fn default_tool_name() -> String {
    crate::supervision::extract::AGENT_OUTPUT_TOOL.to_string()
}

// ==================== AI Configuration ====================

/// API type for the provider
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    #[default]
    Openai,
    Anthropic,
}

impl ApiType {
    /// Environment variable consulted when no key is configured
    pub fn key_env_var(&self) -> &'static str {
        match self {
            ApiType::Openai => "OPENAI_API_KEY",
            ApiType::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// AI Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Display name for this provider
    pub name: String,
    /// API type (determines request format)
    #[serde(default)]
    pub api_type: ApiType,
    /// Base URL for the API
    pub base_url: String,
    /// API key; falls back to the provider's environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model to call
    pub model: String,
}

impl ProviderConfig {
    pub fn default_judge() -> Self {
        Self {
            name: "OpenAI".to_string(),
            api_type: ApiType::Openai,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o".to_string(),
        }
    }

    pub fn default_computer_use() -> Self {
        Self {
            name: "Anthropic".to_string(),
            api_type: ApiType::Anthropic,
            base_url: "https://api.anthropic.com".to_string(),
            api_key: None,
            model: "claude-3-5-sonnet-20241022".to_string(),
        }
    }

    /// Configured key, or the one from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(self.api_type.key_env_var()).ok())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputerUseConfig {
    #[serde(default = "default_display_width")]
    pub display_width: u32,

    #[serde(default = "default_display_height")]
    pub display_height: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "ProviderConfig::default_computer_use")]
    pub provider: ProviderConfig,
}

impl Default for ComputerUseConfig {
    fn default() -> Self {
        Self {
            display_width: default_display_width(),
            display_height: default_display_height(),
            max_tokens: default_max_tokens(),
            provider: ProviderConfig::default_computer_use(),
        }
    }
}

fn default_display_width() -> u32 {
    1024
}

fn default_display_height() -> u32 {
    768
}

fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Folder for written outputs and screenshots
    #[serde(default = "default_output_folder")]
    pub folder: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: default_output_folder(),
        }
    }
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("output")
}
