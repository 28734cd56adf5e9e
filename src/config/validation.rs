use crate::config::schema::{OverwatchConfig, ProviderConfig};
use crate::error::{OverwatchError, Result};

/// Validate provider configuration
pub fn validate_provider(provider: &ProviderConfig) -> Result<()> {
    if provider.name.trim().is_empty() {
        return Err(OverwatchError::Validation(
            "Provider name cannot be empty".to_string(),
        ));
    }

    if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://") {
        return Err(OverwatchError::Validation(format!(
            "Invalid base URL for provider {}: {}. Must start with http:// or https://",
            provider.name, provider.base_url
        )));
    }

    if provider.model.trim().is_empty() {
        return Err(OverwatchError::Validation(format!(
            "Model cannot be empty for provider {}",
            provider.name
        )));
    }

    Ok(())
}

/// Validate the whole configuration
pub fn validate_config(config: &OverwatchConfig) -> Result<()> {
    if config.supervision.tool_name.trim().is_empty() {
        return Err(OverwatchError::Validation(
            "Supervised tool name cannot be empty".to_string(),
        ));
    }

    for domain in &config.supervision.navigation_denylist {
        if domain.trim().is_empty() || domain.contains('/') || domain.contains(char::is_whitespace) {
            return Err(OverwatchError::Validation(format!(
                "Invalid denylist domain: {:?}. Use bare host names like example.com",
                domain
            )));
        }
    }

    validate_provider(&config.judge)?;
    validate_provider(&config.computer_use.provider)?;

    let cu = &config.computer_use;
    if cu.display_width == 0 || cu.display_height == 0 {
        return Err(OverwatchError::Validation(
            "Computer-use display size must be non-zero".to_string(),
        ));
    }

    if config.output.folder.as_os_str().is_empty() {
        return Err(OverwatchError::Validation(
            "Output folder cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&OverwatchConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut provider = ProviderConfig::default_judge();
        provider.base_url = "api.openai.com".to_string();
        assert!(validate_provider(&provider).is_err());
    }

    #[test]
    fn test_invalid_denylist_entry() {
        let mut config = OverwatchConfig::default();
        config.supervision.navigation_denylist = vec!["https://bad.example/path".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_display() {
        let mut config = OverwatchConfig::default();
        config.computer_use.display_height = 0;
        assert!(validate_config(&config).is_err());
    }
}
