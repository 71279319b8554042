use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - A feeder is configured
/// - No step list names the same module twice
/// - Segment length leaves room for hash-prefix filenames
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.steps.feeder.is_empty() {
        return Err(ConfigError::ValidationError(
            "steps.feeder cannot be empty".to_string(),
        ));
    }

    for (list, names) in [
        ("extractors", &config.steps.extractors),
        ("enrichers", &config.steps.enrichers),
        ("storages", &config.steps.storages),
        ("databases", &config.steps.databases),
    ] {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                return Err(ConfigError::ValidationError(format!(
                    "steps.{list} lists module {name:?} more than once"
                )));
            }
        }
    }

    if config.keys.policy.max_segment_len < 16 {
        return Err(ConfigError::ValidationError(
            "keys.max_segment_len must be at least 16".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
[steps]
feeder = "url_feeder"
extractors = ["generic"]
storages = ["local_storage"]
databases = ["log_db"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_empty_feeder_fails() {
        let mut config = valid_config();
        config.steps.feeder = String::new();
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_duplicate_step_fails() {
        let mut config = valid_config();
        config.steps.extractors = vec!["generic".to_string(), "generic".to_string()];
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_tiny_segment_len_fails() {
        let mut config = valid_config();
        config.keys.policy.max_segment_len = 4;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
