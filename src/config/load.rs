//! Loading the YAML configuration file

use super::schema::PipelineConfig;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Read, parse and validate a pipeline configuration.
///
/// Sections and fields left out of the file take their defaults, so an
/// empty file is a valid configuration.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!("failed to read config file {}: {e}", path.display()))
    })?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Parse and validate a configuration from YAML text
pub fn parse_config(yaml: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig = if yaml.trim().is_empty() {
        PipelineConfig::default()
    } else {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::Configuration(format!("failed to parse YAML config: {e}")))?
    };
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackingBackend;
    use crate::io::ArtifactFormat;
    use crate::pipeline::LockPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_is_default() {
        let file = NamedTempFile::new().unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
store:
  root: /var/lib/arthya
  format: yaml
split:
  train_frac: 0.8
  test_size: 0.1
features:
  exclude: [Job_Type]
standardize:
  decimals: 0
model:
  n_changepoints: 10
  weekly_seasonality: enabled
tracking:
  backend: memory
concurrency:
  lock_policy: reject
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.store.format, ArtifactFormat::Yaml);
        assert!(config.store.pretty);
        assert_eq!(config.split.train_frac, 0.8);
        assert_eq!(config.features.exclude, vec!["Job_Type"]);
        assert_eq!(config.features.default_gas_price, 77.5);
        assert_eq!(config.standardize.decimals, 0);
        assert_eq!(config.model.n_changepoints, 10);
        assert_eq!(config.tracking.backend, TrackingBackend::Memory);
        assert_eq!(config.tracking.experiment, "income-forecast");
        assert_eq!(config.concurrency.lock_policy, LockPolicy::Reject);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("split:\n  train_frac: 0\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("train_frac"));
    }

    #[test]
    fn test_unparseable_yaml() {
        let err = parse_config("split: [unclosed").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/no/such/arthya.yaml").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
