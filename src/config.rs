use crate::error::{GranaryError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do when an external extraction step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Abort the whole run on the first failed extraction.
    #[default]
    FailFast,
    /// Skip the failed entry, keep going, report failures at the end.
    Skip,
}

impl std::fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorPolicy::FailFast => write!(f, "fail-fast"),
            ErrorPolicy::Skip => write!(f, "skip"),
        }
    }
}

impl std::str::FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail-fast" | "failfast" => Ok(ErrorPolicy::FailFast),
            "skip" => Ok(ErrorPolicy::Skip),
            _ => Err(format!("Unknown error policy: {}. Use 'fail-fast' or 'skip'", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root under which per-channel trees (audio/, subs/, segments/) live.
    pub output_dir: PathBuf,
    /// Channel to process when none is given on the command line.
    pub channel: Option<String>,
    /// Target sample rate for sliced segments.
    pub slice_sample_rate: u32,
    /// Whether slicing materializes wav clips or only computes metadata.
    pub slice_save_audio: bool,
    /// Failure policy for external extraction steps.
    pub error_policy: ErrorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            channel: None,
            slice_sample_rate: 16000,
            slice_save_audio: true,
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Environment variables win over file values. Takes the lookup as a
    /// closure so the override step is testable without touching the
    /// process environment.
    fn apply_env_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = get("GRANARY_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(channel) = get("GRANARY_CHANNEL") {
            self.channel = Some(channel);
        }
        if let Some(rate) = get("GRANARY_SAMPLE_RATE") {
            if let Ok(r) = rate.parse() {
                self.slice_sample_rate = r;
            }
        }
        if let Some(save) = get("GRANARY_SAVE_AUDIO") {
            if let Ok(s) = save.parse() {
                self.slice_save_audio = s;
            }
        }
        if let Some(policy) = get("GRANARY_ERROR_POLICY") {
            if let Ok(p) = policy.parse() {
                self.error_policy = p;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.slice_sample_rate == 0 {
            return Err(GranaryError::Config(
                "Sample rate must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("granary").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_policy_parsing() {
        assert_eq!("fail-fast".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::FailFast);
        assert_eq!("skip".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Skip);
        assert_eq!("SKIP".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Skip);
        assert!("abort".parse::<ErrorPolicy>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.slice_sample_rate, 16000);
        assert!(config.slice_save_audio);
        assert_eq!(config.error_policy, ErrorPolicy::FailFast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_sample_rate() {
        let config = Config {
            slice_sample_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_win_over_file_values() {
        let mut config: Config = toml::from_str(
            r#"
            output_dir = "/data/corpus"
            slice_sample_rate = 22050
            error_policy = "fail-fast"
            "#,
        )
        .unwrap();

        config.apply_env_overrides(|key| match key {
            "GRANARY_SAMPLE_RATE" => Some("8000".to_string()),
            "GRANARY_ERROR_POLICY" => Some("skip".to_string()),
            "GRANARY_SAVE_AUDIO" => Some("false".to_string()),
            _ => None,
        });

        assert_eq!(config.slice_sample_rate, 8000);
        assert_eq!(config.error_policy, ErrorPolicy::Skip);
        assert!(!config.slice_save_audio);
        // Untouched keys keep their file values
        assert_eq!(config.output_dir, PathBuf::from("/data/corpus"));
    }

    #[test]
    fn test_env_overrides_ignore_unparseable_values() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            "GRANARY_SAMPLE_RATE" => Some("not-a-number".to_string()),
            _ => None,
        });
        assert_eq!(config.slice_sample_rate, 16000);
    }

    #[test]
    fn test_config_from_toml() {
        let config: Config = toml::from_str(
            r#"
            output_dir = "/data/corpus"
            channel = "talks"
            slice_sample_rate = 22050
            slice_save_audio = false
            error_policy = "skip"
            "#,
        )
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/data/corpus"));
        assert_eq!(config.channel.as_deref(), Some("talks"));
        assert_eq!(config.slice_sample_rate, 22050);
        assert!(!config.slice_save_audio);
        assert_eq!(config.error_policy, ErrorPolicy::Skip);
    }
}
