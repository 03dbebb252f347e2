use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// How many versions the cache keeps around, the current one included. Values below 1 are
    /// treated as 1.
    pub max_versions: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_versions: 8 }
    }
}

impl CacheConfig {
    pub fn retained_versions(&self) -> usize {
        self.max_versions.max(1)
    }
}

/// Parses `config_string` as TOML, falling back to the defaults when it is missing or invalid.
pub fn get(config_string: Option<&str>) -> CacheConfig {
    config_string
        .and_then(|config_string| match toml::from_str(config_string) {
            Ok(config) => Some(config),
            Err(err) => {
                log::warn!("config parsing failed: {err}");
                None
            }
        })
        .unwrap_or_default()
}

pub fn to_string(config: &CacheConfig) -> String {
    match toml::to_string(config) {
        Ok(config_string) => config_string,
        Err(err) => {
            log::warn!("config serialization failed: {err}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get() {
        assert_eq!(get(None), CacheConfig::default());
        assert_eq!(get(Some("max_versions = 3")).max_versions, 3);
        // unknown keys are ignored, missing keys take their defaults
        assert_eq!(get(Some("other = true")), CacheConfig::default());
        assert_eq!(get(Some("max_versions = \"lots\"")), CacheConfig::default());
    }

    #[test]
    fn test_retained_versions() {
        let config = CacheConfig { max_versions: 0 };
        assert_eq!(config.retained_versions(), 1);
        assert_eq!(get(Some(&to_string(&config))), config);
    }
}
