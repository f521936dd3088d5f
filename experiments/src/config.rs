use envconfig::Envconfig;
use once_cell::sync::Lazy;
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexBool(pub bool);

impl FromStr for FlexBool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(FlexBool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(FlexBool(false)),
            _ => Err(format!("Invalid boolean value: {}", s)),
        }
    }
}

impl From<FlexBool> for bool {
    fn from(flex: FlexBool) -> Self {
        flex.0
    }
}

impl Deref for FlexBool {
    type Target = bool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "ACCOUNT_ID", default = "")]
    pub account_id: String,

    #[envconfig(from = "SDK_KEY", default = "")]
    pub sdk_key: String,

    // When set, settings are read from this file instead of being fetched
    #[envconfig(from = "SETTINGS_FILE", default = "")]
    pub settings_file: String,

    #[envconfig(
        from = "SETTINGS_BASE_URL",
        default = "https://dev.visualwebsiteoptimizer.com"
    )]
    pub settings_base_url: String,

    #[envconfig(
        from = "EVENTS_BASE_URL",
        default = "https://dev.visualwebsiteoptimizer.com"
    )]
    pub events_base_url: String,

    #[envconfig(from = "DEVELOPMENT_MODE", default = "false")]
    pub development_mode: FlexBool,

    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "5000")]
    pub request_timeout_ms: u64,

    #[envconfig(from = "STORE_TIMEOUT_MS", default = "100")]
    pub store_timeout_ms: u64,

    // Empty disables the sticky store
    #[envconfig(from = "REDIS_URL", default = "")]
    pub redis_url: String,

    #[envconfig(from = "DEBUG", default = "false")]
    pub debug: FlexBool,
}

impl Config {
    pub fn default_test_config() -> Self {
        Self {
            account_id: "60781".to_string(),
            sdk_key: "test-sdk-key".to_string(),
            settings_file: "".to_string(),
            settings_base_url: "http://localhost:8000".to_string(),
            events_base_url: "http://localhost:8000".to_string(),
            development_mode: FlexBool(true),
            request_timeout_ms: 1000,
            store_timeout_ms: 100,
            redis_url: "".to_string(),
            debug: FlexBool(false),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn settings_file_path(&self) -> Option<PathBuf> {
        if self.settings_file.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.settings_file))
        }
    }

    pub fn redis_url(&self) -> Option<&str> {
        if self.redis_url.is_empty() {
            None
        } else {
            Some(&self.redis_url)
        }
    }
}

pub static DEFAULT_TEST_CONFIG: Lazy<Config> = Lazy::new(Config::default_test_config);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(config.account_id, "");
        assert_eq!(
            config.settings_base_url,
            "https://dev.visualwebsiteoptimizer.com"
        );
        assert_eq!(config.events_base_url, config.settings_base_url);
        assert_eq!(config.development_mode, FlexBool(false));
        assert_eq!(config.request_timeout(), Duration::from_millis(5000));
        assert_eq!(config.store_timeout(), Duration::from_millis(100));
        assert_eq!(config.redis_url(), None);
        assert_eq!(config.settings_file_path(), None);
        assert_eq!(config.debug, FlexBool(false));
    }

    #[test]
    fn test_config_from_values() {
        let values = HashMap::from([
            ("ACCOUNT_ID".to_string(), "88888".to_string()),
            ("DEVELOPMENT_MODE".to_string(), "yes".to_string()),
            ("STORE_TIMEOUT_MS".to_string(), "25".to_string()),
            ("REDIS_URL".to_string(), "redis://localhost:6379/".to_string()),
            ("SETTINGS_FILE".to_string(), "/tmp/settings.json".to_string()),
        ]);
        let config = Config::init_from_hashmap(&values).unwrap();

        assert_eq!(config.account_id, "88888");
        assert!(*config.development_mode);
        assert_eq!(config.store_timeout(), Duration::from_millis(25));
        assert_eq!(config.redis_url(), Some("redis://localhost:6379/"));
        assert_eq!(
            config.settings_file_path(),
            Some(PathBuf::from("/tmp/settings.json"))
        );
    }

    #[test]
    fn test_flex_bool() {
        assert_eq!(FlexBool::from_str("ON").unwrap(), FlexBool(true));
        assert_eq!(FlexBool::from_str(" 0 ").unwrap(), FlexBool(false));
        assert!(FlexBool::from_str("maybe").is_err());
    }

    #[test]
    fn test_default_test_config() {
        let config = Config::default_test_config();
        assert!(*config.development_mode);
        assert_eq!(config.account_id, "60781");
        assert_eq!(DEFAULT_TEST_CONFIG.sdk_key, "test-sdk-key");
    }
}
