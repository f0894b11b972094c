use crate::core::dispatcher::TransferLimits;
use crate::domain::model::ProviderKind;
use crate::utils::error::{AggregatorError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_FLIGHT_SERVICE_ENDPOINT: &str =
    "https://flightservice.bharatcrypto.com/api/v1/flight/search";
pub const DEFAULT_TURKISH_SERVICE_ENDPOINT: &str =
    "https://turkishservice.bharatcrypto.com/api/v1/shop/bestprice";

const MAX_FRAME_PACING_MS: u64 = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default)]
    pub aggregator: AggregatorSection,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorSection {
    pub name: String,
    /// 是否把成功結果轉成標準行程格式（預設原樣轉送）
    pub normalize: bool,
    pub frame_pacing_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_seconds: u64,
    pub total_timeout_seconds: u64,
    pub stall_timeout_seconds: u64,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub endpoint: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for AggregatorSection {
    fn default() -> Self {
        Self {
            name: "fare-stream".to_string(),
            normalize: false,
            frame_pacing_ms: 50,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 10,
            total_timeout_seconds: 30,
            stall_timeout_seconds: 10,
            user_agent: None,
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            aggregator: AggregatorSection::default(),
            http: HttpConfig::default(),
            providers: default_providers(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_providers() -> Vec<ProviderConfig> {
    ProviderKind::ALL
        .iter()
        .map(|kind| ProviderConfig {
            kind: *kind,
            endpoint: default_endpoint(*kind).to_string(),
            enabled: true,
        })
        .collect()
}

pub fn default_endpoint(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::FlightService => DEFAULT_FLIGHT_SERVICE_ENDPOINT,
        ProviderKind::TurkishService => DEFAULT_TURKISH_SERVICE_ENDPOINT,
    }
}

impl AggregatorConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AggregatorError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AggregatorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FLIGHT_ENDPOINT})；未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AggregatorError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("aggregator.name", &self.aggregator.name)?;
        validate_range(
            "aggregator.frame_pacing_ms",
            self.aggregator.frame_pacing_ms,
            0,
            MAX_FRAME_PACING_MS,
        )?;

        validate_positive_number(
            "http.connect_timeout_seconds",
            self.http.connect_timeout_seconds,
            1,
        )?;
        validate_positive_number(
            "http.total_timeout_seconds",
            self.http.total_timeout_seconds,
            1,
        )?;
        validate_positive_number(
            "http.stall_timeout_seconds",
            self.http.stall_timeout_seconds,
            1,
        )?;

        let mut seen = HashSet::new();
        for (index, provider) in self.providers.iter().enumerate() {
            validate_url(&format!("providers[{}].endpoint", index), &provider.endpoint)?;
            if !seen.insert(provider.kind) {
                return Err(AggregatorError::InvalidConfigValueError {
                    field: format!("providers[{}].kind", index),
                    value: provider.kind.to_string(),
                    reason: "Provider is configured more than once".to_string(),
                });
            }
        }

        if !self.providers.iter().any(|provider| provider.enabled) {
            return Err(AggregatorError::ConfigValidationError {
                field: "providers".to_string(),
                message: "at least one provider must be enabled".to_string(),
            });
        }

        Ok(())
    }

    /// 依設定順序列出啟用中的供應商
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|provider| provider.enabled)
    }

    pub fn endpoint_for(&self, kind: ProviderKind) -> Option<&str> {
        self.providers
            .iter()
            .find(|provider| provider.kind == kind)
            .map(|provider| provider.endpoint.as_str())
    }

    /// 覆寫（或新增）某個供應商的端點
    pub fn with_endpoint(mut self, kind: ProviderKind, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        match self.providers.iter_mut().find(|provider| provider.kind == kind) {
            Some(provider) => provider.endpoint = endpoint,
            None => self.providers.push(ProviderConfig {
                kind,
                endpoint,
                enabled: true,
            }),
        }
        self
    }

    pub fn normalize(&self) -> bool {
        self.aggregator.normalize
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_seconds)
    }

    pub fn transfer_limits(&self) -> TransferLimits {
        TransferLimits {
            total_timeout: Duration::from_secs(self.http.total_timeout_seconds),
            stall_timeout: Duration::from_secs(self.http.stall_timeout_seconds),
        }
    }

    pub fn frame_pacing(&self) -> Duration {
        Duration::from_millis(self.aggregator.frame_pacing_ms)
    }

    pub fn user_agent(&self) -> String {
        self.http
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("fare-stream/{}", env!("CARGO_PKG_VERSION")))
    }
}

impl Validate for AggregatorConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AggregatorConfig::default();

        assert_eq!(config.aggregator.name, "fare-stream");
        assert!(!config.normalize());
        assert_eq!(config.frame_pacing(), Duration::from_millis(50));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.transfer_limits(), TransferLimits::default());
        assert_eq!(
            config.endpoint_for(ProviderKind::FlightService),
            Some(DEFAULT_FLIGHT_SERVICE_ENDPOINT)
        );
        assert_eq!(config.enabled_providers().count(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[aggregator]
name = "fares-eu"
normalize = true
frame_pacing_ms = 0

[http]
connect_timeout_seconds = 3
total_timeout_seconds = 20
stall_timeout_seconds = 5

[[providers]]
kind = "flightservice"
endpoint = "https://flights.example.com/search"
enabled = false

[[providers]]
kind = "turkishservice"
endpoint = "https://shop.example.com/bestprice"
"#;

        let config = AggregatorConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.aggregator.name, "fares-eu");
        assert!(config.normalize());
        assert!(config.frame_pacing().is_zero());
        assert_eq!(config.transfer_limits().stall_timeout, Duration::from_secs(5));

        let enabled: Vec<ProviderKind> = config.enabled_providers().map(|p| p.kind).collect();
        assert_eq!(enabled, vec![ProviderKind::TurkishService]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let config = AggregatorConfig::from_toml_str("[aggregator]\nnormalize = true\n").unwrap();
        assert!(config.normalize());
        assert_eq!(config.aggregator.frame_pacing_ms, 50);
        assert_eq!(config.http.total_timeout_seconds, 30);
        assert_eq!(config.providers.len(), 2);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("FARE_STREAM_TEST_SHOP_URL", "https://shop.test.com/bestprice");

        let toml_content = r#"
[[providers]]
kind = "turkishservice"
endpoint = "${FARE_STREAM_TEST_SHOP_URL}"
"#;

        let config = AggregatorConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.endpoint_for(ProviderKind::TurkishService),
            Some("https://shop.test.com/bestprice")
        );

        std::env::remove_var("FARE_STREAM_TEST_SHOP_URL");
    }

    #[test]
    fn test_unset_variable_is_left_untouched_and_fails_validation() {
        let toml_content = r#"
[[providers]]
kind = "flightservice"
endpoint = "${FARE_STREAM_TEST_NEVER_SET}"
"#;

        let config = AggregatorConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.endpoint_for(ProviderKind::FlightService),
            Some("${FARE_STREAM_TEST_NEVER_SET}")
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_provider_kind_is_rejected() {
        let toml_content = r#"
[[providers]]
kind = "skyscanner"
endpoint = "https://example.com"
"#;
        assert!(AggregatorConfig::from_toml_str(toml_content).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut zero_timeout = AggregatorConfig::default();
        zero_timeout.http.stall_timeout_seconds = 0;
        assert!(zero_timeout.validate().is_err());

        let mut duplicated = AggregatorConfig::default();
        duplicated.providers.push(ProviderConfig {
            kind: ProviderKind::FlightService,
            endpoint: "https://other.example.com".to_string(),
            enabled: true,
        });
        let err = duplicated.validate().unwrap_err();
        assert!(err.to_string().contains("providers[2].kind"));

        let mut none_enabled = AggregatorConfig::default();
        for provider in &mut none_enabled.providers {
            provider.enabled = false;
        }
        assert!(none_enabled.validate().is_err());

        let mut slow_pacing = AggregatorConfig::default();
        slow_pacing.aggregator.frame_pacing_ms = 60_000;
        assert!(slow_pacing.validate().is_err());
    }

    #[test]
    fn test_with_endpoint_overrides_existing_provider() {
        let config = AggregatorConfig::default()
            .with_endpoint(ProviderKind::FlightService, "http://127.0.0.1:9000/search");
        assert_eq!(config.providers.len(), 2);
        assert_eq!(
            config.endpoint_for(ProviderKind::FlightService),
            Some("http://127.0.0.1:9000/search")
        );
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[aggregator]
name = "file-test"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = AggregatorConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.aggregator.name, "file-test");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AggregatorConfig::from_file("/nonexistent/fare-stream.toml").unwrap_err();
        assert!(matches!(err, AggregatorError::IoError(_)));
    }
}
