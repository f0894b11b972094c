use crate::config::toml_config::AggregatorConfig;
use crate::domain::model::{Credentials, SearchQuery};
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;
use std::fmt;
use tracing::warn;

#[derive(Clone, Parser)]
#[command(name = "fare-stream")]
#[command(about = "Query every flight provider concurrently and stream each answer as it arrives")]
pub struct CliConfig {
    #[arg(long, help = "Path to the search query JSON file")]
    pub query: String,

    #[arg(long, help = "Path to the TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, env = "FARE_STREAM_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    #[arg(long, env = "FARE_STREAM_SESSION_ID", hide_env_values = true)]
    pub session_id: Option<String>,

    #[arg(long, env = "FARE_STREAM_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    #[arg(long, help = "Normalize provider payloads into one itinerary shape")]
    pub normalize: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Write logs as JSON lines")]
    pub log_json: bool,
}

// 憑證不可出現在日誌中
impl fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let presence = |value: &Option<String>| if value.is_some() { "<redacted>" } else { "<unset>" };
        f.debug_struct("CliConfig")
            .field("query", &self.query)
            .field("config", &self.config)
            .field("auth_token", &presence(&self.auth_token))
            .field("session_id", &presence(&self.session_id))
            .field("session_token", &presence(&self.session_token))
            .field("normalize", &self.normalize)
            .field("verbose", &self.verbose)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl CliConfig {
    /// 憑證原樣轉送；未提供的欄位送出空字串，只記錄欄位名稱
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            passthrough("auth_token", &self.auth_token),
            passthrough("session_id", &self.session_id),
            passthrough("session_token", &self.session_token),
        )
    }

    pub fn load_query(&self) -> Result<SearchQuery> {
        let content = std::fs::read_to_string(&self.query)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 沒有指定設定檔時使用預設值；`--normalize` 會覆寫設定檔
    pub fn load_aggregator_config(&self) -> Result<AggregatorConfig> {
        let mut config = match &self.config {
            Some(path) => AggregatorConfig::from_file(path)?,
            None => AggregatorConfig::default(),
        };
        if self.normalize {
            config.aggregator.normalize = true;
        }
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("query", &self.query)?;
        if let Some(path) = &self.config {
            validate_path("config", path)?;
        }
        Ok(())
    }
}

fn passthrough(field: &str, value: &Option<String>) -> String {
    match value {
        Some(value) => value.clone(),
        None => {
            warn!(field, "Credential not supplied, forwarding an empty value");
            String::new()
        }
    }
}
