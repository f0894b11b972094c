use crate::utils::error::{AggregatorError, Result};
use crate::utils::validation::Validate;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// 被略過的供應商送給客戶端的原因
pub const NO_DATA_FOUND: &str = "No data found";

/// 單一旅客類型與整筆查詢的人數上限
pub const MAX_PASSENGERS: u64 = 99;

/// 上游供應商（封閉集合，每個變體對應一組 adapter）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    FlightService,
    TurkishService,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::FlightService, ProviderKind::TurkishService];

    /// 串流 frame 中 `type` 欄位使用的穩定名稱
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::FlightService => "flightservice",
            ProviderKind::TurkishService => "turkishservice",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassengerType {
    Adult,
    Child,
    Infant,
    Student,
    Labor,
    Senior,
    Loyalty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CabinClass {
    Economy,
    Business,
    First,
    Unknown,
}

impl CabinClass {
    /// 無法辨識的字串（包含空字串）一律視為 Unknown
    pub fn parse(value: &str) -> Self {
        match value {
            "Economy" => CabinClass::Economy,
            "Business" => CabinClass::Business,
            "First" => CabinClass::First,
            _ => CabinClass::Unknown,
        }
    }
}

/// 訂單編號可能是數字也可能是字串，原樣轉送
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DossierId {
    Number(i64),
    Text(String),
}

impl fmt::Display for DossierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DossierId::Number(n) => write!(f, "{}", n),
            DossierId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
}

impl Route {
    /// 出發時間的日期部分（截斷在 `T` 之前）
    pub fn departure_day(&self) -> &str {
        self.departure_date
            .split_once('T')
            .map_or(self.departure_date.as_str(), |(day, _)| day)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub dossier_id: DossierId,
    pub dossier_code: String,
    pub locale: String,
    pub currency: String,
    #[serde(default)]
    pub cabin_pref: String,
    pub routes: Vec<Route>,
    pub pax: BTreeMap<PassengerType, u32>,
    #[serde(rename = "SpecialFare", default)]
    pub special_fare: bool,
}

impl SearchQuery {
    pub fn cabin(&self) -> CabinClass {
        CabinClass::parse(&self.cabin_pref)
    }

    /// 實際有人數的旅客類型
    pub fn requested_passenger_types(&self) -> BTreeSet<PassengerType> {
        self.pax
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(pax_type, _)| *pax_type)
            .collect()
    }

    /// 以 u64 加總，任何 u32 人數組合都不會溢位
    pub fn total_passengers(&self) -> u64 {
        self.pax.values().map(|count| u64::from(*count)).sum()
    }
}

impl Validate for SearchQuery {
    fn validate(&self) -> Result<()> {
        if self.routes.is_empty() {
            return Err(invalid_query("at least one route is required"));
        }
        if self.pax.is_empty() {
            return Err(invalid_query("pax mapping must not be empty"));
        }
        if let Some((pax_type, count)) = self
            .pax
            .iter()
            .find(|(_, count)| u64::from(**count) > MAX_PASSENGERS)
        {
            return Err(invalid_query(&format!(
                "pax.{:?} = {} exceeds the limit of {} passengers",
                pax_type, count, MAX_PASSENGERS
            )));
        }
        let total = self.total_passengers();
        if total == 0 {
            return Err(invalid_query("at least one passenger is required"));
        }
        if total > MAX_PASSENGERS {
            return Err(invalid_query(&format!(
                "{} passengers exceed the limit of {} per query",
                total, MAX_PASSENGERS
            )));
        }

        for (index, route) in self.routes.iter().enumerate() {
            if route.origin.trim().is_empty() || route.destination.trim().is_empty() {
                return Err(invalid_query(&format!(
                    "routes[{}] needs both origin and destination",
                    index
                )));
            }
            if NaiveDate::parse_from_str(route.departure_day(), "%Y-%m-%d").is_err() {
                return Err(invalid_query(&format!(
                    "routes[{}].departureDate '{}' is not a YYYY-MM-DD date",
                    index, route.departure_date
                )));
            }
        }

        Ok(())
    }
}

fn invalid_query(message: &str) -> AggregatorError {
    AggregatorError::InvalidQuery {
        message: message.to_string(),
    }
}

/// 由外層轉交的憑證，原封不動送給每個供應商
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub auth_token: String,
    pub session_id: String,
    pub session_token: String,
}

impl Credentials {
    pub fn new(
        auth_token: impl Into<String>,
        session_id: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            auth_token: auth_token.into(),
            session_id: session_id.into(),
            session_token: session_token.into(),
        }
    }
}

// 憑證不可出現在日誌中
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_token", &"<redacted>")
            .field("session_id", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// 建好後不再變動的單一供應商請求
#[derive(Clone)]
pub struct ProviderRequest {
    pub provider: ProviderKind,
    pub url: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl fmt::Debug for ProviderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ProviderRequest")
            .field("provider", &self.provider)
            .field("url", &self.url)
            .field("body_bytes", &self.body.len())
            .field("headers", &header_names)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Success {
        http_status: u16,
        raw_body: String,
        decoded: serde_json::Value,
    },
    UpstreamError {
        message: String,
    },
    TransportError {
        message: String,
    },
    MalformedResponse {
        message: String,
        raw: String,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    UpstreamError,
    TransportError,
    MalformedResponse,
    Skipped,
}

impl ProviderOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            ProviderOutcome::Success { .. } => OutcomeKind::Success,
            ProviderOutcome::UpstreamError { .. } => OutcomeKind::UpstreamError,
            ProviderOutcome::TransportError { .. } => OutcomeKind::TransportError,
            ProviderOutcome::MalformedResponse { .. } => OutcomeKind::MalformedResponse,
            ProviderOutcome::Skipped { .. } => OutcomeKind::Skipped,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProviderOutcome::Success { .. })
    }
}

/// 一個串流 frame：`{"type": <provider>, "data": <payload>}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub provider: ProviderKind,
    pub data: serde_json::Value,
}

impl StreamEvent {
    pub fn new(provider: ProviderKind, data: serde_json::Value) -> Self {
        Self { provider, data }
    }
}
