//! Provider adapters.
//!
//! 每個 `ProviderKind` 變體各自負責組請求、分類回應與（選用的）正規化，
//! 分派器與串流只透過這裡的方法接觸供應商差異。

pub mod eligibility;
pub mod flight_service;
pub mod mapping;
pub mod normalize;
pub mod turkish_service;

use crate::domain::model::{
    Credentials, PassengerType, ProviderKind, ProviderOutcome, ProviderRequest, SearchQuery,
    StreamEvent,
};
use crate::utils::error::Result;
use self::normalize::NormalizedItinerary;
use serde_json::{json, Value};
use std::collections::BTreeSet;

impl ProviderKind {
    /// 組出此供應商的完整請求；本體序列化一次後不再變動
    pub fn build_request(
        &self,
        endpoint: &str,
        query: &SearchQuery,
        credentials: &Credentials,
    ) -> Result<ProviderRequest> {
        let body = match self {
            ProviderKind::FlightService => serde_json::to_string(&flight_service::build_body(query))?,
            ProviderKind::TurkishService => {
                serde_json::to_string(&turkish_service::build_body(query))?
            }
        };

        Ok(ProviderRequest {
            provider: *self,
            url: endpoint.to_string(),
            body,
            headers: request_headers(credentials),
        })
    }

    pub fn classify(&self, http_status: u16, raw_body: &str) -> ProviderOutcome {
        classify_json(*self, http_status, raw_body)
    }

    pub fn should_skip(&self, pax_types: &BTreeSet<PassengerType>) -> bool {
        eligibility::should_skip(*self, pax_types)
    }

    pub fn normalize(&self, decoded: &Value) -> Vec<NormalizedItinerary> {
        match self {
            ProviderKind::FlightService => flight_service::normalize(decoded),
            ProviderKind::TurkishService => turkish_service::normalize(decoded),
        }
    }

    /// 成功時送給客戶端的內容：原樣的 `result.data`，或正規化後的行程陣列
    pub fn success_payload(&self, decoded: &Value, normalize: bool) -> Value {
        if normalize {
            serde_json::to_value(self.normalize(decoded)).unwrap_or_default()
        } else {
            decoded.pointer("/result/data").cloned().unwrap_or(Value::Null)
        }
    }

    /// 每個結果剛好對應一個 frame
    pub fn event_for(&self, outcome: &ProviderOutcome, normalize: bool) -> StreamEvent {
        let data = match outcome {
            ProviderOutcome::Success { decoded, .. } => self.success_payload(decoded, normalize),
            ProviderOutcome::UpstreamError { message }
            | ProviderOutcome::TransportError { message } => json!({ "error": message }),
            ProviderOutcome::MalformedResponse { message, raw } => {
                json!({ "error": message, "raw": raw })
            }
            ProviderOutcome::Skipped { reason } => json!({ "error": reason }),
        };
        StreamEvent::new(*self, data)
    }
}

fn request_headers(credentials: &Credentials) -> Vec<(String, String)> {
    vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Authorization".to_string(), credentials.auth_token.clone()),
        ("sessionid".to_string(), credentials.session_id.clone()),
        ("sessiontoken".to_string(), credentials.session_token.clone()),
    ]
}

/// 兩個供應商共用同一套 `{success, message, result: {data}}` 外殼
fn classify_json(provider: ProviderKind, http_status: u16, raw_body: &str) -> ProviderOutcome {
    let decoded: Value = match serde_json::from_str(raw_body) {
        Ok(value) => value,
        Err(_) => {
            return ProviderOutcome::MalformedResponse {
                message: format!("Invalid JSON from {}", provider),
                raw: raw_body.to_string(),
            }
        }
    };

    match decoded.get("success") {
        Some(Value::Bool(false)) => ProviderOutcome::UpstreamError {
            message: decoded
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("No message")
                .to_string(),
        },
        None if !(200..300).contains(&http_status) => ProviderOutcome::UpstreamError {
            message: format!("upstream returned HTTP {}", http_status),
        },
        _ => ProviderOutcome::Success {
            http_status,
            raw_body: raw_body.to_string(),
            decoded,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::NO_DATA_FOUND;

    fn query() -> SearchQuery {
        serde_json::from_value(json!({
            "dossierId": 5,
            "dossierCode": "DX-5",
            "locale": "en",
            "currency": "USD",
            "cabinPref": "First",
            "pax": {"adult": 1},
            "routes": [{"origin": "DAC", "destination": "IST", "departureDate": "2025-09-01T00:00:00"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_build_request_carries_credentials_as_headers() {
        let credentials = Credentials::new("Bearer t", "sid", "stok");
        let request = ProviderKind::TurkishService
            .build_request("http://localhost/shop", &query(), &credentials)
            .unwrap();

        assert_eq!(request.provider, ProviderKind::TurkishService);
        assert_eq!(request.url, "http://localhost/shop");
        assert!(request
            .headers
            .contains(&("Authorization".to_string(), "Bearer t".to_string())));
        assert!(request
            .headers
            .contains(&("sessionid".to_string(), "sid".to_string())));
        assert!(request
            .headers
            .contains(&("sessiontoken".to_string(), "stok".to_string())));

        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["trip"][0]["CabinTypes"][0]["CabinTypeCode"], json!(1));
    }

    #[test]
    fn test_request_debug_hides_header_values() {
        let credentials = Credentials::new("Bearer secret", "sid-9", "stok-9");
        let request = ProviderKind::FlightService
            .build_request("http://localhost/search", &query(), &credentials)
            .unwrap();
        let rendered = format!("{:?}", request);
        assert!(rendered.contains("Authorization"));
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("stok-9"));
    }

    #[test]
    fn test_classify_success_extracts_result_data() {
        let raw = r#"{"success": true, "result": {"data": {"offers": [1, 2]}}}"#;
        let outcome = ProviderKind::FlightService.classify(200, raw);
        assert!(outcome.is_success());

        let event = ProviderKind::FlightService.event_for(&outcome, false);
        assert_eq!(event.data, json!({"offers": [1, 2]}));
    }

    #[test]
    fn test_classify_success_without_result_data_is_null() {
        let outcome = ProviderKind::TurkishService.classify(200, r#"{"success": true}"#);
        let event = ProviderKind::TurkishService.event_for(&outcome, false);
        assert_eq!(event.data, Value::Null);
    }

    #[test]
    fn test_classify_success_false_uses_provider_message() {
        let outcome =
            ProviderKind::FlightService.classify(200, r#"{"success": false, "message": "Session expired"}"#);
        assert_eq!(
            outcome,
            ProviderOutcome::UpstreamError {
                message: "Session expired".to_string()
            }
        );

        let silent = ProviderKind::FlightService.classify(200, r#"{"success": false}"#);
        assert_eq!(
            silent,
            ProviderOutcome::UpstreamError {
                message: "No message".to_string()
            }
        );
    }

    #[test]
    fn test_classify_invalid_json_keeps_raw_body() {
        let outcome = ProviderKind::TurkishService.classify(200, "<html>gateway</html>");
        let event = ProviderKind::TurkishService.event_for(&outcome, false);
        assert_eq!(
            event.data,
            json!({"error": "Invalid JSON from turkishservice", "raw": "<html>gateway</html>"})
        );
    }

    #[test]
    fn test_classify_http_error_without_success_flag() {
        let outcome = ProviderKind::FlightService.classify(502, r#"{"detail": "bad gateway"}"#);
        assert_eq!(
            outcome,
            ProviderOutcome::UpstreamError {
                message: "upstream returned HTTP 502".to_string()
            }
        );

        // 明確的 success 旗標優先於 HTTP 狀態碼
        let flagged = ProviderKind::FlightService.classify(500, r#"{"success": true, "result": {"data": []}}"#);
        assert!(flagged.is_success());
    }

    #[test]
    fn test_error_and_skip_payloads() {
        let transport = ProviderOutcome::TransportError {
            message: "connection refused".to_string(),
        };
        assert_eq!(
            ProviderKind::FlightService.event_for(&transport, true).data,
            json!({"error": "connection refused"})
        );

        let skipped = ProviderOutcome::Skipped {
            reason: NO_DATA_FOUND.to_string(),
        };
        let event = ProviderKind::FlightService.event_for(&skipped, false);
        assert_eq!(event.provider, ProviderKind::FlightService);
        assert_eq!(event.data, json!({"error": "No data found"}));
    }

    #[test]
    fn test_success_payload_normalizes_when_enabled() {
        let decoded = json!({"success": true, "result": {"data": [{"OfferID": "X"}]}});
        let payload = ProviderKind::TurkishService.success_payload(&decoded, true);
        assert_eq!(payload[0]["itineraryId"], json!("X"));
        assert_eq!(payload[0]["fare"]["currency"], json!("USD"));
        assert_eq!(payload[0]["fare"]["totalAmount"], json!(0.0));
        assert_eq!(payload[0]["source"], json!("turkishservice"));

        let raw = ProviderKind::TurkishService.success_payload(&decoded, false);
        assert_eq!(raw, json!([{"OfferID": "X"}]));
    }

    #[test]
    fn test_should_skip_delegates_to_eligibility() {
        let students = BTreeSet::from([PassengerType::Student]);
        assert!(ProviderKind::FlightService.should_skip(&students));
        assert!(!ProviderKind::TurkishService.should_skip(&students));
    }
}
