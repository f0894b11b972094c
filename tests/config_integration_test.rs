use fare_stream::utils::validation::Validate;
use fare_stream::{AggregatorConfig, Credentials, FrameWriter, SearchAggregator, SearchQuery};
use httpmock::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_end_to_end_with_toml_config() {
    // Setup mock HTTP server
    let server = MockServer::start_async().await;
    let shop_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/shop/bestprice")
                .json_body_partial(r#"{"SpecialFare": true, "dossierCode": "DX-7"}"#);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "success": true,
                    "result": {"data": {"OfferID": "OF-7", "Price": {"TotalAmount": 99}}}
                }));
        })
        .await;

    // 端點透過環境變數帶入；flightservice 停用
    std::env::set_var("FARE_STREAM_IT_SHOP_URL", server.url("/shop/bestprice"));
    let mut config_file = NamedTempFile::new().unwrap();
    config_file
        .write_all(
            br#"
[aggregator]
name = "integration"
normalize = true
frame_pacing_ms = 0

[http]
total_timeout_seconds = 5

[[providers]]
kind = "flightservice"
endpoint = "https://flightservice.bharatcrypto.com/api/v1/flight/search"
enabled = false

[[providers]]
kind = "turkishservice"
endpoint = "${FARE_STREAM_IT_SHOP_URL}"
"#,
        )
        .unwrap();

    let config = AggregatorConfig::from_file(config_file.path()).unwrap();
    std::env::remove_var("FARE_STREAM_IT_SHOP_URL");
    assert!(config.validate().is_ok());

    let query: SearchQuery = serde_json::from_value(serde_json::json!({
        "dossierId": "7",
        "dossierCode": "DX-7",
        "locale": "en",
        "currency": "USD",
        "cabinPref": "Business",
        "pax": {"adult": 1, "senior": 1},
        "routes": [{"origin": "IST", "destination": "LHR", "departureDate": "2025-11-05T09:00:00"}],
        "SpecialFare": true
    }))
    .unwrap();

    let aggregator = SearchAggregator::new(config).unwrap();
    let mut writer = FrameWriter::new(Vec::new());
    let summary = aggregator
        .run(&query, &Credentials::new("Bearer it", "sid", "stok"), &mut writer)
        .await
        .unwrap();

    // Verify results
    shop_mock.assert_async().await;
    assert_eq!(summary.frames, 1);
    assert_eq!(summary.succeeded, 1);

    let output = String::from_utf8(writer.into_inner()).unwrap();
    let payload: serde_json::Value =
        serde_json::from_str(output.trim_end().strip_prefix("data: ").unwrap()).unwrap();
    assert_eq!(payload["type"], "turkishservice");
    assert_eq!(payload["data"][0]["itineraryId"], "OF-7");
    assert_eq!(payload["data"][0]["fare"]["totalAmount"], 99.0);
}

#[test]
fn test_invalid_endpoint_in_config_is_rejected() {
    let toml_content = r#"
[[providers]]
kind = "turkishservice"
endpoint = "not a url"
"#;

    let config = AggregatorConfig::from_toml_str(toml_content).unwrap();
    let err = SearchAggregator::new(config).err().unwrap();
    assert!(err.to_string().contains("providers[0].endpoint"));
}

#[test]
fn test_shipped_sample_config_loads_without_environment() {
    use fare_stream::config::toml_config::default_endpoint;
    use fare_stream::ProviderKind;

    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fare-stream.toml");
    let config = AggregatorConfig::from_file(path).unwrap();

    assert!(config.validate().is_ok());
    for kind in ProviderKind::ALL {
        assert_eq!(config.endpoint_for(kind), Some(default_endpoint(kind)));
    }
    assert!(SearchAggregator::new(config).is_ok());
}
