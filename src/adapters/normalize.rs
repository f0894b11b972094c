//! Canonical itinerary shape shared by every provider.
//!
//! Normalization is tolerant by contract: missing strings become `null`,
//! missing amounts `0`, a missing currency `"USD"` and missing lists `[]`.
//! It never fails.

use crate::domain::model::ProviderKind;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItinerary {
    pub itinerary_id: Value,
    pub fare: NormalizedFare,
    pub segments: Vec<NormalizedSegment>,
    pub passengers: Vec<NormalizedPassenger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baggage: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<Value>>,
    pub source: ProviderKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedFare {
    pub total_amount: f64,
    pub currency: String,
    pub base_fare: f64,
    pub tax_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSegment {
    pub origin: Value,
    pub destination: Value,
    pub departure_time: Value,
    pub arrival_time: Value,
    pub carrier: Value,
    pub flight_number: Value,
    pub aircraft: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedPassenger {
    /// 有票價明細的旅客（flightservice）
    #[serde(rename_all = "camelCase")]
    Priced {
        #[serde(rename = "type")]
        passenger_type: Value,
        fare: f64,
        currency: String,
        baggage: Value,
        penalties: Value,
        seats: Vec<SeatAvailability>,
    },
    /// 只有參照編號的旅客（turkishservice）
    #[serde(rename_all = "camelCase")]
    Reference { passenger_ref: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAvailability {
    pub cabin_type: Value,
    pub seats_available: Value,
    pub booking_code: Value,
}

pub(crate) fn value_at(value: &Value, pointer: &str) -> Value {
    value.pointer(pointer).cloned().unwrap_or(Value::Null)
}

/// 缺少或不是陣列時回傳空陣列
pub(crate) fn list_or_empty(value: &Value, pointer: &str) -> Value {
    match value.pointer(pointer) {
        Some(Value::Null) | None => Value::Array(Vec::new()),
        Some(found) => found.clone(),
    }
}

pub(crate) fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// 金額欄位：數字或數字字串，其他情況為 0
pub(crate) fn amount_at(value: &Value, pointer: &str) -> f64 {
    match value.pointer(pointer) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub(crate) fn text_or(value: &Value, pointer: &str, default: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}
