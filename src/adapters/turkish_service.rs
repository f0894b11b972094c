use crate::adapters::mapping::{cabin_code, expand_passengers, PassengerCodeTable, PassengerRecord};
use crate::adapters::normalize::{
    amount_at, array_at, list_or_empty, value_at, NormalizedFare, NormalizedItinerary,
    NormalizedPassenger, NormalizedSegment, DEFAULT_CURRENCY,
};
use crate::domain::model::{DossierId, ProviderKind, SearchQuery};
use serde::Serialize;
use serde_json::Value;

const SERVICE_TYPE_ID: u32 = 7;
const PREFERENCE_LEVEL: &str = "Preferred";

#[derive(Debug, Serialize)]
pub struct FareShopBody<'a> {
    #[serde(rename = "dossierId")]
    pub dossier_id: &'a DossierId,
    #[serde(rename = "serviceTypeId")]
    pub service_type_id: u32,
    #[serde(rename = "dossierCode")]
    pub dossier_code: &'a str,
    #[serde(rename = "SpecialFare")]
    pub special_fare: bool,
    #[serde(rename = "Pax")]
    pub pax: Vec<PassengerRecord>,
    pub trip: Vec<TripLeg<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TripLeg<'a> {
    pub departure_location: &'a str,
    pub arrival_location: &'a str,
    pub departure_date: &'a str,
    pub cabin_types: [CabinPreference; 1],
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CabinPreference {
    pub cabin_type_code: u8,
    pub preference_level: &'static str,
}

/// 旅客展開成一人一筆，航段只帶出發日期與艙等代碼
pub fn build_body(query: &SearchQuery) -> FareShopBody<'_> {
    let cabin = CabinPreference {
        cabin_type_code: cabin_code(query.cabin()),
        preference_level: PREFERENCE_LEVEL,
    };

    FareShopBody {
        dossier_id: &query.dossier_id,
        service_type_id: SERVICE_TYPE_ID,
        dossier_code: &query.dossier_code,
        special_fare: query.special_fare,
        pax: expand_passengers(&query.pax, PassengerCodeTable::TurkishService),
        trip: query
            .routes
            .iter()
            .map(|route| TripLeg {
                departure_location: &route.origin,
                arrival_location: &route.destination,
                departure_date: route.departure_day(),
                cabin_types: [cabin],
            })
            .collect(),
    }
}

/// `result.data` 可能是報價陣列，也可能是單一報價
pub fn normalize(decoded: &Value) -> Vec<NormalizedItinerary> {
    let offers: Vec<&Value> = match decoded.pointer("/result/data") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(fields)) if !fields.is_empty() => vec![&decoded["result"]["data"]],
        _ => Vec::new(),
    };

    offers.into_iter().map(normalize_offer).collect()
}

fn normalize_offer(offer: &Value) -> NormalizedItinerary {
    NormalizedItinerary {
        itinerary_id: value_at(offer, "/OfferID"),
        fare: NormalizedFare {
            total_amount: amount_at(offer, "/Price/TotalAmount"),
            // 報價中沒有幣別欄位
            currency: DEFAULT_CURRENCY.to_string(),
            base_fare: amount_at(offer, "/Price/EquivAmount"),
            tax_amount: amount_at(offer, "/Price/TaxSummary/TotalTaxAmount"),
        },
        segments: array_at(offer, "/legs")
            .iter()
            .flat_map(|leg| match leg {
                Value::Array(segments) => segments.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
            .map(normalize_segment)
            .collect(),
        passengers: array_at(offer, "/PaxRefIDs")
            .iter()
            .map(|pax_ref| NormalizedPassenger::Reference {
                passenger_ref: pax_ref.clone(),
            })
            .collect(),
        baggage: Some(list_or_empty(offer, "/baggageAllowance")),
        services: Some(
            array_at(offer, "/serviceDefinition")
                .iter()
                .map(|service| value_at(service, "/Name"))
                .collect(),
        ),
        source: ProviderKind::TurkishService,
    }
}

fn normalize_segment(segment: &Value) -> NormalizedSegment {
    NormalizedSegment {
        origin: value_at(segment, "/Departure/IATA_LocationCode"),
        destination: value_at(segment, "/Arrival/IATA_LocationCode"),
        departure_time: value_at(segment, "/Departure/AircraftScheduledDateTime"),
        arrival_time: value_at(segment, "/Arrival/AircraftScheduledDateTime"),
        carrier: value_at(segment, "/CarrierDesigCode"),
        flight_number: value_at(segment, "/MarketingCarrierFlightNumberText"),
        aircraft: value_at(segment, "/CarrierAircraftType/IATA_AircraftTypeCode"),
    }
}
