use crate::adapters::normalize::{
    amount_at, array_at, list_or_empty, text_or, value_at, NormalizedFare, NormalizedItinerary,
    NormalizedPassenger, NormalizedSegment, SeatAvailability, DEFAULT_CURRENCY,
};
use crate::domain::model::{DossierId, PassengerType, ProviderKind, Route, SearchQuery};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const SERVICE_TYPE_ID: u32 = 1;
// 學生與勞工票種不送給 flightservice
const PASSENGER_TYPES: [&str; 3] = ["PNOS", "PCIL", "PINF"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSearchBody<'a> {
    pub dossier_id: &'a DossierId,
    pub dossier_code: &'a str,
    pub service_type_id: u32,
    pub locale: &'a str,
    pub currency: &'a str,
    pub pax: &'a BTreeMap<PassengerType, u32>,
    pub cabin_pref: &'a str,
    pub passenger_types: [&'static str; 3],
    pub routes: &'a [Route],
    pub currency_code: &'a str,
}

/// 人數與艙等字串原樣轉送，航段保留完整的 ISO 出發時間
pub fn build_body(query: &SearchQuery) -> FlightSearchBody<'_> {
    FlightSearchBody {
        dossier_id: &query.dossier_id,
        dossier_code: &query.dossier_code,
        service_type_id: SERVICE_TYPE_ID,
        locale: &query.locale,
        currency: &query.currency,
        pax: &query.pax,
        cabin_pref: &query.cabin_pref,
        passenger_types: PASSENGER_TYPES,
        routes: &query.routes,
        currency_code: &query.currency,
    }
}

/// `result.data.itineraryGroup[0].flights` 轉成標準行程
pub fn normalize(decoded: &Value) -> Vec<NormalizedItinerary> {
    array_at(decoded, "/result/data/itineraryGroup/0/flights")
        .iter()
        .map(normalize_flight)
        .collect()
}

fn normalize_flight(flight: &Value) -> NormalizedItinerary {
    NormalizedItinerary {
        itinerary_id: value_at(flight, "/itineraryId"),
        fare: NormalizedFare {
            total_amount: amount_at(flight, "/pricingInformation/0/totalFare/totalPrice"),
            currency: text_or(
                flight,
                "/pricingInformation/0/totalFare/currency",
                DEFAULT_CURRENCY,
            ),
            base_fare: amount_at(flight, "/pricingInformation/0/totalFare/baseFareAmount"),
            tax_amount: amount_at(flight, "/pricingInformation/0/totalFare/totalTaxAmount"),
        },
        segments: array_at(flight, "/legs")
            .iter()
            .flat_map(|leg| array_at(leg, "/schedules").iter().map(normalize_schedule))
            .collect(),
        passengers: array_at(flight, "/pricingInformation/0/passengerInfoList")
            .iter()
            .map(normalize_passenger)
            .collect(),
        baggage: None,
        services: None,
        source: ProviderKind::FlightService,
    }
}

fn normalize_schedule(schedule: &Value) -> NormalizedSegment {
    NormalizedSegment {
        origin: value_at(schedule, "/departure/airport"),
        destination: value_at(schedule, "/arrival/airport"),
        departure_time: value_at(schedule, "/departure/time"),
        arrival_time: value_at(schedule, "/arrival/time"),
        carrier: value_at(schedule, "/carrier/marketing"),
        flight_number: value_at(schedule, "/carrier/marketingFlightNumber"),
        aircraft: value_at(schedule, "/carrier/equipment/code"),
    }
}

fn normalize_passenger(passenger: &Value) -> NormalizedPassenger {
    NormalizedPassenger::Priced {
        passenger_type: value_at(passenger, "/passengerType"),
        fare: amount_at(passenger, "/passengerTotalFare/totalFare"),
        currency: text_or(passenger, "/passengerTotalFare/currency", DEFAULT_CURRENCY),
        baggage: list_or_empty(passenger, "/baggageInformation"),
        penalties: list_or_empty(passenger, "/penalties"),
        seats: array_at(passenger, "/fareComponents")
            .iter()
            .flat_map(|component| {
                array_at(component, "/segments")
                    .iter()
                    .map(|segment| SeatAvailability {
                        cabin_type: value_at(segment, "/cabinType"),
                        seats_available: value_at(segment, "/seatsAvailable"),
                        booking_code: value_at(segment, "/bookingCode"),
                    })
            })
            .collect(),
    }
}
