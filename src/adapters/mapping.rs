use crate::domain::model::{CabinClass, PassengerType};
use serde::Serialize;
use std::collections::BTreeMap;

/// 旅客類型代碼表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassengerCodeTable {
    /// flightservice 只認得成人/兒童/嬰兒
    FlightService,
    /// turkishservice 的完整代碼表
    TurkishService,
}

impl PassengerCodeTable {
    pub fn code(&self, pax_type: PassengerType) -> Option<&'static str> {
        match (self, pax_type) {
            (_, PassengerType::Adult) => Some("ADT"),
            (_, PassengerType::Child) => Some("CHD"),
            (_, PassengerType::Infant) => Some("INF"),
            (PassengerCodeTable::TurkishService, PassengerType::Student) => Some("STU"),
            (PassengerCodeTable::TurkishService, PassengerType::Labor) => Some("LBR"),
            (PassengerCodeTable::TurkishService, PassengerType::Senior) => Some("LNN"),
            (PassengerCodeTable::TurkishService, PassengerType::Loyalty) => Some("LIF"),
            (PassengerCodeTable::FlightService, _) => None,
        }
    }
}

/// 單一旅客紀錄 `{"PTC": "ADT"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassengerRecord {
    #[serde(rename = "PTC")]
    pub ptc: &'static str,
}

/// 把人數對照表展開成一人一筆；代碼表沒有的類型直接略過
pub fn expand_passengers(
    pax: &BTreeMap<PassengerType, u32>,
    table: PassengerCodeTable,
) -> Vec<PassengerRecord> {
    pax.iter()
        .filter_map(|(pax_type, count)| table.code(*pax_type).map(|ptc| (ptc, *count)))
        .flat_map(|(ptc, count)| (0..count).map(move |_| PassengerRecord { ptc }))
        .collect()
}

pub fn cabin_code(cabin: CabinClass) -> u8 {
    match cabin {
        CabinClass::Economy => 3,
        CabinClass::Business => 2,
        CabinClass::First => 1,
        CabinClass::Unknown => 0,
    }
}
