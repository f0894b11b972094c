use crate::domain::model::{PassengerType, ProviderKind};
use std::collections::BTreeSet;

/// 請求的旅客類型非空，且全部都是學生或勞工
pub fn is_student_or_labor_only(pax_types: &BTreeSet<PassengerType>) -> bool {
    !pax_types.is_empty()
        && pax_types
            .iter()
            .all(|pax_type| matches!(pax_type, PassengerType::Student | PassengerType::Labor))
}

/// 是否整個略過此供應商（不發出任何網路請求）
pub fn should_skip(provider: ProviderKind, pax_types: &BTreeSet<PassengerType>) -> bool {
    match provider {
        ProviderKind::FlightService => is_student_or_labor_only(pax_types),
        ProviderKind::TurkishService => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(types: &[PassengerType]) -> BTreeSet<PassengerType> {
        types.iter().copied().collect()
    }

    #[test]
    fn test_student_only_skips_flight_service() {
        let types = set(&[PassengerType::Student]);
        assert!(should_skip(ProviderKind::FlightService, &types));
        assert!(!should_skip(ProviderKind::TurkishService, &types));
    }

    #[test]
    fn test_student_and_labor_skip_flight_service() {
        let types = set(&[PassengerType::Student, PassengerType::Labor]);
        assert!(should_skip(ProviderKind::FlightService, &types));
    }

    #[test]
    fn test_mixed_composition_is_not_skipped() {
        let types = set(&[PassengerType::Adult, PassengerType::Student]);
        assert!(!should_skip(ProviderKind::FlightService, &types));
    }

    #[test]
    fn test_empty_set_is_not_skipped() {
        assert!(!is_student_or_labor_only(&BTreeSet::new()));
        assert!(!should_skip(ProviderKind::FlightService, &BTreeSet::new()));
    }
}
