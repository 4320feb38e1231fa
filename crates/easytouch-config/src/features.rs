use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Wire code the controller uses for a circuit it cannot name.
pub const UNKNOWN_CODE: u8 = 0;
/// Wire code for the auxiliary circuit. Reported by the controller but not
/// addressable from configuration.
pub const AUX_CODE: u8 = 9;

/// Controllable circuit on the EasyTouch panel.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Feature {
    Spa = 1,
    Cleaner = 2,
    AirBlower = 3,
    SpaLight = 4,
    PoolLight = 5,
    Pool = 6,
    WaterFeature = 7,
    Spillway = 8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Feature {
    /// Declared slot order. Switches are built and registered in this order.
    pub const ALL: [Feature; 8] = [
        Feature::Pool,
        Feature::Spa,
        Feature::Cleaner,
        Feature::AirBlower,
        Feature::SpaLight,
        Feature::PoolLight,
        Feature::WaterFeature,
        Feature::Spillway,
    ];

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn role(self) -> &'static str {
        match self {
            Feature::Pool => "pool",
            Feature::Spa => "spa",
            Feature::Cleaner => "cleaner",
            Feature::AirBlower => "air_blower",
            Feature::SpaLight => "spa_light",
            Feature::PoolLight => "pool_light",
            Feature::WaterFeature => "water_feature",
            Feature::Spillway => "spillway",
        }
    }

    /// Configuration key of the switch slot bound to this feature.
    pub const fn slot(self) -> &'static str {
        match self {
            Feature::Pool => "pool_switch",
            Feature::Spa => "spa_switch",
            Feature::Cleaner => "cleaner_switch",
            Feature::AirBlower => "air_blower_switch",
            Feature::SpaLight => "spa_light_switch",
            Feature::PoolLight => "pool_light_switch",
            Feature::WaterFeature => "water_feature_switch",
            Feature::Spillway => "spillway_switch",
        }
    }

    /// Case-insensitive role lookup.
    pub fn lookup(token: &str) -> Result<Self, UnknownRole> {
        let lowered = token.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.role() == lowered)
            .ok_or_else(|| UnknownRole(token.to_string()))
    }

    /// Inverse of [`Feature::code`]. Wire-only codes map to `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    pub fn from_slot(slot: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.slot() == slot)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role())
    }
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.role())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_distinct_and_cover_one_to_eight() {
        let codes: HashSet<u8> = Feature::ALL.iter().map(|f| f.code()).collect();
        assert_eq!(codes.len(), 8);
        assert!(codes.iter().all(|c| (1..=8).contains(c)));
        assert!(!codes.contains(&UNKNOWN_CODE));
        assert!(!codes.contains(&AUX_CODE));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Feature::lookup("pool").unwrap().code(), 6);
        assert_eq!(Feature::lookup("SPA").unwrap().code(), 1);
        assert_eq!(Feature::lookup("Pool_Light").unwrap().code(), 5);
        assert_eq!(Feature::lookup("spillway").unwrap(), Feature::Spillway);
    }

    #[test]
    fn test_lookup_rejects_unknown_roles() {
        assert_eq!(
            Feature::lookup("hot_tub"),
            Err(UnknownRole("hot_tub".to_string()))
        );
        assert!(Feature::lookup("aux").is_err());
        assert!(Feature::lookup("").is_err());
    }

    #[test]
    fn test_slots_are_roles_with_suffix() {
        for f in Feature::ALL {
            assert_eq!(f.slot(), format!("{}_switch", f.role()));
            assert_eq!(Feature::from_slot(f.slot()), Some(f));
            assert_eq!(Feature::from_code(f.code()), Some(f));
        }
        assert_eq!(Feature::from_code(AUX_CODE), None);
    }
}
