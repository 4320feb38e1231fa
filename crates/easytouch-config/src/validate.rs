//! Field validators.
//!
//! Each validator checks one raw YAML value and returns its typed form or a
//! [`ConfigError`] naming the field path. Nested mappings are checked in three
//! passes: required keys first, then every present key, then unknown keys.

use crate::error::{ConfigError, Result};
use crate::features::Feature;
use crate::types::{
    SensorConfig, SwitchConfig, SwitchTarget, SWITCH_ICON, TEMPERATURE_ACCURACY,
    TEMPERATURE_CLASS, TEMPERATURE_UNIT, THERMOMETER_ICON,
};
use serde_yaml::{Mapping, Value};

pub(crate) fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

pub(crate) fn expect_mapping<'a>(path: &str, value: &'a Value) -> Result<&'a Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| ConfigError::invalid(path, "expected a mapping"))
}

pub(crate) fn require_present(path: &str, map: &Mapping, required: &[&str]) -> Result<()> {
    match required.iter().find(|key| !map.contains_key(**key)) {
        Some(key) => Err(ConfigError::MissingRequiredField {
            path: child(path, key),
        }),
        None => Ok(()),
    }
}

pub(crate) fn reject_unknown(path: &str, map: &Mapping, known: &[&str]) -> Result<()> {
    for key in map.keys() {
        match key.as_str() {
            Some(k) if known.contains(&k) => {}
            Some(k) => {
                return Err(ConfigError::UnknownField {
                    path: child(path, k),
                })
            }
            None => return Err(ConfigError::invalid(path, "field names must be strings")),
        }
    }
    Ok(())
}

pub(crate) fn expect_bool(path: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| ConfigError::invalid(path, "expected a boolean"))
}

pub(crate) fn expect_string(path: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::invalid(path, "expected a string"))
}

/// An identifier token: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn identifier(path: &str, value: &Value) -> Result<String> {
    let token = value
        .as_str()
        .ok_or_else(|| ConfigError::invalid(path, "expected an identifier"))?;
    let mut chars = token.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(ConfigError::invalid(
            path,
            format!("`{token}` is not a valid identifier"),
        ));
    }
    Ok(token.to_string())
}

pub fn feature(path: &str, value: &Value) -> Result<Feature> {
    let token = value
        .as_str()
        .ok_or_else(|| ConfigError::invalid(path, "expected a feature name"))?;
    Feature::lookup(token).map_err(|e| ConfigError::UnknownRole {
        path: path.to_string(),
        token: e.0,
    })
}

pub fn float(path: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .filter(|f| f.is_finite())
        .ok_or_else(|| ConfigError::invalid(path, "expected a number"))
}

/// A temperature sensor. Unit, icon, precision and class are fixed; they may
/// be restated but only with the fixed value.
pub fn temperature_sensor(path: &str, value: &Value, default_id: &str) -> Result<SensorConfig> {
    const FIELDS: [&str; 7] = [
        "id",
        "name",
        "disabled_by_default",
        "unit_of_measurement",
        "icon",
        "accuracy_decimals",
        "device_class",
    ];
    let mut sensor = SensorConfig {
        id: default_id.to_string(),
        name: None,
        disabled_by_default: false,
    };
    if value.is_null() {
        return Ok(sensor);
    }
    let map = expect_mapping(path, value)?;

    if let Some(v) = map.get("id") {
        sensor.id = identifier(&child(path, "id"), v)?;
    }
    if let Some(v) = map.get("name") {
        sensor.name = Some(expect_string(&child(path, "name"), v)?);
    }
    if let Some(v) = map.get("disabled_by_default") {
        sensor.disabled_by_default = expect_bool(&child(path, "disabled_by_default"), v)?;
    }
    fixed_str(path, map, "unit_of_measurement", TEMPERATURE_UNIT)?;
    fixed_str(path, map, "icon", THERMOMETER_ICON)?;
    fixed_str(path, map, "device_class", TEMPERATURE_CLASS)?;
    if let Some(v) = map.get("accuracy_decimals") {
        if v.as_u64() != Some(u64::from(TEMPERATURE_ACCURACY)) {
            return Err(ConfigError::invalid(
                &child(path, "accuracy_decimals"),
                format!("must be {TEMPERATURE_ACCURACY} for a temperature sensor"),
            ));
        }
    }
    reject_unknown(path, map, &FIELDS)?;
    Ok(sensor)
}

fn fixed_str(path: &str, map: &Mapping, key: &str, expected: &str) -> Result<()> {
    match map.get(key) {
        Some(v) if v.as_str() != Some(expected) => Err(ConfigError::invalid(
            &child(path, key),
            format!("must be `{expected}` for a temperature sensor"),
        )),
        _ => Ok(()),
    }
}

const SWITCH_COMMON: [&str; 5] = ["id", "name", "icon", "inverted", "disabled_by_default"];

/// A switch bound to the feature of its slot. An explicit `feature` must name
/// a known role and agree with the slot.
pub fn feature_switch(path: &str, value: &Value, slot: Feature) -> Result<SwitchConfig> {
    let map = expect_mapping(path, value)?;
    require_present(path, map, &["id"])?;
    let mut sw = switch_common(path, map, slot.slot(), SwitchTarget::Feature(slot))?;
    if let Some(v) = map.get("feature") {
        let fpath = child(path, "feature");
        let named = feature(&fpath, v)?;
        if named != slot {
            return Err(ConfigError::invalid(
                &fpath,
                format!("feature `{named}` does not match slot `{}`", slot.slot()),
            ));
        }
        sw.target = SwitchTarget::Feature(named);
    }
    let mut known = SWITCH_COMMON.to_vec();
    known.push("feature");
    reject_unknown(path, map, &known)?;
    Ok(sw)
}

/// A switch addressed by raw controller address.
pub fn address_switch(path: &str, value: &Value, slot: &str) -> Result<SwitchConfig> {
    let map = expect_mapping(path, value)?;
    require_present(path, map, &["id", "address"])?;
    let apath = child(path, "address");
    let address = map
        .get("address")
        .and_then(Value::as_u64)
        .ok_or_else(|| ConfigError::invalid(&apath, "expected an integer address"))?;
    let address = u8::try_from(address)
        .map_err(|_| ConfigError::invalid(&apath, format!("address {address} exceeds 255")))?;
    let sw = switch_common(path, map, slot, SwitchTarget::Address(address))?;
    let mut known = SWITCH_COMMON.to_vec();
    known.push("address");
    reject_unknown(path, map, &known)?;
    Ok(sw)
}

fn switch_common(
    path: &str,
    map: &Mapping,
    slot: &str,
    target: SwitchTarget,
) -> Result<SwitchConfig> {
    let id = map
        .get("id")
        .ok_or_else(|| ConfigError::MissingRequiredField {
            path: child(path, "id"),
        })?;
    let mut sw = SwitchConfig {
        slot: slot.to_string(),
        id: identifier(&child(path, "id"), id)?,
        name: None,
        icon: SWITCH_ICON.to_string(),
        inverted: false,
        disabled_by_default: false,
        target,
    };
    if let Some(v) = map.get("name") {
        sw.name = Some(expect_string(&child(path, "name"), v)?);
    }
    if let Some(v) = map.get("icon") {
        sw.icon = expect_string(&child(path, "icon"), v)?;
    }
    if let Some(v) = map.get("inverted") {
        sw.inverted = expect_bool(&child(path, "inverted"), v)?;
    }
    if let Some(v) = map.get("disabled_by_default") {
        sw.disabled_by_default = expect_bool(&child(path, "disabled_by_default"), v)?;
    }
    Ok(sw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_identifier_grammar() {
        assert_eq!(identifier("id", &yaml("pool_1")).unwrap(), "pool_1");
        assert_eq!(identifier("id", &yaml("_x")).unwrap(), "_x");
        for bad in ["1pool", "pool-1", "''", "42", "{a: b}"] {
            assert!(matches!(
                identifier("id", &yaml(bad)),
                Err(ConfigError::InvalidValue { .. })
            ));
        }
    }

    #[test]
    fn test_feature_lowercases_and_reports_path() {
        assert_eq!(feature("f", &yaml("Spa_Light")).unwrap(), Feature::SpaLight);
        assert_eq!(
            feature("pool_switch.feature", &yaml("jacuzzi")).unwrap_err(),
            ConfigError::UnknownRole {
                path: "pool_switch.feature".into(),
                token: "jacuzzi".into()
            }
        );
    }

    #[test]
    fn test_sensor_defaults_and_fixed_constants() {
        let s = temperature_sensor("air_temperature_sensor", &yaml("~"), "dev_air").unwrap();
        assert_eq!(s.id, "dev_air");
        assert!(s.name.is_none());

        let s = temperature_sensor(
            "air_temperature_sensor",
            &yaml("{name: Air, icon: 'mdi:thermometer', accuracy_decimals: 0, unit_of_measurement: '°F'}"),
            "dev_air",
        )
        .unwrap();
        assert_eq!(s.name.as_deref(), Some("Air"));
    }

    #[test]
    fn test_sensor_overrides_are_rejected() {
        let err = temperature_sensor(
            "water_temperature_sensor",
            &yaml("{accuracy_decimals: 1}"),
            "w",
        )
        .unwrap_err();
        assert_eq!(
            err.path(),
            Some("water_temperature_sensor.accuracy_decimals")
        );
        let err = temperature_sensor("s", &yaml("{device_class: humidity}"), "w").unwrap_err();
        assert_eq!(err.path(), Some("s.device_class"));
        let err = temperature_sensor("s", &yaml("{filters: []}"), "w").unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownField {
                path: "s.filters".into()
            }
        );
    }

    #[test]
    fn test_feature_switch() {
        let sw = feature_switch("spa_switch", &yaml("{id: spa}"), Feature::Spa).unwrap();
        assert_eq!(sw.target, SwitchTarget::Feature(Feature::Spa));
        assert_eq!(sw.icon, SWITCH_ICON);
        assert_eq!(sw.slot, "spa_switch");

        let sw = feature_switch(
            "spa_switch",
            &yaml("{id: spa, feature: SPA, icon: 'mdi:hot-tub', inverted: true}"),
            Feature::Spa,
        )
        .unwrap();
        assert_eq!(sw.icon, "mdi:hot-tub");
        assert!(sw.inverted);
    }

    #[test]
    fn test_feature_switch_errors() {
        assert_eq!(
            feature_switch("spa_switch", &yaml("{feature: spa}"), Feature::Spa).unwrap_err(),
            ConfigError::MissingRequiredField {
                path: "spa_switch.id".into()
            }
        );
        assert!(matches!(
            feature_switch("spa_switch", &yaml("{id: s, feature: bubbles}"), Feature::Spa),
            Err(ConfigError::UnknownRole { .. })
        ));
        assert!(matches!(
            feature_switch("spa_switch", &yaml("{id: s, feature: pool}"), Feature::Spa),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(
            feature_switch("spa_switch", &yaml("{id: s, address: 3}"), Feature::Spa).unwrap_err(),
            ConfigError::UnknownField {
                path: "spa_switch.address".into()
            }
        );
    }

    #[test]
    fn test_address_switch() {
        let sw = address_switch("pump1_switch", &yaml("{id: sw1, address: 12}"), "pump1_switch")
            .unwrap();
        assert_eq!(sw.target, SwitchTarget::Address(12));

        assert_eq!(
            address_switch("pump1_switch", &yaml("{id: sw1}"), "pump1_switch").unwrap_err(),
            ConfigError::MissingRequiredField {
                path: "pump1_switch.address".into()
            }
        );
        assert!(matches!(
            address_switch("pump1_switch", &yaml("{id: sw1, address: 300}"), "pump1_switch"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            address_switch("pump1_switch", &yaml("{id: sw1, address: pump}"), "pump1_switch"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
