//! Schema composition and whole-device validation.

use crate::error::{ConfigError, Result};
use crate::features::Feature;
use crate::host::base::{self, BaseField, BaseKind};
use crate::host::IdAllocator;
use crate::pins;
use crate::types::{DeviceConfig, SensorRole};
use crate::validate::{self, child, expect_mapping, reject_unknown, require_present};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

pub const ID: &str = "id";
pub const FLOW_CONTROL_PIN: &str = "flow_control_pin";
pub const PUMP1_SWITCH: &str = "pump1_switch";

/// Which switch-slot layout a device uses.
///
/// Two layouts exist for the same controller. Neither is assumed; the load
/// session is created for exactly one of them.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Up to eight `<role>_switch` slots, each bound to a feature code.
    #[default]
    MultiFeature,
    /// A single `pump1_switch` slot addressed by raw controller address.
    SingleAddress,
}

impl Profile {
    pub fn name(self) -> &'static str {
        match self {
            Profile::MultiFeature => "multi_feature",
            Profile::SingleAddress => "single_address",
        }
    }

    fn switch_fields(self) -> Vec<FieldSpec> {
        match self {
            Profile::MultiFeature => Feature::ALL
                .into_iter()
                .map(|f| FieldSpec::optional(f.slot(), FieldKind::FeatureSwitch(f)))
                .collect(),
            Profile::SingleAddress => {
                vec![FieldSpec::optional(PUMP1_SWITCH, FieldKind::AddressSwitch)]
            }
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Presence {
    Required,
    Optional,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Identifier,
    OutputPin,
    TemperatureSensor(SensorRole),
    FeatureSwitch(Feature),
    AddressSwitch,
    Base(BaseKind),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Identifier => f.write_str("identifier"),
            FieldKind::OutputPin => f.write_str("output pin"),
            FieldKind::TemperatureSensor(_) => f.write_str("temperature sensor"),
            FieldKind::FeatureSwitch(feat) => write!(f, "switch (feature {})", feat.code()),
            FieldKind::AddressSwitch => f.write_str("switch (address)"),
            FieldKind::Base(BaseKind::Float) => f.write_str("float"),
            FieldKind::Base(BaseKind::IdReference) => f.write_str("id reference"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub presence: Presence,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            presence: Presence::Required,
            kind,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            presence: Presence::Optional,
            kind,
        }
    }
}

impl From<BaseField> for FieldSpec {
    fn from(f: BaseField) -> Self {
        FieldSpec::optional(f.name, FieldKind::Base(f.kind))
    }
}

/// Fields every device carries regardless of profile.
pub fn device_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::required(ID, FieldKind::Identifier),
        FieldSpec::required(FLOW_CONTROL_PIN, FieldKind::OutputPin),
        FieldSpec::optional(
            SensorRole::AirTemperature.slot(),
            FieldKind::TemperatureSensor(SensorRole::AirTemperature),
        ),
        FieldSpec::optional(
            SensorRole::WaterTemperature.slot(),
            FieldKind::TemperatureSensor(SensorRole::WaterTemperature),
        ),
    ]
}

/// Schema union with a disjointness check.
#[derive(Debug, Default)]
pub struct SchemaComposer {
    fields: Vec<FieldSpec>,
}

impl SchemaComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend<I>(mut self, fields: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<FieldSpec>,
    {
        for field in fields {
            let field = field.into();
            if self.fields.iter().any(|f| f.name == field.name) {
                return Err(ConfigError::SchemaDefinitionConflict {
                    field: field.name.to_string(),
                });
            }
            self.fields.push(field);
        }
        Ok(self)
    }

    pub fn finish(self, profile: Profile) -> Schema {
        Schema {
            profile,
            fields: self.fields,
            warn_strapping_pins: true,
        }
    }

    /// The full device schema for `profile`.
    pub fn compose(profile: Profile) -> Result<Schema> {
        Ok(Self::new()
            .extend(device_fields())?
            .extend(base::component_schema())?
            .extend(base::uart_device_schema())?
            .extend(profile.switch_fields())?
            .finish(profile))
    }
}

/// The composed acceptance rules for one device.
#[derive(Debug, Clone)]
pub struct Schema {
    profile: Profile,
    fields: Vec<FieldSpec>,
    warn_strapping_pins: bool,
}

impl Schema {
    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn with_strapping_warnings(mut self, enabled: bool) -> Self {
        self.warn_strapping_pins = enabled;
        self
    }

    /// Validate one raw device mapping.
    ///
    /// `ids` is consulted read-only: identifiers already declared by earlier
    /// devices are rejected here, but nothing is declared.
    pub fn validate(&self, raw: &Value, ids: &dyn IdAllocator) -> Result<DeviceConfig> {
        let map = expect_mapping("", raw)?;
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.presence == Presence::Required)
            .map(|f| f.name)
            .collect();
        require_present("", map, &required)?;

        let mut id = None;
        let mut pin = None;
        let mut air = None;
        let mut water = None;
        let mut switches = Vec::new();
        let mut setup_priority = None;
        let mut uart_id = None;

        for field in &self.fields {
            let Some(value) = map.get(field.name) else {
                continue;
            };
            let path = child("", field.name);
            debug!(field = field.name, kind = %field.kind, "validating");
            match field.kind {
                FieldKind::Identifier => id = Some(validate::identifier(&path, value)?),
                FieldKind::OutputPin => {
                    pin = Some(pins::parse_output_pin(
                        &path,
                        value,
                        self.warn_strapping_pins,
                    )?)
                }
                FieldKind::TemperatureSensor(role) => {
                    // The device id is validated first, so the generated id is stable.
                    let owner = id.as_deref().unwrap_or("pentair_easytouch");
                    let default_id = format!("{owner}_{}", role.slot());
                    let sensor = validate::temperature_sensor(&path, value, &default_id)?;
                    match role {
                        SensorRole::AirTemperature => air = Some(sensor),
                        SensorRole::WaterTemperature => water = Some(sensor),
                    }
                }
                FieldKind::FeatureSwitch(feature) => {
                    switches.push(validate::feature_switch(&path, value, feature)?)
                }
                FieldKind::AddressSwitch => {
                    switches.push(validate::address_switch(&path, value, field.name)?)
                }
                FieldKind::Base(BaseKind::Float) => {
                    setup_priority = Some(validate::float(&path, value)?)
                }
                FieldKind::Base(BaseKind::IdReference) => {
                    uart_id = Some(validate::identifier(&path, value)?)
                }
            }
        }

        let known: Vec<&str> = self.fields.iter().map(|f| f.name).collect();
        reject_unknown("", map, &known)?;

        let config = DeviceConfig {
            id: id.ok_or_else(|| ConfigError::MissingRequiredField { path: ID.into() })?,
            flow_control_pin: pin.ok_or_else(|| ConfigError::MissingRequiredField {
                path: FLOW_CONTROL_PIN.into(),
            })?,
            air_temperature_sensor: air,
            water_temperature_sensor: water,
            switches,
            setup_priority,
            uart_id,
        };
        check_identifiers(&config, ids)?;
        Ok(config)
    }
}

fn check_identifiers(config: &DeviceConfig, ids: &dyn IdAllocator) -> Result<()> {
    let mut seen = HashSet::new();
    for (path, id) in config.identifiers() {
        if !seen.insert(id) || ids.is_declared(id) {
            return Err(ConfigError::DuplicateIdentifier {
                path,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SwitchTarget;
    use crate::MockHost;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn schema(profile: Profile) -> Schema {
        SchemaComposer::compose(profile).unwrap()
    }

    #[test]
    fn test_switch_slots_match_feature_table() {
        let s = schema(Profile::MultiFeature);
        let slots: HashSet<&str> = s
            .fields()
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::FeatureSwitch(_)))
            .map(|f| f.name)
            .collect();
        let table: HashSet<&str> = Feature::ALL.iter().map(|f| f.slot()).collect();
        assert_eq!(slots, table);
        for f in s.fields() {
            if let FieldKind::FeatureSwitch(feature) = f.kind {
                assert_eq!(f.name.strip_suffix("_switch"), Some(feature.role()));
            }
        }
    }

    #[test]
    fn test_composer_detects_conflicts() {
        let err = SchemaComposer::new()
            .extend(device_fields())
            .unwrap()
            .extend([FieldSpec::optional(ID, FieldKind::Identifier)])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::SchemaDefinitionConflict { field: "id".into() }
        );
    }

    #[test]
    fn test_profiles_compose() {
        let alt = schema(Profile::SingleAddress);
        let names: Vec<&str> = alt.fields().iter().map(|f| f.name).collect();
        assert!(names.contains(&PUMP1_SWITCH));
        assert!(!names.contains(&"pool_switch"));
        assert!(names.contains(&"uart_id"));
        assert!(names.contains(&"setup_priority"));
    }

    #[test]
    fn test_missing_flow_control_pin() {
        let host = MockHost::new();
        let err = schema(Profile::MultiFeature)
            .validate(&yaml("id: dev1"), &host)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingRequiredField {
                path: "flow_control_pin".into()
            }
        );
    }

    #[test]
    fn test_missing_is_reported_before_unknown() {
        let host = MockHost::new();
        let err = schema(Profile::MultiFeature)
            .validate(&yaml("{id: dev1, bogus: 1}"), &host)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequiredField { .. }));
    }

    #[test]
    fn test_unknown_top_level_field() {
        let host = MockHost::new();
        let err = schema(Profile::MultiFeature)
            .validate(&yaml("{id: dev1, flow_control_pin: GPIO4, heater_switch: {id: h}}"), &host)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownField {
                path: "heater_switch".into()
            }
        );
    }

    #[test]
    fn test_profile_slots_are_not_merged() {
        let host = MockHost::new();
        let err = schema(Profile::MultiFeature)
            .validate(
                &yaml("{id: dev1, flow_control_pin: GPIO4, pump1_switch: {id: sw1, address: 12}}"),
                &host,
            )
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownField {
                path: "pump1_switch".into()
            }
        );
    }

    #[test]
    fn test_switches_follow_declared_order() {
        let host = MockHost::new();
        let cfg = schema(Profile::MultiFeature)
            .validate(
                &yaml(
                    "
id: dev1
flow_control_pin: GPIO4
pool_light_switch: {id: light}
spa_switch: {id: spa}
pool_switch: {id: pool}
",
                ),
                &host,
            )
            .unwrap();
        let ids: Vec<&str> = cfg.switches.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["pool", "spa", "light"]);
        assert_eq!(
            cfg.switches[2].target,
            SwitchTarget::Feature(Feature::PoolLight)
        );
    }

    #[test]
    fn test_duplicate_identifier_within_device() {
        let host = MockHost::new();
        let err = schema(Profile::MultiFeature)
            .validate(
                &yaml("{id: dev1, flow_control_pin: GPIO4, pool_switch: {id: dev1}}"),
                &host,
            )
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateIdentifier {
                path: "pool_switch.id".into(),
                id: "dev1".into()
            }
        );
    }

    #[test]
    fn test_generated_sensor_ids() {
        let host = MockHost::new();
        let cfg = schema(Profile::MultiFeature)
            .validate(
                &yaml("{id: dev1, flow_control_pin: GPIO4, air_temperature_sensor: {name: Air}}"),
                &host,
            )
            .unwrap();
        let air = cfg.air_temperature_sensor.unwrap();
        assert_eq!(air.id, "dev1_air_temperature_sensor");
        assert!(cfg.water_temperature_sensor.is_none());
    }

    #[test]
    fn test_base_fields() {
        let host = MockHost::new();
        let cfg = schema(Profile::MultiFeature)
            .validate(
                &yaml("{id: dev1, flow_control_pin: 4, setup_priority: 200.0, uart_id: rs485}"),
                &host,
            )
            .unwrap();
        assert_eq!(cfg.setup_priority, Some(200.0));
        assert_eq!(cfg.uart_id.as_deref(), Some("rs485"));
    }
}
