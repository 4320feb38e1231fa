use crate::builder::build_device;
use crate::emitter::{emit, Registered};
use crate::error::Result;
use crate::host::FirmwareHost;
use crate::schema::{Profile, Schema, SchemaComposer};
use crate::types::{DeviceConfig, DeviceGraph};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub profile: Profile,
    /// Log a warning when the flow-control pin is an ESP32 strapping pin.
    pub warn_strapping_pins: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            profile: Profile::MultiFeature,
            warn_strapping_pins: true,
        }
    }
}

impl SessionOptions {
    /// Read options from a JSON file; a missing file means defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading options: {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing options: {}", path.display()))
    }
}

/// One configuration load pass.
///
/// Owns the host, and with it the identifier namespace, for the lifetime of
/// the pass. Devices are processed one at a time; a device that fails leaves
/// earlier devices untouched.
pub struct LoadSession<H> {
    host: H,
    schema: Schema,
    built: Vec<String>,
}

impl<H: FirmwareHost> LoadSession<H> {
    pub fn new(host: H, options: &SessionOptions) -> Result<Self> {
        let schema = SchemaComposer::compose(options.profile)?
            .with_strapping_warnings(options.warn_strapping_pins);
        Ok(Self {
            host,
            schema,
            built: Vec::new(),
        })
    }

    pub fn profile(&self) -> Profile {
        self.schema.profile()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Ids of the devices registered so far, in order.
    pub fn devices(&self) -> &[String] {
        &self.built
    }

    /// Validate without declaring or registering anything.
    pub fn validate(&self, raw: &Value) -> Result<DeviceConfig> {
        self.schema.validate(raw, &self.host)
    }

    /// Validate, build and register one device.
    pub fn process(&mut self, raw: &Value) -> Result<(DeviceGraph, Registered)> {
        let config = self.validate(raw)?;
        let graph = build_device(&config, &mut self.host)?;
        let registered = emit(&graph, &mut self.host);
        info!(device = %config.id, profile = %self.profile(), "device loaded");
        self.built.push(config.id);
        Ok((graph, registered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::features::Feature;
    use crate::types::SwitchTarget;
    use crate::MockHost;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn session(profile: Profile) -> LoadSession<MockHost> {
        let options = SessionOptions {
            profile,
            ..SessionOptions::default()
        };
        LoadSession::new(MockHost::new(), &options).unwrap()
    }

    const FULL: &str = "
id: dev1
flow_control_pin: GPIO4
air_temperature_sensor:
  name: Air Temperature
water_temperature_sensor:
  name: Water Temperature
pool_switch:
  id: pool
  name: Pool
spa_switch:
  id: spa
pool_light_switch:
  id: pool_light
  feature: POOL_LIGHT
";

    #[test]
    fn test_full_device_round_trip() {
        let mut s = session(Profile::MultiFeature);
        let (graph, registered) = s.process(&yaml(FULL)).unwrap();
        assert_eq!(graph.sensors.len(), 2);
        assert_eq!(graph.switches.len(), 3);
        let codes: Vec<u8> = graph
            .switches
            .iter()
            .filter_map(|sw| sw.feature())
            .map(Feature::code)
            .collect();
        assert_eq!(codes, [6, 1, 5]);
        for sw in &graph.switches {
            assert_eq!(sw.parent.name(), "dev1");
        }
        assert_eq!(registered.switches.len(), 3);
        assert_eq!(s.devices(), ["dev1"]);
    }

    #[test]
    fn test_validation_is_idempotent_and_pure() {
        let s = session(Profile::MultiFeature);
        let raw = yaml(FULL);
        let first = s.validate(&raw).unwrap();
        let second = s.validate(&raw).unwrap();
        assert_eq!(first, second);
        assert_eq!(s.host().declared().count(), 0);
        assert!(s.host().registrations().is_empty());
    }

    #[test]
    fn test_missing_pin_registers_nothing() {
        let mut s = session(Profile::MultiFeature);
        let err = s.process(&yaml("{id: dev1, spa_switch: {id: spa}}")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingRequiredField {
                path: "flow_control_pin".into()
            }
        );
        assert!(s.host().registrations().is_empty());
        assert_eq!(s.host().declared().count(), 0);
    }

    #[test]
    fn test_unknown_feature_fails_before_registration() {
        let mut s = session(Profile::MultiFeature);
        let err = s
            .process(&yaml(
                "{id: dev1, flow_control_pin: GPIO4, spa_switch: {id: spa, feature: jacuzzi}}",
            ))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRole { .. }));
        assert!(s.host().registrations().is_empty());
    }

    #[test]
    fn test_second_device_with_same_id_fails() {
        let mut s = session(Profile::MultiFeature);
        s.process(&yaml("{id: dev1, flow_control_pin: GPIO4}")).unwrap();
        let before = s.host().registrations().len();
        let err = s
            .process(&yaml("{id: dev1, flow_control_pin: GPIO5}"))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateIdentifier {
                path: "id".into(),
                id: "dev1".into()
            }
        );
        assert_eq!(s.host().registrations().len(), before);
        assert_eq!(s.devices(), ["dev1"]);
    }

    #[test]
    fn test_single_address_profile() {
        let mut s = session(Profile::SingleAddress);
        let (graph, _) = s
            .process(&yaml(
                "{id: dev1, flow_control_pin: GPIO4, pump1_switch: {id: sw1, address: 12}}",
            ))
            .unwrap();
        assert_eq!(graph.switches.len(), 1);
        assert_eq!(graph.switches[0].target, SwitchTarget::Address(12));
        assert_eq!(graph.switches[0].feature(), None);
        assert!(graph.summary().contains("address=0x0C"));
    }

    #[test]
    fn test_options_default_when_missing() {
        let opts = SessionOptions::load("/nonexistent/easytouch-options.json").unwrap();
        assert_eq!(opts, SessionOptions::default());
        let parsed: SessionOptions =
            serde_json::from_str(r#"{"profile": "single_address"}"#).unwrap();
        assert_eq!(parsed.profile, Profile::SingleAddress);
        assert!(parsed.warn_strapping_pins);
    }
}
