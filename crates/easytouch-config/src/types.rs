use crate::features::Feature;
use crate::host::{ComponentOptions, Handle, PinHandle, TransportConfig};
use crate::pins::PinSpec;
use serde::Serialize;
use std::fmt::Write as _;

pub const TEMPERATURE_UNIT: &str = "°F";
pub const THERMOMETER_ICON: &str = "mdi:thermometer";
pub const TEMPERATURE_ACCURACY: u8 = 0;
pub const TEMPERATURE_CLASS: &str = "temperature";
pub const SWITCH_ICON: &str = "mdi:pool";
/// The controller broadcasts status continuously; the UART is drained this often.
pub const UPDATE_INTERVAL_MS: u32 = 50;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorRole {
    AirTemperature,
    WaterTemperature,
}

impl SensorRole {
    pub const ALL: [SensorRole; 2] = [SensorRole::AirTemperature, SensorRole::WaterTemperature];

    pub const fn slot(self) -> &'static str {
        match self {
            SensorRole::AirTemperature => "air_temperature_sensor",
            SensorRole::WaterTemperature => "water_temperature_sensor",
        }
    }
}

/// What a switch drives on the controller.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchTarget {
    Feature(Feature),
    Address(u8),
}

/// Validated configuration of one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceConfig {
    pub id: String,
    pub flow_control_pin: PinSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_temperature_sensor: Option<SensorConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_temperature_sensor: Option<SensorConfig>,
    /// Present switch slots in declared slot order.
    pub switches: Vec<SwitchConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_priority: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uart_id: Option<String>,
}

impl DeviceConfig {
    pub fn sensor(&self, role: SensorRole) -> Option<&SensorConfig> {
        match role {
            SensorRole::AirTemperature => self.air_temperature_sensor.as_ref(),
            SensorRole::WaterTemperature => self.water_temperature_sensor.as_ref(),
        }
    }

    /// Every identifier this device introduces, with the path that introduced it.
    pub fn identifiers(&self) -> Vec<(String, &str)> {
        let mut out = vec![("id".to_string(), self.id.as_str())];
        for role in SensorRole::ALL {
            if let Some(s) = self.sensor(role) {
                out.push((format!("{}.id", role.slot()), s.id.as_str()));
            }
        }
        for sw in &self.switches {
            out.push((format!("{}.id", sw.slot), sw.id.as_str()));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorConfig {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub disabled_by_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchConfig {
    pub slot: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub icon: String,
    pub inverted: bool,
    pub disabled_by_default: bool,
    pub target: SwitchTarget,
}

/// The device component as it will exist at runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceNode {
    pub handle: Handle,
    pub flow_control_pin: PinHandle,
    pub component: ComponentOptions,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorDescriptor {
    pub handle: Handle,
    pub role: SensorRole,
    pub name: Option<String>,
    pub unit_of_measurement: &'static str,
    pub icon: &'static str,
    pub accuracy_decimals: u8,
    pub device_class: &'static str,
    pub disabled_by_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchDescriptor {
    pub handle: Handle,
    pub slot: String,
    pub name: Option<String>,
    pub icon: String,
    pub inverted: bool,
    pub disabled_by_default: bool,
    /// Owning device. Relation only; the device owns the switch.
    pub parent: Handle,
    pub target: SwitchTarget,
}

impl SwitchDescriptor {
    pub fn feature(&self) -> Option<Feature> {
        match self.target {
            SwitchTarget::Feature(f) => Some(f),
            SwitchTarget::Address(_) => None,
        }
    }

    pub fn address(&self) -> Option<u8> {
        match self.target {
            SwitchTarget::Address(a) => Some(a),
            SwitchTarget::Feature(_) => None,
        }
    }
}

/// One fully linked device, ready for registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceGraph {
    pub device: DeviceNode,
    pub sensors: Vec<SensorDescriptor>,
    pub switches: Vec<SwitchDescriptor>,
}

impl DeviceGraph {
    pub fn sensor(&self, role: SensorRole) -> Option<&SensorDescriptor> {
        self.sensors.iter().find(|s| s.role == role)
    }

    /// Boot-time configuration dump, one line per object.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Pentair EasyTouch '{}'", self.device.handle);
        let _ = writeln!(
            out,
            "  Flow Control Pin: {}",
            self.device.flow_control_pin.spec
        );
        if let Some(uart) = &self.device.transport.uart_id {
            let _ = writeln!(out, "  UART: {uart}");
        }
        let _ = writeln!(
            out,
            "  Update Interval: {}ms",
            self.device.component.update_interval_ms
        );
        for s in &self.sensors {
            let _ = writeln!(
                out,
                "  Sensor {} '{}' ({}, {} decimals)",
                s.role.slot(),
                s.handle,
                s.unit_of_measurement,
                s.accuracy_decimals
            );
        }
        for sw in &self.switches {
            let target = match sw.target {
                SwitchTarget::Feature(f) => format!("feature={f} ({})", f.code()),
                SwitchTarget::Address(a) => format!("address=0x{a:02X}"),
            };
            let _ = writeln!(out, "  Switch {} '{}' {target}", sw.slot, sw.handle);
        }
        out
    }
}
