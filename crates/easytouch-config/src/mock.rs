use crate::host::{
    ComponentOptions, Handle, HostError, HostResult, IdAllocator, ObjectKind, PinHandle,
    PinResolver, Registrar, SensorHandle, SwitchHandle, TransportConfig,
};
use crate::pins::PinSpec;
use crate::types::{SensorDescriptor, SensorRole, SwitchDescriptor};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One call received by [`MockHost`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Registration {
    Component {
        device: String,
        setup_priority: Option<f64>,
        update_interval_ms: u32,
    },
    TransportDevice {
        device: String,
        uart_id: Option<String>,
    },
    Sensor {
        sensor: String,
        index: u32,
    },
    BindSensor {
        device: String,
        role: SensorRole,
        index: u32,
    },
    FlowControlPin {
        device: String,
        number: u8,
        inverted: bool,
    },
    Switch {
        switch: String,
        index: u32,
    },
    SwitchParent {
        index: u32,
        device: String,
    },
    SwitchFeature {
        index: u32,
        code: u8,
    },
    SwitchAddress {
        index: u32,
        address: u8,
    },
}

/// An in-process host that keeps its namespace in memory and records every
/// registration. Each instance is independent.
#[derive(Debug, Default)]
pub struct MockHost {
    declared: BTreeMap<String, ObjectKind>,
    claimed_pins: BTreeSet<u8>,
    next_sensor: u32,
    next_switch: u32,
    log: Vec<Registration>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.log
    }

    pub fn declared(&self) -> impl Iterator<Item = (&str, ObjectKind)> {
        self.declared.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn claimed_pins(&self) -> impl Iterator<Item = u8> + '_ {
        self.claimed_pins.iter().copied()
    }
}

impl IdAllocator for MockHost {
    fn declare(&mut self, name: &str, kind: ObjectKind) -> HostResult<Handle> {
        if self.declared.contains_key(name) {
            return Err(HostError::DuplicateIdentifier(name.to_string()));
        }
        self.declared.insert(name.to_string(), kind);
        Ok(Handle::new(name, kind))
    }

    fn is_declared(&self, name: &str) -> bool {
        self.declared.contains_key(name)
    }

    fn release(&mut self, handle: &Handle) {
        self.declared.remove(handle.name());
    }
}

impl PinResolver for MockHost {
    fn resolve(&mut self, pin: &PinSpec) -> HostResult<PinHandle> {
        if !self.claimed_pins.insert(pin.number) {
            return Err(HostError::PinInUse(pin.number));
        }
        Ok(PinHandle { spec: *pin })
    }

    fn release_pin(&mut self, pin: &PinHandle) {
        self.claimed_pins.remove(&pin.spec.number);
    }
}

impl Registrar for MockHost {
    fn register_component(&mut self, device: &Handle, options: &ComponentOptions) {
        self.log.push(Registration::Component {
            device: device.name().to_string(),
            setup_priority: options.setup_priority,
            update_interval_ms: options.update_interval_ms,
        });
    }

    fn register_transport_device(&mut self, device: &Handle, transport: &TransportConfig) {
        self.log.push(Registration::TransportDevice {
            device: device.name().to_string(),
            uart_id: transport.uart_id.clone(),
        });
    }

    fn register_sensor(&mut self, sensor: &SensorDescriptor) -> SensorHandle {
        let index = self.next_sensor;
        self.next_sensor += 1;
        self.log.push(Registration::Sensor {
            sensor: sensor.handle.name().to_string(),
            index,
        });
        SensorHandle(index)
    }

    fn bind_sensor(&mut self, device: &Handle, role: SensorRole, sensor: SensorHandle) {
        self.log.push(Registration::BindSensor {
            device: device.name().to_string(),
            role,
            index: sensor.0,
        });
    }

    fn set_flow_control_pin(&mut self, device: &Handle, pin: &PinHandle) {
        self.log.push(Registration::FlowControlPin {
            device: device.name().to_string(),
            number: pin.spec.number,
            inverted: pin.spec.inverted,
        });
    }

    fn register_switch(&mut self, switch: &SwitchDescriptor) -> SwitchHandle {
        let index = self.next_switch;
        self.next_switch += 1;
        self.log.push(Registration::Switch {
            switch: switch.handle.name().to_string(),
            index,
        });
        SwitchHandle(index)
    }

    fn set_switch_parent(&mut self, switch: SwitchHandle, device: &Handle) {
        self.log.push(Registration::SwitchParent {
            index: switch.0,
            device: device.name().to_string(),
        });
    }

    fn set_switch_feature(&mut self, switch: SwitchHandle, code: u8) {
        self.log.push(Registration::SwitchFeature {
            index: switch.0,
            code,
        });
    }

    fn set_switch_address(&mut self, switch: SwitchHandle, address: u8) {
        self.log.push(Registration::SwitchAddress {
            index: switch.0,
            address,
        });
    }
}
