//! Boundary to the firmware framework that owns the runtime objects.
//!
//! The compiler never creates components itself; it declares identifiers,
//! claims pins and hands finished descriptors to these traits. A real build
//! backs them with the framework's code generator, tests use
//! [`MockHost`](crate::MockHost).

use crate::pins::PinSpec;
use crate::types::{SensorDescriptor, SensorRole, SwitchDescriptor};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type HostResult<T> = core::result::Result<T, HostError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("identifier already declared: {0}")]
    DuplicateIdentifier(String),
    #[error("GPIO{0} is already claimed")]
    PinInUse(u8),
    #[error("GPIO{number} unsupported: {reason}")]
    UnsupportedPin { number: u8, reason: &'static str },
}

/// What an identifier was declared for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Component,
    Sensor,
    Switch,
}

/// An identifier owned by the host namespace.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct Handle {
    name: String,
    kind: ObjectKind,
}

impl Handle {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A pin claimed from the host.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct PinHandle {
    pub spec: PinSpec,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct SensorHandle(pub u32);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct SwitchHandle(pub u32);

/// Options of the generic component contract.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComponentOptions {
    pub setup_priority: Option<f64>,
    pub update_interval_ms: u32,
}

/// Options of the UART-attached device contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransportConfig {
    /// Bus to attach to; `None` selects the only configured bus.
    pub uart_id: Option<String>,
}

/// Process-wide identifier namespace.
pub trait IdAllocator {
    /// Declare `name`. Fails if it is already taken.
    fn declare(&mut self, name: &str, kind: ObjectKind) -> HostResult<Handle>;

    fn is_declared(&self, name: &str) -> bool;

    /// Give back a handle from a build that did not complete.
    fn release(&mut self, handle: &Handle);
}

pub trait PinResolver {
    fn resolve(&mut self, pin: &PinSpec) -> HostResult<PinHandle>;

    fn release_pin(&mut self, pin: &PinHandle);
}

/// Registration calls, in the order the emitter issues them.
pub trait Registrar {
    fn register_component(&mut self, device: &Handle, options: &ComponentOptions);

    fn register_transport_device(&mut self, device: &Handle, transport: &TransportConfig);

    fn register_sensor(&mut self, sensor: &SensorDescriptor) -> SensorHandle;

    fn bind_sensor(&mut self, device: &Handle, role: SensorRole, sensor: SensorHandle);

    fn set_flow_control_pin(&mut self, device: &Handle, pin: &PinHandle);

    fn register_switch(&mut self, switch: &SwitchDescriptor) -> SwitchHandle;

    fn set_switch_parent(&mut self, switch: SwitchHandle, device: &Handle);

    fn set_switch_feature(&mut self, switch: SwitchHandle, code: u8);

    fn set_switch_address(&mut self, switch: SwitchHandle, address: u8);
}

/// Everything a load session needs from the framework.
pub trait FirmwareHost: IdAllocator + PinResolver + Registrar {}

impl<T: IdAllocator + PinResolver + Registrar> FirmwareHost for T {}

/// Base schemas the framework contributes to every device of a kind.
pub mod base {
    /// Value grammar of a base field.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum BaseKind {
        Float,
        IdReference,
    }

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct BaseField {
        pub name: &'static str,
        pub kind: BaseKind,
    }

    pub const SETUP_PRIORITY: &str = "setup_priority";
    pub const UART_ID: &str = "uart_id";

    /// Contract shared by every component.
    pub fn component_schema() -> Vec<BaseField> {
        vec![BaseField {
            name: SETUP_PRIORITY,
            kind: BaseKind::Float,
        }]
    }

    /// Contract of a device attached to a UART bus.
    pub fn uart_device_schema() -> Vec<BaseField> {
        vec![BaseField {
            name: UART_ID,
            kind: BaseKind::IdReference,
        }]
    }
}
