//! Turns a validated [`DeviceConfig`] into a linked [`DeviceGraph`].
//!
//! Identifiers and the flow-control pin are acquired from the host as the
//! graph is built. If any step fails, everything acquired so far is handed
//! back before the error is returned, so a failed device leaves no trace.

use crate::error::{ConfigError, Result};
use crate::host::{
    ComponentOptions, Handle, HostError, IdAllocator, ObjectKind, PinHandle, PinResolver,
    TransportConfig,
};
use crate::schema::FLOW_CONTROL_PIN;
use crate::types::{
    DeviceConfig, DeviceGraph, DeviceNode, SensorDescriptor, SensorRole, SwitchDescriptor,
    TEMPERATURE_ACCURACY, TEMPERATURE_CLASS, TEMPERATURE_UNIT, THERMOMETER_ICON,
    UPDATE_INTERVAL_MS,
};
use tracing::{debug, info, warn};

#[derive(Default)]
struct Acquired {
    handles: Vec<Handle>,
    pin: Option<PinHandle>,
}

impl Acquired {
    fn release<H: IdAllocator + PinResolver + ?Sized>(self, host: &mut H) {
        if let Some(pin) = &self.pin {
            host.release_pin(pin);
        }
        for handle in self.handles.iter().rev() {
            host.release(handle);
        }
    }
}

pub fn build_device<H>(config: &DeviceConfig, host: &mut H) -> Result<DeviceGraph>
where
    H: IdAllocator + PinResolver + ?Sized,
{
    let mut acquired = Acquired::default();
    match build_inner(config, host, &mut acquired) {
        Ok(graph) => {
            info!(
                device = %graph.device.handle,
                sensors = graph.sensors.len(),
                switches = graph.switches.len(),
                "device graph built"
            );
            Ok(graph)
        }
        Err(e) => {
            warn!(device = %config.id, error = %e, "discarding partially built device");
            acquired.release(host);
            Err(e)
        }
    }
}

fn build_inner<H>(config: &DeviceConfig, host: &mut H, acquired: &mut Acquired) -> Result<DeviceGraph>
where
    H: IdAllocator + PinResolver + ?Sized,
{
    let device = declare(host, acquired, "id", &config.id, ObjectKind::Component)?;

    let mut sensors = Vec::new();
    for role in SensorRole::ALL {
        let Some(sensor) = config.sensor(role) else {
            continue;
        };
        let path = format!("{}.id", role.slot());
        let handle = declare(host, acquired, &path, &sensor.id, ObjectKind::Sensor)?;
        debug!(sensor = %handle, ?role, "sensor allocated");
        sensors.push(SensorDescriptor {
            handle,
            role,
            name: sensor.name.clone(),
            unit_of_measurement: TEMPERATURE_UNIT,
            icon: THERMOMETER_ICON,
            accuracy_decimals: TEMPERATURE_ACCURACY,
            device_class: TEMPERATURE_CLASS,
            disabled_by_default: sensor.disabled_by_default,
        });
    }

    let pin = host
        .resolve(&config.flow_control_pin)
        .map_err(|e| ConfigError::InvalidPin {
            path: FLOW_CONTROL_PIN.to_string(),
            reason: e.to_string(),
        })?;
    acquired.pin = Some(pin);

    let mut switches = Vec::new();
    for sw in &config.switches {
        let path = format!("{}.id", sw.slot);
        let handle = declare(host, acquired, &path, &sw.id, ObjectKind::Switch)?;
        debug!(switch = %handle, target = ?sw.target, "switch allocated");
        switches.push(SwitchDescriptor {
            handle,
            slot: sw.slot.clone(),
            name: sw.name.clone(),
            icon: sw.icon.clone(),
            inverted: sw.inverted,
            disabled_by_default: sw.disabled_by_default,
            parent: device.clone(),
            target: sw.target,
        });
    }

    Ok(DeviceGraph {
        device: DeviceNode {
            handle: device,
            flow_control_pin: pin,
            component: ComponentOptions {
                setup_priority: config.setup_priority,
                update_interval_ms: UPDATE_INTERVAL_MS,
            },
            transport: TransportConfig {
                uart_id: config.uart_id.clone(),
            },
        },
        sensors,
        switches,
    })
}

fn declare<H>(
    host: &mut H,
    acquired: &mut Acquired,
    path: &str,
    name: &str,
    kind: ObjectKind,
) -> Result<Handle>
where
    H: IdAllocator + PinResolver + ?Sized,
{
    let handle = host.declare(name, kind).map_err(|e| match e {
        HostError::DuplicateIdentifier(id) => ConfigError::DuplicateIdentifier {
            path: path.to_string(),
            id,
        },
        other => ConfigError::invalid(path, other.to_string()),
    })?;
    acquired.handles.push(handle.clone());
    Ok(handle)
}
