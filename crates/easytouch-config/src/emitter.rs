use crate::host::{Registrar, SensorHandle, SwitchHandle};
use crate::types::{DeviceGraph, SwitchTarget};
use tracing::{debug, info};

/// Handles the registrar assigned while emitting one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registered {
    pub sensors: Vec<SensorHandle>,
    pub switches: Vec<SwitchHandle>,
}

/// Hand a finished graph to the framework.
///
/// Order is fixed: component, transport device, sensors, flow-control pin,
/// switches. Later calls rely on the device already being known as both a
/// component and a UART device.
pub fn emit<R: Registrar + ?Sized>(graph: &DeviceGraph, registrar: &mut R) -> Registered {
    let device = &graph.device.handle;
    registrar.register_component(device, &graph.device.component);
    registrar.register_transport_device(device, &graph.device.transport);

    let mut out = Registered::default();
    for sensor in &graph.sensors {
        let handle = registrar.register_sensor(sensor);
        registrar.bind_sensor(device, sensor.role, handle);
        debug!(%device, sensor = %sensor.handle, "sensor registered");
        out.sensors.push(handle);
    }

    registrar.set_flow_control_pin(device, &graph.device.flow_control_pin);

    for sw in &graph.switches {
        let handle = registrar.register_switch(sw);
        registrar.set_switch_parent(handle, &sw.parent);
        match sw.target {
            SwitchTarget::Feature(f) => registrar.set_switch_feature(handle, f.code()),
            SwitchTarget::Address(a) => registrar.set_switch_address(handle, a),
        }
        debug!(%device, switch = %sw.handle, "switch registered");
        out.switches.push(handle);
    }

    info!(
        %device,
        sensors = out.sensors.len(),
        switches = out.switches.len(),
        "device registered"
    );
    out
}
