use crate::emitter::Registered;
use crate::host::FirmwareHost;
use crate::session::LoadSession;
use crate::types::DeviceGraph;
use anyhow::Context;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Top-level key the device list lives under.
pub const PLATFORM_KEY: &str = "pentair_easytouch";

pub fn load_document_file(path: impl AsRef<Path>) -> anyhow::Result<Value> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config: {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing yaml: {}", path.display()))
}

/// Device mappings in a document.
///
/// The platform key may hold one mapping or a list of them. A document that
/// is itself a device mapping (has a top-level `id`) is accepted as is.
pub fn device_entries(doc: &Value) -> anyhow::Result<Vec<&Value>> {
    let map = doc
        .as_mapping()
        .context("config document must be a mapping")?;
    if map.contains_key("id") {
        return Ok(vec![doc]);
    }
    for key in map.keys() {
        if let Some(k) = key.as_str() {
            if k != PLATFORM_KEY {
                debug!(key = k, "skipping section for another platform");
            }
        }
    }
    match map.get(PLATFORM_KEY) {
        Some(Value::Sequence(list)) => Ok(list.iter().collect()),
        Some(entry @ Value::Mapping(_)) => Ok(vec![entry]),
        Some(_) => anyhow::bail!("`{PLATFORM_KEY}` must be a mapping or a list of mappings"),
        None => anyhow::bail!("no `{PLATFORM_KEY}` section found"),
    }
}

/// Process every device of a document in order, stopping at the first failure.
pub fn process_document<H: FirmwareHost>(
    session: &mut LoadSession<H>,
    doc: &Value,
) -> anyhow::Result<Vec<(DeviceGraph, Registered)>> {
    let mut out = Vec::new();
    for (i, entry) in device_entries(doc)?.into_iter().enumerate() {
        let built = session
            .process(entry)
            .with_context(|| format!("{PLATFORM_KEY}[{i}]"))?;
        out.push(built);
    }
    Ok(out)
}
