//! Pin descriptor grammar for the ESP32 host.
//!
//! Accepted forms:
//! - `GPIO4` (prefix is case-insensitive)
//! - `4`
//! - `{ number: GPIO4, inverted: true, mode: output }`
//!
//! `mode` may be a string (`output`, `OUTPUT_OPEN_DRAIN`, ...) or a mapping of
//! flags. The flow-control pin drives the RS-485 transceiver, so whatever form
//! is used the resulting mode must be output-capable.

use crate::error::{ConfigError, Result};
use crate::validate::{child, expect_bool, expect_mapping, reject_unknown, require_present};
use serde::Serialize;
use serde_yaml::Value;
use std::fmt;
use tracing::warn;

/// Pins the chip does not bond out.
const MISSING: [u8; 6] = [20, 24, 28, 29, 30, 31];
const HIGHEST_PIN: u8 = 39;
const FIRST_INPUT_ONLY: u8 = 34;
/// Wired to the SPI flash on every module.
const FLASH_PINS: core::ops::RangeInclusive<u8> = 6..=11;
/// Sampled at reset; usable, but the board may fail to boot if driven.
const STRAPPING: [u8; 5] = [0, 2, 5, 12, 15];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize)]
pub struct PinMode {
    pub input: bool,
    pub output: bool,
    pub open_drain: bool,
    pub pullup: bool,
    pub pulldown: bool,
}

impl PinMode {
    pub fn output() -> Self {
        Self {
            output: true,
            ..Self::default()
        }
    }
}

/// A validated pin descriptor, not yet claimed from the host.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct PinSpec {
    pub number: u8,
    pub inverted: bool,
    pub mode: PinMode,
}

impl fmt::Display for PinSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.number)?;
        if self.inverted {
            f.write_str(" (inverted)")?;
        }
        if self.mode.open_drain {
            f.write_str(" (open drain)")?;
        }
        Ok(())
    }
}

/// Validate an output pin descriptor at `path`.
pub fn parse_output_pin(path: &str, value: &Value, warn_strapping: bool) -> Result<PinSpec> {
    let spec = match value {
        Value::Mapping(_) => parse_pin_mapping(path, value)?,
        scalar => PinSpec {
            number: parse_number(path, scalar)?,
            inverted: false,
            mode: PinMode::output(),
        },
    };
    check_output_capable(path, spec.number)?;
    if warn_strapping && STRAPPING.contains(&spec.number) {
        warn!(
            %path,
            pin = spec.number,
            "GPIO{} is a strapping pin; driving it at reset can stop the board from booting",
            spec.number
        );
    }
    Ok(spec)
}

fn parse_pin_mapping(path: &str, value: &Value) -> Result<PinSpec> {
    const FIELDS: [&str; 3] = ["number", "inverted", "mode"];
    let map = expect_mapping(path, value)?;
    require_present(path, map, &["number"])?;

    let mut number = 0;
    let mut inverted = false;
    let mut mode = PinMode::output();
    if let Some(v) = map.get("number") {
        number = parse_number(&child(path, "number"), v)?;
    }
    if let Some(v) = map.get("inverted") {
        inverted = expect_bool(&child(path, "inverted"), v)?;
    }
    if let Some(v) = map.get("mode") {
        mode = parse_mode(&child(path, "mode"), v)?;
    }
    reject_unknown(path, map, &FIELDS)?;

    Ok(PinSpec {
        number,
        inverted,
        mode,
    })
}

fn parse_number(path: &str, value: &Value) -> Result<u8> {
    let raw = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let t = s.trim();
            let digits = match t.get(..4) {
                Some(prefix) if prefix.eq_ignore_ascii_case("gpio") => &t[4..],
                _ => t,
            };
            digits.parse::<u64>().ok()
        }
        _ => None,
    };
    let n = raw.ok_or_else(|| invalid_pin(path, format!("cannot parse `{}`", scalar_text(value))))?;
    u8::try_from(n)
        .ok()
        .filter(|n| *n <= HIGHEST_PIN && !MISSING.contains(n))
        .ok_or_else(|| invalid_pin(path, format!("GPIO{n} does not exist on the ESP32")))
}

fn parse_mode(path: &str, value: &Value) -> Result<PinMode> {
    let mode = match value {
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "output" => PinMode::output(),
            "output_open_drain" => PinMode {
                open_drain: true,
                ..PinMode::output()
            },
            "input" | "input_pullup" | "input_pulldown" => PinMode {
                input: true,
                ..PinMode::default()
            },
            other => return Err(invalid_pin(path, format!("unknown pin mode `{other}`"))),
        },
        Value::Mapping(map) => {
            const FLAGS: [&str; 5] = ["input", "output", "open_drain", "pullup", "pulldown"];
            let flag = |name: &str| -> Result<bool> {
                map.get(name)
                    .map(|v| expect_bool(&child(path, name), v))
                    .transpose()
                    .map(|b| b.unwrap_or(false))
            };
            let mode = PinMode {
                input: flag("input")?,
                output: flag("output")?,
                open_drain: flag("open_drain")?,
                pullup: flag("pullup")?,
                pulldown: flag("pulldown")?,
            };
            reject_unknown(path, map, &FLAGS)?;
            mode
        }
        other => {
            return Err(invalid_pin(
                path,
                format!("cannot parse mode `{}`", scalar_text(other)),
            ))
        }
    };
    if !mode.output || mode.input {
        return Err(invalid_pin(path, "mode must be output-only"));
    }
    Ok(mode)
}

fn check_output_capable(path: &str, number: u8) -> Result<()> {
    if number >= FIRST_INPUT_ONLY {
        return Err(invalid_pin(path, format!("GPIO{number} is input-only")));
    }
    if FLASH_PINS.contains(&number) {
        return Err(invalid_pin(
            path,
            format!("GPIO{number} is reserved for the SPI flash"),
        ));
    }
    Ok(())
}

fn invalid_pin(path: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidPin {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => "<non-scalar>".to_string(),
    }
}
