//! easytouch-config: configuration compiler for the Pentair EasyTouch UART bridge
//!
//! Takes the YAML description of one or more controller bridges, validates it
//! against a composed schema, builds the linked device graph (component,
//! temperature sensors, feature switches) and registers it with the firmware
//! framework through the [`host`] traits.

mod error;
pub use error::{ConfigError, Result};

mod features;
pub use features::{Feature, UnknownRole, AUX_CODE, UNKNOWN_CODE};

mod pins;
pub use pins::{parse_output_pin, PinMode, PinSpec};

pub mod host;
pub use host::{FirmwareHost, Handle, HostError, ObjectKind, PinHandle};

mod types;
pub use types::*;

pub mod validate;

mod schema;
pub use schema::{
    device_fields, FieldKind, FieldSpec, Presence, Profile, Schema, SchemaComposer,
};

mod builder;
pub use builder::build_device;

mod emitter;
pub use emitter::{emit, Registered};

mod session;
pub use session::{LoadSession, SessionOptions};

mod loader;
pub use loader::{device_entries, load_document_file, process_document, PLATFORM_KEY};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockHost, Registration};
