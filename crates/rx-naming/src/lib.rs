//! Entity naming for feature resources
//!
//! This crate maps resource descriptors to entity IDs and back:
//!
//! - [`NamingCodec::encode`] renders a template such as `dehumidify_{device_id}`
//!   into `switch.dehumidify_32_153289`
//! - [`NamingCodec::decode`] recovers `(kind, local_name, device_id)` from an
//!   identifier, detecting whether the device id is a prefix or a suffix
//!
//! # Example
//!
//! ```
//! use rx_core::{DeviceId, EntityKind};
//! use rx_naming::{NamingCodec, TemplateVars};
//!
//! let codec = NamingCodec::new();
//! let vars = TemplateVars::for_device(&DeviceId::new("32:153289"));
//! let id = codec.encode_str(EntityKind::Switch, "dehumidify_{device_id}", &vars).unwrap();
//! assert_eq!(id.to_string(), "switch.dehumidify_32_153289");
//!
//! let parsed = codec.decode(&id.to_string()).unwrap();
//! assert_eq!(parsed.local_name, "dehumidify");
//! ```

mod codec;
mod error;

pub use codec::{kind_of, NamingCodec, ParsedIdentifier, TemplateVars};
pub use rx_core::PREFIX_POSITION_THRESHOLD;
pub use error::{NamingError, NamingResult, NotParseable};
