//! Preset configuration for odoo-venv.
//!
//! A preset is a named, reusable bundle of provisioning options stored in a
//! TOML document. Shipped defaults are merged with a user-writable overlay,
//! and a reserved `common` section supplies inherited defaults layered
//! beneath every other preset.

pub mod error;
pub mod preset;
pub mod store;

pub use error::{Error, Result};
pub use preset::{ExtraCommand, Preset};
pub use store::{PRESETS_FILE, PresetStore};
