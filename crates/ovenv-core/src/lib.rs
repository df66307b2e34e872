//! Requirement resolution engine for Odoo virtual environments.
//!
//! This crate gathers Python requirement declarations from heterogeneous
//! sources (the Odoo core requirements file, per-addons-dir requirements
//! files, addon manifest `external_dependencies` lists, and user-supplied
//! extras), filters them against a target environment and an ignore list,
//! and merges them into a single installable stream. The actual package
//! installation is performed by an external tool and is out of scope here.

pub mod aggregate;
pub mod error;
pub mod ignore;
pub mod manifest;
pub mod marker;
pub mod requirement;
pub mod version;

pub use aggregate::{RequirementSources, aggregate, process_line};
pub use error::{Error, Result};
pub use ignore::IgnoreList;
pub use manifest::{external_python_dependencies, find_manifest_files};
pub use marker::{TargetEnv, evaluate_marker};
pub use requirement::{Requirement, Specifier, SpecifierSet, normalize_name};
pub use version::Version;
