//! Configuration system
//!
//! Two levels:
//! - Preset: `EseConfig::from_preset(Preset::Debug)`
//! - YAML v1: a preset plus optional field overrides
//!
//! ```rust,ignore
//! use ese_core::config::{EseConfig, Preset};
//!
//! let config = EseConfig::from_preset(Preset::Standard);
//! let config = EseConfig::from_yaml_file("ese.yaml")?;
//! ```

pub mod error;
pub mod ese_config;
pub mod io;
pub mod preset;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use ese_config::EseConfig;
pub use io::{EseConfigExportV1, EseConfigOverrides};
pub use preset::Preset;
pub use validation::Validatable;
