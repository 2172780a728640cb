//! Preset configurations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Embedded in a production search: no graph output, no metrics
    Quiet,

    /// Metrics on, no per-record logging
    Standard,

    /// Everything: DOT graphs, per-record and per-fork logging, metrics
    Debug,
}

impl Preset {
    /// Parse preset from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "standard" => Ok(Self::Standard),
            "debug" => Ok(Self::Debug),
            _ => Err(format!(
                "Unknown preset '{}'. Valid presets: quiet, standard, debug",
                s
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiet => "quiet",
            Self::Standard => "standard",
            Self::Debug => "debug",
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::Standard
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_from_str() {
        assert_eq!(Preset::from_str("quiet"), Ok(Preset::Quiet));
        assert_eq!(Preset::from_str("DEBUG"), Ok(Preset::Debug));
        assert!(Preset::from_str("fast").is_err());
    }

    #[test]
    fn test_preset_roundtrip_names() {
        for preset in [Preset::Quiet, Preset::Standard, Preset::Debug] {
            assert_eq!(Preset::from_str(preset.as_str()), Ok(preset));
        }
    }
}
