//! Configuration I/O schema (YAML v1)

use super::ese_config::EseConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EseConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Base preset
    pub preset: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<EseConfigOverrides>,
}

/// Field overrides applied on top of the preset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EseConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_functions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_control_graphs: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_output_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_records: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_forks: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collect_metrics: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_untracked_functions: Option<bool>,
}

impl From<&EseConfig> for EseConfigOverrides {
    fn from(c: &EseConfig) -> Self {
        Self {
            exit_functions: Some(c.exit_functions.clone()),
            write_control_graphs: Some(c.write_control_graphs),
            graph_output_dir: Some(c.graph_output_dir.clone()),
            print_records: Some(c.print_records),
            print_forks: Some(c.print_forks),
            collect_metrics: Some(c.collect_metrics),
            cover_untracked_functions: Some(c.cover_untracked_functions),
        }
    }
}
