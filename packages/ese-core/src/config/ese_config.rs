//! ESE configuration

use super::error::{ConfigError, ConfigResult};
use super::io::{EseConfigExportV1, EseConfigOverrides};
use super::preset::Preset;
use super::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EseConfig {
    /// Functions whose records end with an empty live read set: reaching
    /// them ends the path no matter what memory holds
    pub exit_functions: Vec<String>,

    /// Write ACFG/ACDG/control graphs as Graphviz DOT after analysis
    pub write_control_graphs: bool,

    /// Directory for DOT output
    pub graph_output_dir: PathBuf,

    /// Log record creation, termination and pruning at info level
    pub print_records: bool,

    /// Log forks at info level
    pub print_forks: bool,

    /// Register prometheus metrics
    pub collect_metrics: bool,

    /// Cover records of functions without coverage tracking up front
    pub cover_untracked_functions: bool,
}

impl Default for EseConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Standard)
    }
}

impl EseConfig {
    pub fn from_preset(preset: Preset) -> Self {
        let debug = preset == Preset::Debug;
        Self {
            exit_functions: vec!["exit".to_string(), "__error".to_string()],
            write_control_graphs: debug,
            graph_output_dir: PathBuf::from("ese-graphs"),
            print_records: debug,
            print_forks: debug,
            collect_metrics: preset != Preset::Quiet,
            cover_untracked_functions: true,
        }
    }

    pub fn with_exit_functions(mut self, names: &[&str]) -> Self {
        self.exit_functions = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_control_graphs(mut self, dir: impl Into<PathBuf>) -> Self {
        self.write_control_graphs = true;
        self.graph_output_dir = dir.into();
        self
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
        if raw.get("version").is_none() {
            return Err(ConfigError::MissingVersion);
        }

        let export: EseConfigExportV1 = serde_yaml::from_value(raw)?;
        if export.version != 1 {
            return Err(ConfigError::UnsupportedVersion {
                found: export.version,
                supported: vec![1],
            });
        }

        let preset = Preset::from_str(&export.preset)
            .map_err(|_| ConfigError::UnknownPreset(export.preset.clone()))?;
        let mut config = Self::from_preset(preset);
        if let Some(overrides) = export.overrides {
            config.apply(overrides);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Export as YAML v1 with every field as an override
    pub fn to_yaml(&self, preset: Preset) -> ConfigResult<String> {
        let export = EseConfigExportV1 {
            version: 1,
            preset: preset.as_str().to_string(),
            overrides: Some(EseConfigOverrides::from(self)),
        };
        Ok(serde_yaml::to_string(&export)?)
    }

    fn apply(&mut self, o: EseConfigOverrides) {
        if let Some(v) = o.exit_functions {
            self.exit_functions = v;
        }
        if let Some(v) = o.write_control_graphs {
            self.write_control_graphs = v;
        }
        if let Some(v) = o.graph_output_dir {
            self.graph_output_dir = v;
        }
        if let Some(v) = o.print_records {
            self.print_records = v;
        }
        if let Some(v) = o.print_forks {
            self.print_forks = v;
        }
        if let Some(v) = o.collect_metrics {
            self.collect_metrics = v;
        }
        if let Some(v) = o.cover_untracked_functions {
            self.cover_untracked_functions = v;
        }
    }
}

impl Validatable for EseConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(name) = self.exit_functions.iter().find(|n| n.trim().is_empty()) {
            return Err(ConfigError::InvalidField {
                field: "exit_functions".to_string(),
                value: format!("{name:?}"),
                hint: "Function names must not be empty".to_string(),
            });
        }

        if self.write_control_graphs && self.graph_output_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "graph_output_dir".to_string(),
                value: String::new(),
                hint: "Set a directory or disable write_control_graphs".to_string(),
            });
        }

        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "EseConfig"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_presets() {
        let quiet = EseConfig::from_preset(Preset::Quiet);
        assert!(!quiet.collect_metrics);
        assert!(!quiet.write_control_graphs);

        let debug = EseConfig::from_preset(Preset::Debug);
        assert!(debug.print_records && debug.print_forks && debug.write_control_graphs);
        assert_eq!(debug.exit_functions, vec!["exit", "__error"]);
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r#"
version: 1
preset: quiet
overrides:
  exit_functions: [abort]
  print_forks: true
"#;
        let config = EseConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.exit_functions, vec!["abort"]);
        assert!(config.print_forks);
        assert!(!config.collect_metrics);
    }

    #[test]
    fn test_yaml_missing_version() {
        let err = EseConfig::from_yaml_str("preset: debug\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVersion));
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let err = EseConfig::from_yaml_str("version: 2\npreset: debug\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { found: 2, .. }));
    }

    #[test]
    fn test_yaml_unknown_preset() {
        let err = EseConfig::from_yaml_str("version: 1\npreset: turbo\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPreset(p) if p == "turbo"));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = EseConfig::from_preset(Preset::Debug).with_exit_functions(&["halt"]);
        let yaml = config.to_yaml(Preset::Debug).unwrap();
        assert!(yaml.contains("version: 1"));
        assert_eq!(EseConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_empty_exit_function() {
        let config = EseConfig::default().with_exit_functions(&["exit", " "]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField { field, .. }) if field == "exit_functions"
        ));
    }
}
