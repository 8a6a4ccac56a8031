// Virtual Jack Settings Module
// Device names, advertised switches and filesystem root, loaded from TOML

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::codes::{Capabilities, SwitchCode};

/// Name the input device registers under
pub const DEFAULT_INPUT_NAME: &str = "alsa_switch";

/// Name of the switch-class device
pub const DEFAULT_SWITCH_NAME: &str = "h2w";

/// Settings for the virtual jack
///
/// These settings are loaded from a TOML file
/// (default: ~/.config/virtual-jack/settings.toml).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    input_name: String,
    input_switches: Vec<SwitchCode>,
    switch_name: String,
    /// Directory holding the class/ tree with control files
    root: Option<PathBuf>,
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    #[serde(default)]
    input: Option<InputSettings>,

    #[serde(default)]
    switch: Option<SwitchSettings>,

    #[serde(default)]
    paths: Option<PathSettings>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct InputSettings {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    switches: Option<Vec<String>>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct SwitchSettings {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct PathSettings {
    #[serde(default)]
    root: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Defaults: `alsa_switch` with all three jack switches, and `h2w`
    pub fn new() -> Self {
        Self {
            input_name: DEFAULT_INPUT_NAME.to_string(),
            input_switches: Capabilities::default().switches,
            switch_name: DEFAULT_SWITCH_NAME.to_string(),
            root: None,
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(input) = toml_settings.input {
            if let Some(name) = input.name {
                settings.input_name = validate_name("input.name", name)?;
            }
            if let Some(switches) = input.switches {
                settings.input_switches = switches
                    .iter()
                    .map(|s| parse_switch_name(s))
                    .collect::<Result<_, _>>()?;
            }
        }

        if let Some(switch) = toml_settings.switch {
            if let Some(name) = switch.name {
                settings.switch_name = validate_name("switch.name", name)?;
            }
        }

        if let Some(paths) = toml_settings.paths {
            settings.root = paths.root;
        }

        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("virtual-jack").join("settings.toml"))
    }

    /// Load from default location (~/.config/virtual-jack/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        // Return default settings if file doesn't exist
        Ok(Self::new())
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn input_switches(&self) -> &[SwitchCode] {
        &self.input_switches
    }

    /// Capabilities the input device advertises
    pub fn input_capabilities(&self) -> Capabilities {
        Capabilities::jack(&self.input_switches)
    }

    pub fn switch_name(&self) -> &str {
        &self.switch_name
    }

    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = Some(root.into());
    }

    /// Directory for the class/ tree.
    ///
    /// Falls back to `$XDG_RUNTIME_DIR/virtual-jack`, then the temp dir.
    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| {
            dirs::runtime_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("virtual-jack")
        })
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Reload settings from the original file
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(ref path) = self.source_path {
            let new_settings = Self::from_file(path)?;
            *self = new_settings;
            Ok(())
        } else {
            Err(SettingsError::InvalidValue("No source path set".to_string()))
        }
    }
}

fn parse_switch_name(name: &str) -> Result<SwitchCode, SettingsError> {
    SwitchCode::from_str(name.trim()).map_err(|_| {
        SettingsError::InvalidValue(format!(
            "Unknown switch '{}' (expected headphone_insert, microphone_insert or lineout_insert)",
            name
        ))
    })
}

/// Device names become path components, so keep them to a single one
fn validate_name(key: &str, name: String) -> Result<String, SettingsError> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(SettingsError::InvalidValue(format!(
            "{} must be a non-empty name without '/', got '{}'",
            key, name
        )));
    }
    Ok(name)
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Virtual Jack Settings
# Place this file at: ~/.config/virtual-jack/settings.toml

[input]
# Input device name, as shown by evtest
name = "alsa_switch"
# Switch codes the device advertises
switches = ["headphone_insert", "microphone_insert", "lineout_insert"]

[switch]
# Switch-class device name (Android listens on h2w)
name = "h2w"

[paths]
# Where class/input/<name>/test_input and class/switch/<name>/ are created
# (defaults to $XDG_RUNTIME_DIR/virtual-jack)
# root = "/run/virtual-jack"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::new();
        assert_eq!(settings.input_name(), "alsa_switch");
        assert_eq!(settings.switch_name(), "h2w");
        assert_eq!(settings.input_switches().len(), 3);
        assert!(settings.root().ends_with("virtual-jack"));
    }

    #[test]
    fn test_settings_from_toml() {
        let toml = r#"
[input]
name = "test_jack"
switches = ["microphone_insert"]

[switch]
name = "headset"

[paths]
root = "/tmp/vj"
"#;

        let settings = Settings::from_toml(toml).unwrap();
        assert_eq!(settings.input_name(), "test_jack");
        assert_eq!(settings.input_switches(), &[SwitchCode::MicrophoneInsert]);
        assert_eq!(settings.switch_name(), "headset");
        assert_eq!(settings.root(), PathBuf::from("/tmp/vj"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml("[switch]\nname = \"h2w_test\"\n").unwrap();
        assert_eq!(settings.input_name(), "alsa_switch");
        assert_eq!(settings.switch_name(), "h2w_test");
        assert_eq!(settings.input_switches().len(), 3);
    }

    #[test]
    fn test_default_content_parses_to_defaults() {
        let settings = Settings::from_toml(default_settings_content()).unwrap();
        assert_eq!(settings, Settings::new());
    }

    #[test]
    fn test_unknown_switch_rejected() {
        let err = Settings::from_toml("[input]\nswitches = [\"tablet_mode\"]\n").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
    }

    #[test]
    fn test_bad_name_rejected() {
        let err = Settings::from_toml("[switch]\nname = \"../etc\"\n").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
        let err = Settings::from_toml("[input]\nname = \"\"\n").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = Settings::from_toml("[input\nname=").unwrap_err();
        assert!(matches!(err, SettingsError::TomlParse(_)));
    }

    #[test]
    fn test_reload_without_source() {
        let mut settings = Settings::new();
        assert!(settings.reload().is_err());
    }

    #[test]
    fn test_from_file_records_source() {
        let path = std::env::temp_dir().join(format!(
            "virtual-jack-settings-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[input]\nname = \"file_jack\"\n").unwrap();

        let mut settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.source_path(), Some(path.as_path()));
        assert_eq!(settings.input_name(), "file_jack");

        std::fs::write(&path, "[input]\nname = \"reloaded\"\n").unwrap();
        settings.reload().unwrap();
        assert_eq!(settings.input_name(), "reloaded");
        let _ = std::fs::remove_file(&path);
    }
}
