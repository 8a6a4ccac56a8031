// Virtual Jack Device Registry
// Host-side device registration, event emission and control files

mod mock;

#[cfg(feature = "uinput")]
mod uinput;

pub use mock::{MockRegistry, RegistryJournal, RegistryOp};

#[cfg(feature = "uinput")]
pub use uinput::{PendingWrite, UinputRegistry};

use std::fmt;

use crate::codes::Capabilities;
use crate::switch_class::SwitchListener;

/// Handle to a registered input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputHandle(pub u32);

/// Handle to a registered switch device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwitchHandle(pub u32);

/// The device a control file hangs off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceRef {
    Input(InputHandle),
    Switch(SwitchHandle),
}

/// Writable control files exposed by the virtual jack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFile {
    /// `test_input` on the input device: `"<code> <value>"`
    TestInput,
    /// `test_state` on the switch device: `"<state>"`
    TestState,
}

impl ControlFile {
    /// Attribute file name
    pub fn attr_name(self) -> &'static str {
        match self {
            ControlFile::TestInput => "test_input",
            ControlFile::TestState => "test_state",
        }
    }

    pub fn from_attr_name(name: &str) -> Option<Self> {
        match name {
            "test_input" => Some(ControlFile::TestInput),
            "test_state" => Some(ControlFile::TestState),
            _ => None,
        }
    }
}

impl fmt::Display for ControlFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attr_name())
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors reported by a device registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to allocate device '{0}': {1}")]
    DeviceCreation(String, String),

    #[error("Failed to register device '{0}': {1}")]
    Register(String, String),

    #[error("Failed to create control file {0}: {1}")]
    ControlFile(ControlFile, String),

    #[error("Unknown device handle: {0:?}")]
    UnknownDevice(DeviceRef),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations the virtual jack needs from its host.
///
/// Stands in for the kernel input core, the switch class and sysfs
/// attribute files. Implementations own the devices; callers only hold
/// handles.
pub trait DeviceRegistry {
    /// Register an input device advertising `capabilities`
    fn register_input(
        &mut self,
        name: &str,
        capabilities: &Capabilities,
    ) -> RegistryResult<InputHandle>;

    /// Unregister and free an input device
    fn unregister_input(&mut self, handle: InputHandle) -> RegistryResult<()>;

    /// Queue one event on an input device
    fn emit(
        &mut self,
        handle: InputHandle,
        event_type: u16,
        code: u16,
        value: i32,
    ) -> RegistryResult<()>;

    /// Flush queued events with a SYN_REPORT
    fn sync(&mut self, handle: InputHandle) -> RegistryResult<()>;

    /// Register a named switch device
    fn register_switch(&mut self, name: &str) -> RegistryResult<SwitchHandle>;

    fn unregister_switch(&mut self, handle: SwitchHandle) -> RegistryResult<()>;

    /// Set a switch device's state, notifying listeners if it changed
    fn set_state(&mut self, handle: SwitchHandle, state: i32) -> RegistryResult<()>;

    /// Current state of a switch device
    fn state(&self, handle: SwitchHandle) -> RegistryResult<i32>;

    /// Subscribe to state changes of a switch device
    fn add_switch_listener(
        &mut self,
        handle: SwitchHandle,
        listener: Box<dyn SwitchListener>,
    ) -> RegistryResult<()>;

    /// Create a writable control file on a device
    fn create_file(&mut self, owner: DeviceRef, file: ControlFile) -> RegistryResult<()>;

    fn remove_file(&mut self, owner: DeviceRef, file: ControlFile);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_file_names() {
        assert_eq!(ControlFile::TestInput.attr_name(), "test_input");
        assert_eq!(ControlFile::TestState.to_string(), "test_state");
        assert_eq!(
            ControlFile::from_attr_name("test_state"),
            Some(ControlFile::TestState)
        );
        assert_eq!(ControlFile::from_attr_name("state"), None);
    }

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::ControlFile(ControlFile::TestInput, "denied".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to create control file test_input: denied"
        );
    }
}
