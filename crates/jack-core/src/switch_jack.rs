// Virtual Jack Switch Path
// Switch-class device whose state follows its test_state control file

use crate::parse::{parse_state_command, StateCommand};
use crate::registry::{ControlFile, DeviceRef, DeviceRegistry, RegistryResult, SwitchHandle};

/// A registered switch device (usually `h2w`) with its `test_state` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchJack {
    handle: SwitchHandle,
    name: String,
}

impl SwitchJack {
    /// Register the switch, then create its control file, unregistering
    /// the switch again if that fails.
    pub fn register<R: DeviceRegistry + ?Sized>(registry: &mut R, name: &str) -> RegistryResult<Self> {
        let handle = registry.register_switch(name).map_err(|e| {
            log::error!("switch_dev_register {} err: {}", name, e);
            e
        })?;

        if let Err(e) = registry.create_file(DeviceRef::Switch(handle), ControlFile::TestState) {
            log::error!("device_create_file for test_state err: {}", e);
            if let Err(rollback) = registry.unregister_switch(handle) {
                log::warn!("rollback of switch '{}' failed: {}", name, rollback);
            }
            return Err(e);
        }

        Ok(Self {
            handle,
            name: name.to_string(),
        })
    }

    pub fn handle(&self) -> SwitchHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle a write to `test_state`.
    pub fn store<R: DeviceRegistry + ?Sized>(
        &self,
        registry: &mut R,
        buf: &str,
    ) -> RegistryResult<StateCommand> {
        let command = parse_state_command(buf);
        log::info!("emulate to report switch state: {:#x}", command.state);
        registry.set_state(self.handle, command.state)?;
        Ok(command)
    }

    pub fn state<R: DeviceRegistry + ?Sized>(&self, registry: &R) -> RegistryResult<i32> {
        registry.state(self.handle)
    }

    pub fn remove_control<R: DeviceRegistry + ?Sized>(&self, registry: &mut R) {
        registry.remove_file(DeviceRef::Switch(self.handle), ControlFile::TestState);
    }

    pub fn unregister<R: DeviceRegistry + ?Sized>(self, registry: &mut R) -> RegistryResult<()> {
        registry.unregister_switch(self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MockRegistry, RegistryOp};

    #[test]
    fn test_store_sets_state() {
        let mut registry = MockRegistry::new();
        let jack = SwitchJack::register(&mut registry, "h2w").unwrap();

        jack.store(&mut registry, "1\n").unwrap();
        assert_eq!(jack.state(&registry).unwrap(), 1);
        jack.store(&mut registry, "0").unwrap();
        assert_eq!(jack.state(&registry).unwrap(), 0);
    }

    #[test]
    fn test_store_tolerates_whitespace_and_hex() {
        let mut registry = MockRegistry::new();
        let jack = SwitchJack::register(&mut registry, "h2w").unwrap();

        let command = jack.store(&mut registry, " \t0x2 \n").unwrap();
        assert_eq!(command, StateCommand { state: 2 });
        assert_eq!(jack.state(&registry).unwrap(), 2);
    }

    #[test]
    fn test_control_file_failure_rolls_back() {
        let mut registry = MockRegistry::new().fail_create_file(ControlFile::TestState);
        let journal = registry.journal();

        assert!(SwitchJack::register(&mut registry, "h2w").is_err());
        assert_eq!(registry.switch_count(), 0);
        assert!(matches!(journal.ops().last(), Some(RegistryOp::UnregisterSwitch(_))));
    }
}
