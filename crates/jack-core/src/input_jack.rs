// Virtual Jack Input Path
// Input device emitting EV_SW events written to its test_input control file

use crate::codes::{Capabilities, EV_SW};
use crate::parse::{parse_input_command, InputCommand};
use crate::registry::{ControlFile, DeviceRef, DeviceRegistry, InputHandle, RegistryResult};

/// A registered input device with its `test_input` control file.
///
/// Writing `echo 4 1 > test_input` reports a headset insertion,
/// `echo 4 0 > test_input` its removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputJack {
    handle: InputHandle,
    name: String,
}

impl InputJack {
    /// Register the device, then create its control file.
    ///
    /// If the control file cannot be created the device is unregistered
    /// again before the error is returned.
    pub fn register<R: DeviceRegistry + ?Sized>(
        registry: &mut R,
        name: &str,
        capabilities: &Capabilities,
    ) -> RegistryResult<Self> {
        let handle = registry.register_input(name, capabilities).map_err(|e| {
            log::error!("input_register_device for virtual jack err: {}", e);
            e
        })?;

        if let Err(e) = registry.create_file(DeviceRef::Input(handle), ControlFile::TestInput) {
            log::error!("device_create_file for test_input err: {}", e);
            if let Err(rollback) = registry.unregister_input(handle) {
                log::warn!("rollback of input device '{}' failed: {}", name, rollback);
            }
            return Err(e);
        }

        Ok(Self {
            handle,
            name: name.to_string(),
        })
    }

    pub fn handle(&self) -> InputHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle a write to `test_input`: report one switch event and sync.
    ///
    /// The code is not checked against the advertised switches.
    pub fn store<R: DeviceRegistry + ?Sized>(
        &self,
        registry: &mut R,
        buf: &str,
    ) -> RegistryResult<InputCommand> {
        let command = parse_input_command(buf);
        log::info!(
            "emulate to report EV_SW: {:#x} {:#x}",
            command.code,
            command.value
        );
        registry.emit(self.handle, EV_SW, command.code, command.value)?;
        registry.sync(self.handle)?;
        Ok(command)
    }

    pub fn remove_control<R: DeviceRegistry + ?Sized>(&self, registry: &mut R) {
        registry.remove_file(DeviceRef::Input(self.handle), ControlFile::TestInput);
    }

    pub fn unregister<R: DeviceRegistry + ?Sized>(self, registry: &mut R) -> RegistryResult<()> {
        registry.unregister_input(self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{EV_SYN, SYN_REPORT};
    use crate::registry::{MockRegistry, RegistryError, RegistryOp};

    #[test]
    fn test_register_creates_control_file() {
        let mut registry = MockRegistry::new();
        let jack = InputJack::register(&mut registry, "alsa_switch", &Capabilities::default())
            .unwrap();

        assert_eq!(jack.name(), "alsa_switch");
        assert!(registry.has_file(DeviceRef::Input(jack.handle()), ControlFile::TestInput));
    }

    #[test]
    fn test_store_emits_event_then_sync() {
        let mut registry = MockRegistry::new();
        let journal = registry.journal();
        let jack = InputJack::register(&mut registry, "alsa_switch", &Capabilities::default())
            .unwrap();

        let command = jack.store(&mut registry, "4 1\n").unwrap();
        assert_eq!(command, InputCommand { code: 4, value: 1 });
        assert_eq!(
            journal.input_events(jack.handle()),
            vec![(EV_SW, 4, 1), (EV_SYN, SYN_REPORT, 0)]
        );
    }

    #[test]
    fn test_store_forwards_unadvertised_code() {
        let mut registry = MockRegistry::new();
        let journal = registry.journal();
        let jack = InputJack::register(&mut registry, "alsa_switch", &Capabilities::default())
            .unwrap();

        jack.store(&mut registry, "0xf 1").unwrap();
        assert_eq!(journal.input_events(jack.handle())[0], (EV_SW, 0x0f, 1));
    }

    #[test]
    fn test_control_file_failure_rolls_back() {
        let mut registry = MockRegistry::new().fail_create_file(ControlFile::TestInput);
        let journal = registry.journal();

        let err = InputJack::register(&mut registry, "alsa_switch", &Capabilities::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::ControlFile(ControlFile::TestInput, _)));
        assert_eq!(registry.input_count(), 0);

        let ops = journal.ops();
        assert!(matches!(ops[0], RegistryOp::RegisterInput { .. }));
        assert!(matches!(ops[1], RegistryOp::UnregisterInput(_)));
    }

    #[test]
    fn test_register_failure_propagates() {
        let mut registry = MockRegistry::new().fail_register_input(true);
        let journal = registry.journal();
        assert!(
            InputJack::register(&mut registry, "alsa_switch", &Capabilities::default()).is_err()
        );
        assert!(journal.is_empty());
    }
}
