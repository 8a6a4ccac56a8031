// Virtual Jack Module Lifecycle
// Load/unload of both reporting paths and dispatch of control-file writes

use crate::input_jack::InputJack;
use crate::registry::{ControlFile, DeviceRegistry, InputHandle, RegistryResult, SwitchHandle};
use crate::settings::Settings;
use crate::switch_class::SwitchListener;
use crate::switch_jack::SwitchJack;

/// The loaded virtual jack: an input device and a switch device sharing one
/// lifecycle.
///
/// Loading is best-effort. A path that fails to register is logged and left
/// out; the other path still comes up.
pub struct VirtualJack<R: DeviceRegistry> {
    registry: R,
    input: Option<InputJack>,
    switch: Option<SwitchJack>,
}

impl<R: DeviceRegistry> VirtualJack<R> {
    /// Register the input path, then the switch path.
    pub fn load(mut registry: R, settings: &Settings) -> Self {
        let input = InputJack::register(
            &mut registry,
            settings.input_name(),
            &settings.input_capabilities(),
        )
        .ok();
        let switch = SwitchJack::register(&mut registry, settings.switch_name()).ok();

        match (&input, &switch) {
            (Some(_), Some(_)) => log::info!(
                "virtual jack loaded: input '{}', switch '{}'",
                settings.input_name(),
                settings.switch_name()
            ),
            _ => log::warn!(
                "virtual jack partially loaded: input {}, switch {}",
                if input.is_some() { "up" } else { "down" },
                if switch.is_some() { "up" } else { "down" }
            ),
        }

        Self {
            registry,
            input,
            switch,
        }
    }

    /// Handle a write to a control file, like a sysfs store callback.
    ///
    /// Returns the number of bytes consumed: the whole buffer, or 0 when the
    /// file's device is not registered.
    pub fn store(&mut self, file: ControlFile, buf: &str) -> usize {
        let result = match file {
            ControlFile::TestInput => match &self.input {
                Some(jack) => jack.store(&mut self.registry, buf).map(|_| ()),
                None => return self.drop_write(file),
            },
            ControlFile::TestState => match &self.switch {
                Some(jack) => jack.store(&mut self.registry, buf).map(|_| ()),
                None => return self.drop_write(file),
            },
        };
        if let Err(e) = result {
            log::warn!("{} write not delivered: {}", file, e);
        }
        buf.len()
    }

    fn drop_write(&self, file: ControlFile) -> usize {
        log::warn!("{} written but its device is not registered", file);
        0
    }

    pub fn input(&self) -> Option<&InputJack> {
        self.input.as_ref()
    }

    pub fn switch(&self) -> Option<&SwitchJack> {
        self.switch.as_ref()
    }

    pub fn input_handle(&self) -> Option<InputHandle> {
        self.input.as_ref().map(InputJack::handle)
    }

    pub fn switch_handle(&self) -> Option<SwitchHandle> {
        self.switch.as_ref().map(SwitchJack::handle)
    }

    /// Current switch state, if the switch path is loaded
    pub fn switch_state(&self) -> Option<i32> {
        let jack = self.switch.as_ref()?;
        jack.state(&self.registry).ok()
    }

    /// Subscribe to switch state changes. Returns false when the switch
    /// path is not loaded.
    pub fn add_switch_listener(&mut self, listener: Box<dyn SwitchListener>) -> RegistryResult<bool> {
        match self.switch_handle() {
            Some(handle) => {
                self.registry.add_switch_listener(handle, listener)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Remove both control files, then unregister both devices, the switch
    /// before the input each time. Hands the registry back.
    pub fn unload(mut self) -> R {
        if let Some(jack) = &self.switch {
            jack.remove_control(&mut self.registry);
        }
        if let Some(jack) = &self.input {
            jack.remove_control(&mut self.registry);
        }

        if let Some(jack) = self.switch.take() {
            if let Err(e) = jack.unregister(&mut self.registry) {
                log::warn!("switch_dev_unregister failed: {}", e);
            }
        }
        if let Some(jack) = self.input.take() {
            if let Err(e) = jack.unregister(&mut self.registry) {
                log::warn!("input_unregister_device failed: {}", e);
            }
        }

        log::info!("virtual jack unloaded");
        self.registry
    }
}
