// Virtual Jack uinput Registry
// Real input devices through /dev/uinput, switch class and control files on disk

use std::collections::HashMap;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, SwitchType};

use super::{
    ControlFile, DeviceRef, DeviceRegistry, InputHandle, RegistryError, RegistryResult,
    SwitchHandle,
};
use crate::codes::Capabilities;
use crate::control::{poll_readable, split_writes, ControlFifo};
use crate::switch_class::{SwitchDev, SwitchListener};

/// A write picked up from one of the control pipes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub file: ControlFile,
    pub data: String,
}

struct UinputInput {
    name: String,
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

struct SysfsSwitch {
    dev: SwitchDev,
    dir: PathBuf,
}

/// Registry backed by uinput for input devices and a sysfs-like tree for
/// switch devices.
///
/// Layout under `root`:
///   class/input/<name>/test_input
///   class/switch/<name>/{name,state,test_state}
pub struct UinputRegistry {
    root: PathBuf,
    next_id: u32,
    inputs: HashMap<InputHandle, UinputInput>,
    switches: HashMap<SwitchHandle, SysfsSwitch>,
    controls: HashMap<(DeviceRef, ControlFile), ControlFifo>,
}

impl UinputRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_id: 0,
            inputs: HashMap::new(),
            switches: HashMap::new(),
            controls: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn input_dir(&self, name: &str) -> PathBuf {
        self.root.join("class").join("input").join(name)
    }

    fn switch_dir(&self, name: &str) -> PathBuf {
        self.root.join("class").join("switch").join(name)
    }

    fn owner_dir(&self, owner: DeviceRef) -> RegistryResult<PathBuf> {
        match owner {
            DeviceRef::Input(h) => self
                .inputs
                .get(&h)
                .map(|input| self.input_dir(&input.name))
                .ok_or(RegistryError::UnknownDevice(owner)),
            DeviceRef::Switch(h) => self
                .switches
                .get(&h)
                .map(|sw| sw.dir.clone())
                .ok_or(RegistryError::UnknownDevice(owner)),
        }
    }

    fn input_mut(&mut self, handle: InputHandle) -> RegistryResult<&mut UinputInput> {
        self.inputs
            .get_mut(&handle)
            .ok_or(RegistryError::UnknownDevice(DeviceRef::Input(handle)))
    }

    fn switch_mut(&mut self, handle: SwitchHandle) -> RegistryResult<&mut SysfsSwitch> {
        self.switches
            .get_mut(&handle)
            .ok_or(RegistryError::UnknownDevice(DeviceRef::Switch(handle)))
    }

    /// Path of a control file, if it has been created
    pub fn control_path(&self, file: ControlFile) -> Option<&Path> {
        self.controls
            .iter()
            .find(|((_, f), _)| *f == file)
            .map(|(_, fifo)| fifo.path())
    }

    /// Wait up to `timeout_ms` for writes to any control file.
    ///
    /// Each line written to a pipe becomes one [`PendingWrite`].
    pub fn poll_controls(&mut self, timeout_ms: i32) -> RegistryResult<Vec<PendingWrite>> {
        let mut writes = Vec::new();
        if self.controls.is_empty() {
            std::thread::sleep(std::time::Duration::from_millis(timeout_ms.max(0) as u64));
            return Ok(writes);
        }

        let keys: Vec<(DeviceRef, ControlFile)> = self.controls.keys().copied().collect();
        let fds: Vec<_> = keys
            .iter()
            .filter_map(|key| self.controls.get(key).map(AsRawFd::as_raw_fd))
            .collect();

        for index in poll_readable(&fds, timeout_ms)? {
            let (_, file) = keys[index];
            let Some(fifo) = self.controls.get_mut(&keys[index]) else {
                continue;
            };
            let data = fifo.read_pending()?;
            for line in split_writes(&data) {
                writes.push(PendingWrite {
                    file,
                    data: line.to_string(),
                });
            }
        }
        Ok(writes)
    }

    fn write_switch_attr(dir: &Path, attr: &str, value: &str) -> RegistryResult<()> {
        std::fs::write(dir.join(attr), format!("{}\n", value))?;
        Ok(())
    }
}

impl DeviceRegistry for UinputRegistry {
    fn register_input(
        &mut self,
        name: &str,
        capabilities: &Capabilities,
    ) -> RegistryResult<InputHandle> {
        let mut switches = AttributeSet::<SwitchType>::new();
        for sw in &capabilities.switches {
            switches.insert(SwitchType(sw.code()));
        }

        // EV_SYN is implied by uinput; EV_SW comes from the switch set
        let device = VirtualDeviceBuilder::new()
            .map_err(|e| RegistryError::DeviceCreation(name.to_string(), e.to_string()))?
            .name(name)
            .with_switches(&switches)
            .map_err(|e| RegistryError::Register(name.to_string(), e.to_string()))?
            .build()
            .map_err(|e| RegistryError::Register(name.to_string(), e.to_string()))?;

        let handle = InputHandle(self.next_id());
        log::debug!("registered uinput device '{}' as {:?}", name, handle);
        self.inputs.insert(
            handle,
            UinputInput {
                name: name.to_string(),
                device,
                pending: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn unregister_input(&mut self, handle: InputHandle) -> RegistryResult<()> {
        let input = self
            .inputs
            .remove(&handle)
            .ok_or(RegistryError::UnknownDevice(DeviceRef::Input(handle)))?;
        let dir = self.input_dir(&input.name);
        // Dropping the VirtualDevice destroys the uinput node
        drop(input);
        let _ = std::fs::remove_dir(dir);
        Ok(())
    }

    fn emit(
        &mut self,
        handle: InputHandle,
        event_type: u16,
        code: u16,
        value: i32,
    ) -> RegistryResult<()> {
        let input = self.input_mut(handle)?;
        input
            .pending
            .push(InputEvent::new(EventType(event_type), code, value));
        Ok(())
    }

    fn sync(&mut self, handle: InputHandle) -> RegistryResult<()> {
        let input = self.input_mut(handle)?;
        let batch = std::mem::take(&mut input.pending);
        // emit() terminates the batch with SYN_REPORT
        input.device.emit(&batch)?;
        log::trace!("flushed {} event(s) on '{}'", batch.len(), input.name);
        Ok(())
    }

    fn register_switch(&mut self, name: &str) -> RegistryResult<SwitchHandle> {
        let dir = self.switch_dir(name);
        std::fs::create_dir_all(&dir)
            .map_err(|e| RegistryError::Register(name.to_string(), e.to_string()))?;

        let dev = SwitchDev::new(name);
        Self::write_switch_attr(&dir, "name", dev.name())?;
        Self::write_switch_attr(&dir, "state", &dev.state().to_string())?;

        let handle = SwitchHandle(self.next_id());
        log::debug!("registered switch '{}' at {}", name, dir.display());
        self.switches.insert(handle, SysfsSwitch { dev, dir });
        Ok(handle)
    }

    fn unregister_switch(&mut self, handle: SwitchHandle) -> RegistryResult<()> {
        let sw = self
            .switches
            .remove(&handle)
            .ok_or(RegistryError::UnknownDevice(DeviceRef::Switch(handle)))?;
        for attr in ["name", "state"] {
            let _ = std::fs::remove_file(sw.dir.join(attr));
        }
        let _ = std::fs::remove_dir(&sw.dir);
        Ok(())
    }

    fn set_state(&mut self, handle: SwitchHandle, state: i32) -> RegistryResult<()> {
        let sw = self.switch_mut(handle)?;
        if let Some(event) = sw.dev.set_state(state) {
            Self::write_switch_attr(&sw.dir, "state", &state.to_string())?;
            log::debug!("{}", event);
        }
        Ok(())
    }

    fn state(&self, handle: SwitchHandle) -> RegistryResult<i32> {
        self.switches
            .get(&handle)
            .map(|sw| sw.dev.state())
            .ok_or(RegistryError::UnknownDevice(DeviceRef::Switch(handle)))
    }

    fn add_switch_listener(
        &mut self,
        handle: SwitchHandle,
        listener: Box<dyn SwitchListener>,
    ) -> RegistryResult<()> {
        self.switch_mut(handle)?.dev.add_listener(listener);
        Ok(())
    }

    fn create_file(&mut self, owner: DeviceRef, file: ControlFile) -> RegistryResult<()> {
        let path = self.owner_dir(owner)?.join(file.attr_name());
        let fifo =
            ControlFifo::create(&path).map_err(|e| RegistryError::ControlFile(file, e.to_string()))?;
        log::info!("control file {} ready at {}", file, path.display());
        self.controls.insert((owner, file), fifo);
        Ok(())
    }

    fn remove_file(&mut self, owner: DeviceRef, file: ControlFile) {
        if let Some(fifo) = self.controls.remove(&(owner, file)) {
            if let Err(e) = fifo.remove() {
                log::warn!("failed to remove control file {}: {}", file, e);
            }
        }
    }
}

impl Drop for UinputRegistry {
    fn drop(&mut self) {
        for (_, fifo) in self.controls.drain() {
            let _ = fifo.remove();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::EV_SW;

    fn scratch_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "virtual-jack-uinput-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_switch_tree_on_disk() {
        let root = scratch_root("switch");
        let mut registry = UinputRegistry::new(&root);

        let handle = registry.register_switch("h2w").unwrap();
        let dir = root.join("class/switch/h2w");
        assert_eq!(std::fs::read_to_string(dir.join("name")).unwrap(), "h2w\n");
        assert_eq!(std::fs::read_to_string(dir.join("state")).unwrap(), "0\n");

        registry.set_state(handle, 1).unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("state")).unwrap(), "1\n");
        assert_eq!(registry.state(handle).unwrap(), 1);

        registry
            .create_file(DeviceRef::Switch(handle), ControlFile::TestState)
            .unwrap();
        assert_eq!(
            registry.control_path(ControlFile::TestState),
            Some(dir.join("test_state").as_path())
        );

        registry.remove_file(DeviceRef::Switch(handle), ControlFile::TestState);
        registry.unregister_switch(handle).unwrap();
        assert!(!dir.exists());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_poll_controls_splits_lines() {
        use std::io::Write;

        let root = scratch_root("poll");
        let mut registry = UinputRegistry::new(&root);
        let handle = registry.register_switch("h2w").unwrap();
        registry
            .create_file(DeviceRef::Switch(handle), ControlFile::TestState)
            .unwrap();

        let path = registry
            .control_path(ControlFile::TestState)
            .unwrap()
            .to_path_buf();
        let mut writer = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        writer.write_all(b"1\n0\n").unwrap();
        drop(writer);

        let writes = registry.poll_controls(1000).unwrap();
        assert_eq!(
            writes,
            vec![
                PendingWrite {
                    file: ControlFile::TestState,
                    data: "1".to_string()
                },
                PendingWrite {
                    file: ControlFile::TestState,
                    data: "0".to_string()
                },
            ]
        );
        drop(registry);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_virtual_device_creation() {
        // Needs access to /dev/uinput, which CI containers usually lack
        let root = scratch_root("input");
        let mut registry = UinputRegistry::new(&root);
        match registry.register_input("alsa_switch", &Capabilities::default()) {
            Ok(handle) => {
                registry.emit(handle, EV_SW, 4, 1).unwrap();
                registry.sync(handle).unwrap();
                registry.unregister_input(handle).unwrap();
            }
            Err(_) => {
                // No uinput access here
            }
        }
        let _ = std::fs::remove_dir_all(&root);
    }
}
