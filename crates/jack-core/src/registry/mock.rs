// Virtual Jack Mock Registry
// In-process registry that journals every operation

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    ControlFile, DeviceRef, DeviceRegistry, InputHandle, RegistryError, RegistryResult,
    SwitchHandle,
};
use crate::codes::{Capabilities, EV_SYN, SYN_REPORT};
use crate::switch_class::{SwitchDev, SwitchListener};

/// One successful registry operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOp {
    RegisterInput {
        handle: InputHandle,
        name: String,
        capabilities: Capabilities,
    },
    UnregisterInput(InputHandle),
    Event {
        handle: InputHandle,
        event_type: u16,
        code: u16,
        value: i32,
    },
    Sync(InputHandle),
    RegisterSwitch {
        handle: SwitchHandle,
        name: String,
    },
    UnregisterSwitch(SwitchHandle),
    SetState {
        handle: SwitchHandle,
        state: i32,
    },
    CreateFile {
        owner: DeviceRef,
        file: ControlFile,
    },
    RemoveFile {
        owner: DeviceRef,
        file: ControlFile,
    },
}

/// Shared view of a [`MockRegistry`]'s operation log.
///
/// Cloning is cheap; all clones see the same log.
#[derive(Debug, Clone, Default)]
pub struct RegistryJournal {
    ops: Arc<Mutex<Vec<RegistryOp>>>,
}

impl RegistryJournal {
    fn push(&self, op: RegistryOp) {
        self.ops.lock().push(op);
    }

    /// Snapshot of every operation so far
    pub fn ops(&self) -> Vec<RegistryOp> {
        self.ops.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.ops.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().is_empty()
    }

    pub fn clear(&self) {
        self.ops.lock().clear();
    }

    /// Events delivered to an input device as `(type, code, value)`.
    /// Syncs show up as `(EV_SYN, SYN_REPORT, 0)`.
    pub fn input_events(&self, handle: InputHandle) -> Vec<(u16, u16, i32)> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                RegistryOp::Event {
                    handle: h,
                    event_type,
                    code,
                    value,
                } if *h == handle => Some((*event_type, *code, *value)),
                RegistryOp::Sync(h) if *h == handle => Some((EV_SYN, SYN_REPORT, 0)),
                _ => None,
            })
            .collect()
    }

    /// States set on a switch device, in order
    pub fn switch_states(&self, handle: SwitchHandle) -> Vec<i32> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                RegistryOp::SetState { handle: h, state } if *h == handle => Some(*state),
                _ => None,
            })
            .collect()
    }
}

/// Registry that keeps devices in memory and records what happens to them.
#[derive(Debug, Default)]
pub struct MockRegistry {
    journal: RegistryJournal,
    next_id: u32,
    inputs: HashMap<InputHandle, String>,
    switches: HashMap<SwitchHandle, SwitchDev>,
    files: HashSet<(DeviceRef, ControlFile)>,
    fail_register_input: bool,
    fail_register_switch: bool,
    fail_files: HashSet<ControlFile>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the operation log
    pub fn journal(&self) -> RegistryJournal {
        self.journal.clone()
    }

    /// Make the next input registrations fail
    pub fn fail_register_input(mut self, fail: bool) -> Self {
        self.fail_register_input = fail;
        self
    }

    /// Make the next switch registrations fail
    pub fn fail_register_switch(mut self, fail: bool) -> Self {
        self.fail_register_switch = fail;
        self
    }

    /// Make creation of the given control file fail
    pub fn fail_create_file(mut self, file: ControlFile) -> Self {
        self.fail_files.insert(file);
        self
    }

    pub fn has_file(&self, owner: DeviceRef, file: ControlFile) -> bool {
        self.files.contains(&(owner, file))
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn check_input(&self, handle: InputHandle) -> RegistryResult<()> {
        if self.inputs.contains_key(&handle) {
            Ok(())
        } else {
            Err(RegistryError::UnknownDevice(DeviceRef::Input(handle)))
        }
    }

    fn switch_mut(&mut self, handle: SwitchHandle) -> RegistryResult<&mut SwitchDev> {
        self.switches
            .get_mut(&handle)
            .ok_or(RegistryError::UnknownDevice(DeviceRef::Switch(handle)))
    }

    fn check_owner(&self, owner: DeviceRef) -> RegistryResult<()> {
        let known = match owner {
            DeviceRef::Input(h) => self.inputs.contains_key(&h),
            DeviceRef::Switch(h) => self.switches.contains_key(&h),
        };
        if known {
            Ok(())
        } else {
            Err(RegistryError::UnknownDevice(owner))
        }
    }
}

impl DeviceRegistry for MockRegistry {
    fn register_input(
        &mut self,
        name: &str,
        capabilities: &Capabilities,
    ) -> RegistryResult<InputHandle> {
        if self.fail_register_input {
            return Err(RegistryError::Register(
                name.to_string(),
                "injected failure".to_string(),
            ));
        }
        let handle = InputHandle(self.next_id());
        self.inputs.insert(handle, name.to_string());
        self.journal.push(RegistryOp::RegisterInput {
            handle,
            name: name.to_string(),
            capabilities: capabilities.clone(),
        });
        Ok(handle)
    }

    fn unregister_input(&mut self, handle: InputHandle) -> RegistryResult<()> {
        self.inputs
            .remove(&handle)
            .ok_or(RegistryError::UnknownDevice(DeviceRef::Input(handle)))?;
        self.journal.push(RegistryOp::UnregisterInput(handle));
        Ok(())
    }

    fn emit(
        &mut self,
        handle: InputHandle,
        event_type: u16,
        code: u16,
        value: i32,
    ) -> RegistryResult<()> {
        self.check_input(handle)?;
        self.journal.push(RegistryOp::Event {
            handle,
            event_type,
            code,
            value,
        });
        Ok(())
    }

    fn sync(&mut self, handle: InputHandle) -> RegistryResult<()> {
        self.check_input(handle)?;
        self.journal.push(RegistryOp::Sync(handle));
        Ok(())
    }

    fn register_switch(&mut self, name: &str) -> RegistryResult<SwitchHandle> {
        if self.fail_register_switch {
            return Err(RegistryError::Register(
                name.to_string(),
                "injected failure".to_string(),
            ));
        }
        let handle = SwitchHandle(self.next_id());
        self.switches.insert(handle, SwitchDev::new(name));
        self.journal.push(RegistryOp::RegisterSwitch {
            handle,
            name: name.to_string(),
        });
        Ok(handle)
    }

    fn unregister_switch(&mut self, handle: SwitchHandle) -> RegistryResult<()> {
        self.switches
            .remove(&handle)
            .ok_or(RegistryError::UnknownDevice(DeviceRef::Switch(handle)))?;
        self.journal.push(RegistryOp::UnregisterSwitch(handle));
        Ok(())
    }

    fn set_state(&mut self, handle: SwitchHandle, state: i32) -> RegistryResult<()> {
        self.switch_mut(handle)?.set_state(state);
        self.journal.push(RegistryOp::SetState { handle, state });
        Ok(())
    }

    fn state(&self, handle: SwitchHandle) -> RegistryResult<i32> {
        self.switches
            .get(&handle)
            .map(SwitchDev::state)
            .ok_or(RegistryError::UnknownDevice(DeviceRef::Switch(handle)))
    }

    fn add_switch_listener(
        &mut self,
        handle: SwitchHandle,
        listener: Box<dyn SwitchListener>,
    ) -> RegistryResult<()> {
        self.switch_mut(handle)?.add_listener(listener);
        Ok(())
    }

    fn create_file(&mut self, owner: DeviceRef, file: ControlFile) -> RegistryResult<()> {
        self.check_owner(owner)?;
        if self.fail_files.contains(&file) {
            return Err(RegistryError::ControlFile(
                file,
                "injected failure".to_string(),
            ));
        }
        self.files.insert((owner, file));
        self.journal.push(RegistryOp::CreateFile { owner, file });
        Ok(())
    }

    fn remove_file(&mut self, owner: DeviceRef, file: ControlFile) {
        if self.files.remove(&(owner, file)) {
            self.journal.push(RegistryOp::RemoveFile { owner, file });
        }
    }
}
