// Virtual Jack Core Library
// Emulated audio-jack detection: an EV_SW input device plus an h2w switch device

pub mod codes;
pub mod control;
pub mod input_jack;
pub mod module;
pub mod parse;
pub mod registry;
pub mod settings;
pub mod switch_class;
pub mod switch_jack;

pub use codes::{Capabilities, SwitchCode, EV_SW, EV_SYN, SYN_REPORT};
pub use input_jack::InputJack;
pub use module::VirtualJack;
pub use parse::{parse_input_command, parse_long, parse_state_command, InputCommand, StateCommand};
pub use registry::{
    ControlFile, DeviceRef, DeviceRegistry, InputHandle, MockRegistry, RegistryError,
    RegistryJournal, RegistryOp, RegistryResult, SwitchHandle,
};
pub use settings::{default_settings_content, Settings, SettingsError};
pub use switch_class::{SwitchDev, SwitchListener, SwitchUevent};
pub use switch_jack::SwitchJack;

#[cfg(feature = "uinput")]
pub use registry::{PendingWrite, UinputRegistry};
