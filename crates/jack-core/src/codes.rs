// Virtual Jack Event Codes
// Linux input-event-codes.h values used by the jack emulation

use std::fmt;

use strum_macros::{AsRefStr, EnumIter, EnumString};

/// EV_SYN event type code
pub const EV_SYN: u16 = 0x00;

/// EV_SW event type code
pub const EV_SW: u16 = 0x05;

/// SYN_REPORT code, flushes a batch of events to listeners
pub const SYN_REPORT: u16 = 0x00;

/// Switch codes advertised by the virtual jack input device.
///
/// A headset is headphone + microphone. Android treats a lone
/// `SW_MICROPHONE_INSERT` as a headset too, which is why `echo 4 1`
/// is the usual way to fake one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, AsRefStr, EnumIter, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u16)]
pub enum SwitchCode {
    HeadphoneInsert = 0x02,
    MicrophoneInsert = 0x04,
    LineoutInsert = 0x06,
}

impl SwitchCode {
    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a switch code by its numeric value
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x02 => Some(SwitchCode::HeadphoneInsert),
            0x04 => Some(SwitchCode::MicrophoneInsert),
            0x06 => Some(SwitchCode::LineoutInsert),
            _ => None,
        }
    }

    /// Kernel constant name, e.g. `SW_HEADPHONE_INSERT`
    pub fn kernel_name(self) -> &'static str {
        match self {
            SwitchCode::HeadphoneInsert => "SW_HEADPHONE_INSERT",
            SwitchCode::MicrophoneInsert => "SW_MICROPHONE_INSERT",
            SwitchCode::LineoutInsert => "SW_LINEOUT_INSERT",
        }
    }
}

impl fmt::Display for SwitchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kernel_name())
    }
}

/// Event types and switch codes a device declares at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Event types (EV_SYN, EV_SW, ...)
    pub event_types: Vec<u16>,
    /// Switch codes within EV_SW
    pub switches: Vec<SwitchCode>,
}

impl Capabilities {
    /// Capabilities of a jack: sync + switch events for the given codes
    pub fn jack(switches: &[SwitchCode]) -> Self {
        Self {
            event_types: vec![EV_SYN, EV_SW],
            switches: switches.to_vec(),
        }
    }

    pub fn supports_event_type(&self, event_type: u16) -> bool {
        self.event_types.contains(&event_type)
    }

    pub fn supports_switch(&self, code: u16) -> bool {
        self.switches.iter().any(|sw| sw.code() == code)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::jack(&[
            SwitchCode::HeadphoneInsert,
            SwitchCode::MicrophoneInsert,
            SwitchCode::LineoutInsert,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_switch_code_values() {
        // Values from linux/input-event-codes.h
        assert_eq!(SwitchCode::HeadphoneInsert.code(), 0x02);
        assert_eq!(SwitchCode::MicrophoneInsert.code(), 0x04);
        assert_eq!(SwitchCode::LineoutInsert.code(), 0x06);
        assert_eq!(EV_SW, 0x05);
    }

    #[test]
    fn test_switch_code_names() {
        assert_eq!(
            SwitchCode::from_str("microphone_insert").unwrap(),
            SwitchCode::MicrophoneInsert
        );
        assert_eq!(SwitchCode::LineoutInsert.as_ref(), "lineout_insert");
        assert!(SwitchCode::from_str("tablet_mode").is_err());
        assert_eq!(SwitchCode::HeadphoneInsert.to_string(), "SW_HEADPHONE_INSERT");
    }

    #[test]
    fn test_from_code_covers_all_variants() {
        for sw in SwitchCode::iter() {
            assert_eq!(SwitchCode::from_code(sw.code()), Some(sw));
        }
        assert_eq!(SwitchCode::from_code(0x05), None);
    }

    #[test]
    fn test_default_capabilities() {
        let caps = Capabilities::default();
        assert!(caps.supports_event_type(EV_SYN));
        assert!(caps.supports_event_type(EV_SW));
        assert!(!caps.supports_event_type(0x01)); // EV_KEY
        assert!(caps.supports_switch(4));
        assert!(!caps.supports_switch(5));
        assert_eq!(caps.switches.len(), 3);
    }
}
