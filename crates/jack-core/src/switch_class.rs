// Virtual Jack Switch Class
// Named binary/state switch devices with change notification

use std::fmt;

/// Notification sent to listeners when a switch changes state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchUevent {
    pub name: String,
    pub state: i32,
}

impl SwitchUevent {
    /// Environment lines as the switch class puts them in its change uevent
    pub fn env(&self) -> [String; 2] {
        [
            format!("SWITCH_NAME={}", self.name),
            format!("SWITCH_STATE={}", self.state),
        ]
    }
}

impl fmt::Display for SwitchUevent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "change SWITCH_NAME={} SWITCH_STATE={}", self.name, self.state)
    }
}

/// Receives switch state changes.
pub trait SwitchListener: Send {
    fn on_change(&mut self, event: &SwitchUevent);
}

impl<F> SwitchListener for F
where
    F: FnMut(&SwitchUevent) + Send,
{
    fn on_change(&mut self, event: &SwitchUevent) {
        self(event)
    }
}

/// A switch-class device: a name, an integer state and its listeners.
pub struct SwitchDev {
    name: String,
    state: i32,
    listeners: Vec<Box<dyn SwitchListener>>,
}

impl SwitchDev {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: 0,
            listeners: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> i32 {
        self.state
    }

    pub fn add_listener(&mut self, listener: Box<dyn SwitchListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Set the state, notifying listeners only if it changed.
    ///
    /// Returns the notification that was sent, if any.
    pub fn set_state(&mut self, state: i32) -> Option<SwitchUevent> {
        if self.state == state {
            return None;
        }
        self.state = state;

        let event = SwitchUevent {
            name: self.name.clone(),
            state,
        };
        for listener in &mut self.listeners {
            listener.on_change(&event);
        }
        Some(event)
    }
}

impl fmt::Debug for SwitchDev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchDev")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recording_listener() -> (Box<dyn SwitchListener>, Arc<Mutex<Vec<SwitchUevent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener = move |event: &SwitchUevent| sink.lock().push(event.clone());
        (Box::new(listener), seen)
    }

    #[test]
    fn test_new_switch_starts_at_zero() {
        let sdev = SwitchDev::new("h2w");
        assert_eq!(sdev.name(), "h2w");
        assert_eq!(sdev.state(), 0);
        assert_eq!(sdev.listener_count(), 0);
    }

    #[test]
    fn test_set_state_notifies_on_change() {
        let mut sdev = SwitchDev::new("h2w");
        let (listener, seen) = recording_listener();
        sdev.add_listener(listener);

        let event = sdev.set_state(1);
        assert_eq!(
            event,
            Some(SwitchUevent {
                name: "h2w".to_string(),
                state: 1
            })
        );
        assert_eq!(sdev.state(), 1);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_set_same_state_is_silent() {
        let mut sdev = SwitchDev::new("h2w");
        let (listener, seen) = recording_listener();
        sdev.add_listener(listener);

        assert!(sdev.set_state(0).is_none());
        sdev.set_state(2);
        assert!(sdev.set_state(2).is_none());
        sdev.set_state(0);

        let states: Vec<i32> = seen.lock().iter().map(|e| e.state).collect();
        assert_eq!(states, vec![2, 0]);
    }

    #[test]
    fn test_uevent_env() {
        let event = SwitchUevent {
            name: "h2w".to_string(),
            state: 1,
        };
        assert_eq!(
            event.env(),
            ["SWITCH_NAME=h2w".to_string(), "SWITCH_STATE=1".to_string()]
        );
        assert_eq!(event.to_string(), "change SWITCH_NAME=h2w SWITCH_STATE=1");
    }
}
