//! Host lifecycle commands and the boolean projections the core consumes.
//!
//! The host process delivers discrete lifecycle commands (window state,
//! pause/resume, teardown). The XR core only cares about two projections:
//! whether the app is running and whether a window is live.

use tracing::{debug, info, warn};

/// Discrete lifecycle commands delivered by the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Start,
    Resume,
    Pause,
    Stop,
    WindowCreated,
    WindowDestroyed,
    InputQueueChanged,
    ConfigChanged,
    LowMemory,
    Destroy,
}

/// Boolean projections of the host lifecycle stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostState {
    /// The app is in the foreground and should tick.
    pub running: bool,
    /// A native window exists for session setup.
    pub window_live: bool,
    /// The host asked for final teardown.
    pub destroy_requested: bool,
}

impl HostState {
    pub fn apply(&mut self, command: LifecycleCommand) {
        match command {
            LifecycleCommand::Start => {
                info!("host: start");
            }
            LifecycleCommand::Resume => {
                info!("host: resume");
                self.running = true;
            }
            LifecycleCommand::Pause => {
                info!("host: pause");
                self.running = false;
            }
            LifecycleCommand::Stop => {
                info!("host: stop");
            }
            LifecycleCommand::WindowCreated => {
                info!("host: window created");
                self.window_live = true;
            }
            LifecycleCommand::WindowDestroyed => {
                info!("host: window destroyed");
                self.window_live = false;
            }
            LifecycleCommand::Destroy => {
                info!("host: destroy requested");
                self.window_live = false;
                self.destroy_requested = true;
            }
            LifecycleCommand::InputQueueChanged | LifecycleCommand::ConfigChanged => {
                debug!(?command, "host: no-op command");
            }
            LifecycleCommand::LowMemory => {
                warn!("host: low memory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_pause_toggles_running() {
        let mut state = HostState::default();
        state.apply(LifecycleCommand::Resume);
        assert!(state.running);
        state.apply(LifecycleCommand::Pause);
        assert!(!state.running);
    }

    #[test]
    fn window_commands_toggle_window_live() {
        let mut state = HostState::default();
        state.apply(LifecycleCommand::WindowCreated);
        assert!(state.window_live);
        state.apply(LifecycleCommand::WindowDestroyed);
        assert!(!state.window_live);
    }

    #[test]
    fn destroy_drops_window_and_requests_teardown() {
        let mut state = HostState::default();
        state.apply(LifecycleCommand::WindowCreated);
        state.apply(LifecycleCommand::Resume);
        state.apply(LifecycleCommand::Destroy);
        assert!(!state.window_live);
        assert!(state.destroy_requested);
        // Running is governed by pause/resume only.
        assert!(state.running);
    }

    #[test]
    fn informational_commands_change_nothing() {
        let mut state = HostState {
            running: true,
            window_live: true,
            destroy_requested: false,
        };
        let before = state;
        state.apply(LifecycleCommand::Start);
        state.apply(LifecycleCommand::Stop);
        state.apply(LifecycleCommand::InputQueueChanged);
        state.apply(LifecycleCommand::ConfigChanged);
        state.apply(LifecycleCommand::LowMemory);
        assert_eq!(state, before);
    }
}
