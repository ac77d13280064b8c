//! The session state transition table.
//!
//! Kept free of runtime handles so the full table is exercised by tests:
//! [`transition`] updates the flags and returns the runtime actions the
//! event pump must perform, in order.

use openxr as xr;
use tracing::{info, warn};

use crate::events::Notice;

/// Session flags the frame loop and event pump share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionFlags {
    /// Frames may be submitted this tick. Gates wait/begin/end-frame.
    pub submitting_frames: bool,
    /// `xrBeginSession` has been issued without a matching end.
    pub session_running: bool,
    /// The session currently has input focus.
    pub session_focused: bool,
    /// Most recent state reported by the runtime.
    pub state: xr::SessionState,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            submitting_frames: false,
            session_running: false,
            session_focused: false,
            state: xr::SessionState::UNKNOWN,
        }
    }
}

/// Runtime side effects of a state transition, to be executed in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateAction {
    BeginSession,
    EndSession,
    DestroySession,
    Notify(Notice),
}

/// Apply a session-state-changed event to the flags.
pub fn transition(flags: &mut SessionFlags, next: xr::SessionState) -> Vec<StateAction> {
    flags.state = next;
    let mut actions = Vec::new();

    match next {
        xr::SessionState::IDLE => {
            info!("session state: idle");
        }
        xr::SessionState::READY => {
            info!("session state: ready");
            actions.push(StateAction::BeginSession);
            flags.session_running = true;
            flags.submitting_frames = true;
            actions.push(StateAction::Notify(Notice::Ready));
        }
        xr::SessionState::SYNCHRONIZED => {
            info!("session state: synchronized");
            flags.submitting_frames = true;
        }
        xr::SessionState::VISIBLE => {
            info!("session state: visible");
            flags.submitting_frames = true;
            flags.session_focused = false;
            actions.push(StateAction::Notify(Notice::Visible));
        }
        xr::SessionState::FOCUSED => {
            info!("session state: focused");
            flags.submitting_frames = true;
            flags.session_focused = true;
            actions.push(StateAction::Notify(Notice::Focused));
        }
        xr::SessionState::STOPPING => {
            info!("session state: stopping");
            if flags.session_running {
                actions.push(StateAction::EndSession);
                flags.session_running = false;
            }
            actions.push(StateAction::Notify(Notice::Stopping));
            flags.submitting_frames = false;
        }
        xr::SessionState::LOSS_PENDING => {
            info!("session state: loss pending");
            actions.push(StateAction::DestroySession);
            flags.submitting_frames = false;
        }
        xr::SessionState::EXITING => {
            info!("session state: exiting");
            actions.push(StateAction::Notify(Notice::Shutdown));
            flags.submitting_frames = false;
        }
        other => {
            warn!("unhandled session state: {other:?}");
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count<F: Fn(&StateAction) -> bool>(actions: &[StateAction], f: F) -> usize {
        actions.iter().filter(|a| f(a)).count()
    }

    #[test]
    fn ready_begins_session_and_notifies() {
        let mut flags = SessionFlags::default();
        let actions = transition(&mut flags, xr::SessionState::READY);
        assert_eq!(
            actions,
            vec![
                StateAction::BeginSession,
                StateAction::Notify(Notice::Ready)
            ]
        );
        assert!(flags.submitting_frames);
        assert!(flags.session_running);
    }

    #[test]
    fn synchronized_submits_without_notifying() {
        let mut flags = SessionFlags::default();
        let actions = transition(&mut flags, xr::SessionState::SYNCHRONIZED);
        assert!(actions.is_empty());
        assert!(flags.submitting_frames);
    }

    #[test]
    fn visible_clears_focus_and_focused_sets_it() {
        let mut flags = SessionFlags::default();
        transition(&mut flags, xr::SessionState::FOCUSED);
        assert!(flags.session_focused);
        transition(&mut flags, xr::SessionState::VISIBLE);
        assert!(!flags.session_focused);
        assert!(flags.submitting_frames);
    }

    #[test]
    fn stopping_while_running_ends_session_exactly_once() {
        let mut flags = SessionFlags::default();
        transition(&mut flags, xr::SessionState::READY);

        let actions = transition(&mut flags, xr::SessionState::STOPPING);
        assert_eq!(
            count(&actions, |a| *a == StateAction::EndSession),
            1
        );
        assert!(!flags.submitting_frames);
        assert!(!flags.session_running);

        // A second stop has no session left to end.
        let actions = transition(&mut flags, xr::SessionState::STOPPING);
        assert_eq!(count(&actions, |a| *a == StateAction::EndSession), 0);
    }

    #[test]
    fn stopping_while_not_running_only_notifies() {
        let mut flags = SessionFlags::default();
        let actions = transition(&mut flags, xr::SessionState::STOPPING);
        assert_eq!(actions, vec![StateAction::Notify(Notice::Stopping)]);
    }

    #[test]
    fn loss_pending_destroys_session() {
        let mut flags = SessionFlags::default();
        transition(&mut flags, xr::SessionState::READY);
        let actions = transition(&mut flags, xr::SessionState::LOSS_PENDING);
        assert_eq!(actions, vec![StateAction::DestroySession]);
        assert!(!flags.submitting_frames);
    }

    #[test]
    fn exiting_notifies_shutdown() {
        let mut flags = SessionFlags::default();
        transition(&mut flags, xr::SessionState::READY);
        let actions = transition(&mut flags, xr::SessionState::EXITING);
        assert_eq!(actions, vec![StateAction::Notify(Notice::Shutdown)]);
        assert!(!flags.submitting_frames);
    }

    #[test]
    fn idle_changes_nothing() {
        let mut flags = SessionFlags::default();
        transition(&mut flags, xr::SessionState::READY);
        let before = SessionFlags {
            state: xr::SessionState::IDLE,
            ..flags
        };
        let actions = transition(&mut flags, xr::SessionState::IDLE);
        assert!(actions.is_empty());
        assert_eq!(flags, before);
    }

    /// Submitting is true iff the most recent state is one of
    /// READY/SYNCHRONIZED/VISIBLE/FOCUSED with no later stop/exit.
    #[test]
    fn submitting_tracks_most_recent_state() {
        let submit_states = [
            xr::SessionState::READY,
            xr::SessionState::SYNCHRONIZED,
            xr::SessionState::VISIBLE,
            xr::SessionState::FOCUSED,
        ];
        let halt_states = [
            xr::SessionState::STOPPING,
            xr::SessionState::LOSS_PENDING,
            xr::SessionState::EXITING,
        ];

        for submit in submit_states {
            for halt in halt_states {
                let mut flags = SessionFlags::default();
                transition(&mut flags, submit);
                assert!(flags.submitting_frames, "{submit:?} should submit");
                transition(&mut flags, halt);
                assert!(!flags.submitting_frames, "{halt:?} should stop submitting");
                transition(&mut flags, xr::SessionState::FOCUSED);
                assert!(flags.submitting_frames, "recovery after {halt:?}");
            }
        }
    }
}
