//! The event pump: drains the runtime event queue and drives the session
//! state machine.
//!
//! Notices fire synchronously during the drain pass, in event arrival
//! order. A failed runtime call inside one handler aborts that handler
//! only; the pump itself never returns an error. Fatal conditions surface
//! through the same [`Notice::Shutdown`] channel the runtime uses.

use openxr as xr;
use slate_core::Pose;
use tracing::{error, info, warn};

use crate::context::XrShell;
use crate::state::{self, StateAction};
use crate::trackers::HandSide;

/// Higher-level notifications raised while draining runtime events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notice {
    Ready,
    Visible,
    Focused,
    Stopping,
    Shutdown,
    ReferenceSpaceChanging {
        space: xr::ReferenceSpaceType,
        pose_valid: bool,
    },
    InteractionProfileChanged,
}

/// Subscriber for [`Notice`] events and per-frame tracking data.
pub trait ShellListener {
    fn on_notice(&mut self, notice: Notice);

    /// A tracked palm pose for this frame. Default: ignored.
    fn on_hand_pose(&mut self, side: HandSide, pose: Pose, time: xr::Time) {
        let _ = (side, pose, time);
    }
}

/// Drain the runtime event queue until empty.
pub fn pump_events(shell: &mut XrShell, listener: &mut dyn ShellListener) {
    let Some(instance) = shell.instance().cloned() else {
        return;
    };
    let mut buffer = xr::EventDataBuffer::new();

    loop {
        let event = match instance.poll_event(&mut buffer) {
            Ok(event) => event,
            Err(e) => {
                error!("xrPollEvent: {e:?}");
                listener.on_notice(Notice::Shutdown);
                return;
            }
        };
        let Some(event) = event else {
            return;
        };

        match event {
            xr::Event::EventsLost(e) => {
                error!("{} events lost before this event in queue", e.lost_event_count());
            }
            xr::Event::SessionStateChanged(e) => {
                handle_session_state(shell, listener, e.state());
            }
            xr::Event::InstanceLossPending(_) => {
                warn!("instance loss pending");
                shell.flags.submitting_frames = false;
                listener.on_notice(Notice::Shutdown);
            }
            xr::Event::ReferenceSpaceChangePending(e) => {
                info!("reference space change pending");
                listener.on_notice(Notice::ReferenceSpaceChanging {
                    space: e.reference_space_type(),
                    pose_valid: e.pose_valid(),
                });
            }
            xr::Event::InteractionProfileChanged(_) => {
                info!("interaction profile changed");
                listener.on_notice(Notice::InteractionProfileChanged);
            }
            _ => {
                warn!("unhandled OpenXR event");
            }
        }
    }
}

fn handle_session_state(
    shell: &mut XrShell,
    listener: &mut dyn ShellListener,
    next: xr::SessionState,
) {
    for action in state::transition(&mut shell.flags, next) {
        match action {
            StateAction::BeginSession => {
                if let Err(e) = shell.begin_session() {
                    error!("xrBeginSession: {e}");
                    return;
                }
            }
            StateAction::EndSession => {
                if let Err(e) = shell.end_session() {
                    error!("xrEndSession: {e}");
                    return;
                }
            }
            StateAction::DestroySession => {
                shell.destroy_session();
            }
            StateAction::Notify(notice) => {
                listener.on_notice(notice);
            }
        }
    }
}
