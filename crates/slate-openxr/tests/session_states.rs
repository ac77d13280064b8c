//! Session state machine properties over full event sequences.

use openxr as xr;
use slate_openxr::events::Notice;
use slate_openxr::state::{transition, SessionFlags, StateAction};

fn run(sequence: &[xr::SessionState]) -> (SessionFlags, Vec<StateAction>) {
    let mut flags = SessionFlags::default();
    let mut actions = Vec::new();
    for &state in sequence {
        actions.extend(transition(&mut flags, state));
    }
    (flags, actions)
}

#[test]
fn full_startup_sequence_submits_frames() {
    let (flags, actions) = run(&[
        xr::SessionState::IDLE,
        xr::SessionState::READY,
        xr::SessionState::SYNCHRONIZED,
        xr::SessionState::VISIBLE,
        xr::SessionState::FOCUSED,
    ]);

    assert!(flags.submitting_frames);
    assert!(flags.session_running);
    assert!(flags.session_focused);

    let begins = actions
        .iter()
        .filter(|a| **a == StateAction::BeginSession)
        .count();
    assert_eq!(begins, 1);
}

#[test]
fn notifications_fire_in_arrival_order() {
    let (_, actions) = run(&[
        xr::SessionState::READY,
        xr::SessionState::VISIBLE,
        xr::SessionState::FOCUSED,
    ]);

    let notices: Vec<Notice> = actions
        .iter()
        .filter_map(|a| match a {
            StateAction::Notify(n) => Some(*n),
            _ => None,
        })
        .collect();
    assert_eq!(notices, vec![Notice::Ready, Notice::Visible, Notice::Focused]);
}

#[test]
fn stopping_while_running_ends_exactly_once_and_halts_submission() {
    let (flags, actions) = run(&[
        xr::SessionState::READY,
        xr::SessionState::FOCUSED,
        xr::SessionState::STOPPING,
    ]);

    let ends = actions
        .iter()
        .filter(|a| **a == StateAction::EndSession)
        .count();
    assert_eq!(ends, 1);
    assert!(!flags.submitting_frames);
    // The next tick must not begin a frame.
    assert!(!flags.session_running);
}

#[test]
fn shutdown_sequence_never_resumes_submission() {
    let (flags, _) = run(&[
        xr::SessionState::READY,
        xr::SessionState::FOCUSED,
        xr::SessionState::STOPPING,
        xr::SessionState::IDLE,
        xr::SessionState::EXITING,
    ]);

    assert!(!flags.submitting_frames);
}

#[test]
fn submitting_matches_most_recent_state_over_random_walks() {
    // A deterministic pseudo-random walk over all states; the flag must
    // always reflect the most recent state's class.
    let states = [
        xr::SessionState::IDLE,
        xr::SessionState::READY,
        xr::SessionState::SYNCHRONIZED,
        xr::SessionState::VISIBLE,
        xr::SessionState::FOCUSED,
        xr::SessionState::STOPPING,
        xr::SessionState::LOSS_PENDING,
        xr::SessionState::EXITING,
    ];

    let mut flags = SessionFlags::default();
    let mut seed = 0x2545F491u32;
    let mut expected = false;
    for _ in 0..500 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let state = states[(seed as usize) % states.len()];
        transition(&mut flags, state);

        expected = match state {
            xr::SessionState::READY
            | xr::SessionState::SYNCHRONIZED
            | xr::SessionState::VISIBLE
            | xr::SessionState::FOCUSED => true,
            xr::SessionState::STOPPING
            | xr::SessionState::LOSS_PENDING
            | xr::SessionState::EXITING => false,
            // IDLE leaves the flag as-is.
            _ => expected,
        };
        assert_eq!(flags.submitting_frames, expected, "after {state:?}");
    }
}
