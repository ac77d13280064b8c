//! OpenXR core of the slate panel shell.
//!
//! Owns the runtime session lifecycle (instance, session, reference spaces,
//! trackers), the event pump and session state machine, GPU swapchains with
//! scoped acquisition, the per-tick frame loop, and the UI panel compositor.
//!
//! Everything here runs on a single render/XR thread; the panel's content
//! producer is the only other thread and communicates exclusively through
//! the lock-protected surface contract in `slate-core`.

pub mod actions;
pub mod caps;
pub mod context;
pub mod events;
pub mod frame;
pub mod math;
pub mod panel;
pub mod render;
pub mod state;
pub mod swapchain;
pub mod trackers;

pub use actions::InputBindings;
pub use caps::CapabilitySet;
pub use context::{GlBinding, XrShell};
pub use events::{Notice, ShellListener};
pub use frame::FrameLoop;
pub use panel::{PanelFrame, UiPanel};
pub use state::{SessionFlags, StateAction};
pub use swapchain::{ScopedImage, Swapchain, SwapchainSpec};
pub use trackers::{HandSide, HandTrackers, Trackers};
