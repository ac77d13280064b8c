//! The application object: init sequence, tick loop, lifecycle handling,
//! and teardown.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use glam::{Mat4, Vec3};
use openxr as xr;
use slate_core::{
    FixedPointPositioner, HostState, HudPositioner, LifecycleCommand, PanelPositioner, Pose,
    ShellResult, SlowTurnPositioner, SurfaceSource,
};
use slate_openxr::{
    CapabilitySet, FrameLoop, HandSide, Notice, ShellListener, UiPanel, XrShell,
};
use tracing::{debug, error, info, trace, warn};

use crate::config::{PlaySpace, PositionerConfig, ShellConfig};
use crate::glx::GlxSurface;
use crate::testcard::TestCardSource;

/// Records notices during the drain pass; the app reacts to them after the
/// tick returns.
#[derive(Default)]
struct NoticeRecorder {
    notices: Vec<Notice>,
    quit: bool,
}

impl ShellListener for NoticeRecorder {
    fn on_notice(&mut self, notice: Notice) {
        debug!(?notice, "session notice");
        if notice == Notice::Shutdown {
            self.quit = true;
        }
        self.notices.push(notice);
    }

    fn on_hand_pose(&mut self, side: HandSide, pose: Pose, _time: xr::Time) {
        trace!(?side, position = ?pose.position, "palm pose");
    }
}

pub struct App {
    // Keeps the GL context alive for the session's lifetime.
    _glx: GlxSurface,
    shell: XrShell,
    frame_loop: FrameLoop,
    listener: NoticeRecorder,
    host: HostState,
}

fn play_space(kind: PlaySpace) -> xr::ReferenceSpaceType {
    match kind {
        PlaySpace::Stage => xr::ReferenceSpaceType::STAGE,
        PlaySpace::Local => xr::ReferenceSpaceType::LOCAL,
    }
}

fn build_positioner(config: &PositionerConfig) -> Box<dyn PanelPositioner> {
    match config {
        PositionerConfig::Hud { forward_m } => Box::new(HudPositioner::new(
            Mat4::from_translation(Vec3::new(0.0, 0.0, -*forward_m)),
        )),
        PositionerConfig::SlowTurn { distance_m, tuning } => {
            Box::new(SlowTurnPositioner::new(*distance_m, *tuning))
        }
        PositionerConfig::FixedPoint { point } => {
            Box::new(FixedPointPositioner::new(Vec3::from(*point)))
        }
    }
}

impl App {
    pub fn init(config: &ShellConfig) -> ShellResult<Self> {
        let glx = unsafe { GlxSurface::create()? };
        let gl = glx.load_gl();

        let mut shell = XrShell::create_instance(&config.app, CapabilitySet::all())?;
        shell.create_session(&glx.binding())?;
        shell.set_play_space(play_space(config.play_space))?;

        if config.request_highest_refresh_rate && shell.caps.display_refresh_rate {
            if let Err(e) = shell.request_highest_refresh_rate() {
                warn!("could not raise refresh rate: {e}");
            }
        }
        if shell.caps.color_space {
            match shell.enumerate_color_spaces() {
                Ok(spaces) => debug!(?spaces, "compositor color spaces"),
                Err(e) => warn!("could not enumerate color spaces: {e}"),
            }
        }
        match shell.play_area_bounds() {
            Ok(Some(bounds)) => info!(
                width_m = bounds.width,
                depth_m = bounds.height,
                "play area bounds"
            ),
            Ok(None) => debug!("runtime reports no play area bounds"),
            Err(e) => debug!("play area bounds unavailable: {e}"),
        }

        let surface: Arc<dyn SurfaceSource> = Arc::new(TestCardSource::new(
            config.panel.texture_width,
            config.panel.texture_height,
        ));
        let panel = UiPanel::new(
            config.panel,
            surface,
            build_positioner(&config.positioner),
        );

        let mut frame_loop = FrameLoop::new(&shell, gl, panel)?;
        if config.enable_controllers {
            frame_loop.attach_input(&shell);
        }

        let mut host = HostState::default();
        host.apply(LifecycleCommand::Start);
        host.apply(LifecycleCommand::WindowCreated);
        host.apply(LifecycleCommand::Resume);

        info!("application initialized");
        Ok(Self {
            _glx: glx,
            shell,
            frame_loop,
            listener: NoticeRecorder::default(),
            host,
        })
    }

    /// Apply a host lifecycle command to the running/window projections.
    pub fn handle_lifecycle(&mut self, command: LifecycleCommand) {
        self.host.apply(command);
    }

    /// Tick until the runtime asks us to exit or the host tears us down.
    pub fn run(&mut self) -> ShellResult<()> {
        info!("entering frame loop");
        while !self.listener.quit && !self.host.destroy_requested {
            if !self.host.running {
                thread::sleep(Duration::from_millis(5));
                continue;
            }

            if let Err(e) = self.frame_loop.tick(&mut self.shell, &mut self.listener) {
                // Transient per-frame failures keep the loop alive; the
                // state machine decides when to stop for real.
                error!("tick failed: {e}");
            }
            self.react_to_notices();

            if !self.shell.flags.submitting_frames {
                thread::sleep(Duration::from_millis(5));
            }
        }
        Ok(())
    }

    fn react_to_notices(&mut self) {
        for notice in std::mem::take(&mut self.listener.notices) {
            match notice {
                Notice::Focused => self.frame_loop.panel().focused(),
                Notice::Visible | Notice::Stopping => self.frame_loop.panel().unfocused(),
                Notice::Ready | Notice::Shutdown => {}
                Notice::ReferenceSpaceChanging { space, pose_valid } => {
                    info!(?space, pose_valid, "play area recentering");
                }
                Notice::InteractionProfileChanged => {
                    info!("controllers changed");
                }
            }
        }
    }

    /// Wind the session down and release everything. Idempotent.
    pub fn shutdown(&mut self) {
        self.handle_lifecycle(LifecycleCommand::Pause);
        self.handle_lifecycle(LifecycleCommand::Stop);

        if let Err(e) = self.shell.request_exit() {
            debug!("exit request not delivered: {e}");
        }

        self.frame_loop.destroy();
        self.shell.teardown();
        self.handle_lifecycle(LifecycleCommand::Destroy);
        info!("application shut down");
    }
}
