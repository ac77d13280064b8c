//! The per-tick frame loop.
//!
//! Order within one tick is fixed: drain events, gate on the submission
//! flag, wait-frame, begin-frame, locate views, render into acquired
//! images, then submit the projection layer and the panel quad together in
//! a single end-frame call. When frames must not be submitted, neither
//! begin-frame nor end-frame is issued.

use glow::HasContext;
use openxr as xr;
use slate_core::{ShellError, ShellResult};
use tracing::warn;

use crate::actions::InputBindings;
use crate::context::{SessionObjects, XrShell};
use crate::events::{self, ShellListener};
use crate::panel::UiPanel;
use crate::render::EyeRenderer;
use crate::swapchain::{Swapchain, SwapchainSpec};
use crate::trackers::HandSide;

pub struct FrameLoop {
    gl: glow::Context,
    eye_swapchains: Vec<Swapchain>,
    renderer: EyeRenderer,
    panel: UiPanel,
    input: Option<InputBindings>,
}

impl FrameLoop {
    /// Create the per-eye swapchains at the runtime's recommended sizes and
    /// initialize the panel's GPU resources.
    pub fn new(shell: &XrShell, gl: glow::Context, mut panel: UiPanel) -> ShellResult<Self> {
        let views = shell.view_config().to_vec();
        if views.is_empty() {
            return Err(ShellError::Unavailable(
                "no view configuration; create the session first".to_string(),
            ));
        }

        let mut eye_swapchains = Vec::with_capacity(views.len());
        for view in &views {
            let spec = SwapchainSpec {
                width: view.recommended_image_rect_width,
                height: view.recommended_image_rect_height,
                format: glow::SRGB8_ALPHA8,
                sample_count: view.recommended_swapchain_sample_count,
            };
            eye_swapchains.push(Swapchain::create(shell, &gl, &spec)?);
        }

        panel.init(shell, &gl)?;
        let renderer = EyeRenderer::new(&gl)?;

        Ok(Self {
            gl,
            eye_swapchains,
            renderer,
            panel,
            input: None,
        })
    }

    pub fn panel(&self) -> &UiPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut UiPanel {
        &mut self.panel
    }

    /// Register controller bindings; best-effort, the loop runs without
    /// them.
    pub fn attach_input(&mut self, shell: &XrShell) {
        let Some(instance) = shell.instance() else {
            return;
        };
        let session = match shell.session_handle() {
            Ok(session) => session,
            Err(_) => return,
        };
        match InputBindings::new(instance, session) {
            Ok(input) => self.input = Some(input),
            Err(e) => warn!("controller bindings unavailable: {e}"),
        }
    }

    /// One application tick.
    pub fn tick(&mut self, shell: &mut XrShell, listener: &mut dyn ShellListener) -> ShellResult<()> {
        events::pump_events(shell, listener);

        if !shell.flags.submitting_frames {
            return Ok(());
        }

        let frame_state = shell.wait_frame()?;
        shell.begin_frame()?;

        if !frame_state.should_render {
            let so = shell.session.as_mut().ok_or_else(|| {
                ShellError::Unavailable("no active session".to_string())
            })?;
            return so
                .stream
                .end(
                    frame_state.predicted_display_time,
                    xr::EnvironmentBlendMode::OPAQUE,
                    &[],
                )
                .map_err(|e| ShellError::Runtime(format!("xrEndFrame: {e:?}")));
        }

        let views = shell.locate_frame_views()?;

        if let Some(input) = self.input.as_ref() {
            if let Ok(session) = shell.session_handle() {
                if let Err(e) = input.sync(session) {
                    warn!("action sync failed: {e}");
                }
            }
        }
        self.poll_hands(shell, listener, frame_state.predicted_display_time);

        for swapchain in self.eye_swapchains.iter_mut() {
            let width = swapchain.width() as i32;
            let height = swapchain.height() as i32;
            let image = swapchain.acquire_scoped()?;
            self.renderer.draw_eye(&self.gl, image.texture(), width, height);
        }

        let panel_frame = self.panel.frame(shell, &self.gl)?;
        let panel_swapchain = self.panel.swapchain().ok_or_else(|| {
            ShellError::Unavailable("panel swapchain not initialized".to_string())
        })?;

        let so = shell
            .session
            .as_mut()
            .ok_or_else(|| ShellError::Unavailable("no active session".to_string()))?;
        let SessionObjects { stream, spaces, .. } = so;
        let space = spaces.get(shell.play_space).ok_or_else(|| {
            ShellError::Unavailable(format!("play space {:?} not created", shell.play_space))
        })?;

        let mut projection_views = Vec::with_capacity(views.len());
        for (view, swapchain) in views.iter().zip(&self.eye_swapchains) {
            projection_views.push(
                xr::CompositionLayerProjectionView::new()
                    .pose(view.pose)
                    .fov(view.fov)
                    .sub_image(
                        xr::SwapchainSubImage::new()
                            .swapchain(swapchain.raw())
                            .image_rect(xr::Rect2Di {
                                offset: xr::Offset2Di { x: 0, y: 0 },
                                extent: swapchain.extent(),
                            })
                            .image_array_index(0),
                    ),
            );
        }

        let projection = xr::CompositionLayerProjection::new()
            .layer_flags(xr::CompositionLayerFlags::BLEND_TEXTURE_SOURCE_ALPHA)
            .space(space)
            .views(&projection_views);

        let quad = xr::CompositionLayerQuad::new()
            .layer_flags(
                xr::CompositionLayerFlags::BLEND_TEXTURE_SOURCE_ALPHA
                    | xr::CompositionLayerFlags::UNPREMULTIPLIED_ALPHA,
            )
            .space(space)
            .eye_visibility(xr::EyeVisibility::BOTH)
            .sub_image(
                xr::SwapchainSubImage::new()
                    .swapchain(panel_swapchain.raw())
                    .image_rect(xr::Rect2Di {
                        offset: xr::Offset2Di { x: 0, y: 0 },
                        extent: panel_swapchain.extent(),
                    })
                    .image_array_index(0),
            )
            .pose(panel_frame.pose)
            .size(panel_frame.size);

        let layers: [&xr::CompositionLayerBase<xr::OpenGL>; 2] = [&projection, &quad];
        stream
            .end(
                frame_state.predicted_display_time,
                xr::EnvironmentBlendMode::OPAQUE,
                &layers,
            )
            .map_err(|e| ShellError::Runtime(format!("xrEndFrame: {e:?}")))
    }

    /// Forward tracked palm poses to the listener.
    fn poll_hands(&self, shell: &XrShell, listener: &mut dyn ShellListener, time: xr::Time) {
        if !shell.caps.hand_tracking || !shell.trackers.hands.is_created() {
            return;
        }
        let Some(so) = shell.session.as_ref() else {
            return;
        };
        let Some(space) = so.spaces.get(shell.play_space) else {
            return;
        };
        for side in [HandSide::Left, HandSide::Right] {
            if let Some(pose) = shell.trackers.hands.palm_pose(side, space, time) {
                listener.on_hand_pose(side, pose, time);
            }
        }
    }

    /// Drop GPU resources in a known order before the session goes away.
    pub fn destroy(&mut self) {
        self.panel.destroy();
        self.eye_swapchains.clear();
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
        self.input = None;
    }
}
