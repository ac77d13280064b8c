//! The UI panel compositor: a positioned quad in the 3D scene backed by an
//! external pixel-content source.
//!
//! Each frame the panel rate-limits content redraws, derives its world
//! pose from the head through the configured positioning strategy, uploads
//! the source's current pixels into its swapchain image, and hands the
//! frame loop a quad descriptor for the layer list.

use std::sync::Arc;
use std::time::Instant;

use glow::HasContext;
use openxr as xr;
use slate_core::{PanelConfig, PanelPositioner, ShellError, ShellResult, SurfaceSource};
use tracing::info;

use crate::context::XrShell;
use crate::math;
use crate::render::gl_texture;
use crate::swapchain::{Swapchain, SwapchainSpec};

/// Per-frame quad descriptor handed to the frame loop.
#[derive(Debug, Clone, Copy)]
pub struct PanelFrame {
    pub pose: xr::Posef,
    pub size: xr::Extent2Df,
}

pub struct UiPanel {
    config: PanelConfig,
    surface: Arc<dyn SurfaceSource>,
    positioner: Box<dyn PanelPositioner>,
    swapchain: Option<Swapchain>,
    frame_interval_us: u64,
    last_render_us: u64,
    epoch: Instant,
    last_update: Instant,
}

impl UiPanel {
    pub fn new(
        config: PanelConfig,
        surface: Arc<dyn SurfaceSource>,
        positioner: Box<dyn PanelPositioner>,
    ) -> Self {
        let frame_interval_us = config.frame_interval_us();
        info!(
            refresh_hz = config.refresh_rate_hz,
            frame_interval_us, "creating UI panel"
        );
        let now = Instant::now();
        Self {
            config,
            surface,
            positioner,
            swapchain: None,
            frame_interval_us,
            last_render_us: 0,
            epoch: now,
            last_update: now,
        }
    }

    /// Create the panel swapchain at the configured texture resolution.
    pub fn init(&mut self, shell: &XrShell, gl: &glow::Context) -> ShellResult<()> {
        info!("initializing UI panel swapchain");

        let sample_count = shell
            .view_config()
            .first()
            .map(|v| v.recommended_swapchain_sample_count)
            .unwrap_or(1);
        let spec = SwapchainSpec {
            width: self.config.texture_width,
            height: self.config.texture_height,
            format: glow::SRGB8_ALPHA8,
            sample_count,
        };
        self.swapchain = Some(Swapchain::create(shell, gl, &spec)?);
        Ok(())
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn swapchain(&self) -> Option<&Swapchain> {
        self.swapchain.as_ref()
    }

    /// The session gained focus: wake the content source.
    pub fn focused(&self) {
        info!("panel focused");
        self.surface.request_resume();
    }

    /// The session lost focus: let the content source idle.
    pub fn unfocused(&self) {
        info!("panel unfocused");
        self.surface.request_pause();
    }

    /// Produce this frame's quad descriptor and upload the current content
    /// pixels into the panel swapchain.
    pub fn frame(&mut self, shell: &XrShell, gl: &glow::Context) -> ShellResult<PanelFrame> {
        let now_us = self.epoch.elapsed().as_micros() as u64;
        if redraw_due(now_us, self.last_render_us, self.frame_interval_us) {
            self.surface.request_redraw();
            self.last_render_us = now_us;
        }

        let time = shell.predicted_display_time()?;
        let head_location = shell.locate_in_play_space(xr::ReferenceSpaceType::VIEW, time)?;
        let head = math::pose_to_mat4(&head_location.pose);

        let dt = self.last_update.elapsed();
        self.last_update = Instant::now();
        let world = self.positioner.locate(&head, dt);

        let mut pose = math::mat4_to_pose(&world);
        pose.orientation = math::yaw_flip(pose.orientation);

        let swapchain = self
            .swapchain
            .as_mut()
            .ok_or_else(|| ShellError::Unavailable("panel swapchain not initialized".to_string()))?;
        {
            let image = swapchain.acquire_scoped()?;
            let width = self.config.texture_width;
            let height = self.config.texture_height;
            self.surface.with_pixels(&mut |pixels| {
                upload_rgba(gl, image.texture(), width, height, pixels);
            });
        }

        Ok(PanelFrame {
            pose,
            size: quad_extent(&self.config),
        })
    }

    /// Release the panel's GPU resources and its content-source reference.
    pub fn destroy(&mut self) {
        info!("destroying UI panel");
        self.swapchain = None;
    }
}

/// Physical quad size submitted to the compositor. Height is negated:
/// panel content rows run top-down while the quad's Y axis runs up.
pub fn quad_extent(config: &PanelConfig) -> xr::Extent2Df {
    xr::Extent2Df {
        width: config.width_meters,
        height: -config.height_meters,
    }
}

/// Whether enough time has passed since the last redraw request.
pub(crate) fn redraw_due(now_us: u64, last_us: u64, interval_us: u64) -> bool {
    now_us.saturating_sub(last_us) > interval_us
}

/// Bit-exact copy of the source's RGBA buffer into the swapchain texture.
fn upload_rgba(gl: &glow::Context, texture: u32, width: u32, height: u32, pixels: &[u8]) {
    let expected = (width * height * 4) as usize;
    if pixels.len() < expected {
        return;
    }
    unsafe {
        gl.bind_texture(glow::TEXTURE_2D, gl_texture(texture));
        gl.tex_sub_image_2d(
            glow::TEXTURE_2D,
            0,
            0,
            0,
            width as i32,
            height as i32,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            glow::PixelUnpackData::Slice(pixels),
        );
        gl.bind_texture(glow::TEXTURE_2D, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_height_is_negated() {
        let config = PanelConfig {
            width_meters: 1.6,
            height_meters: 1.0,
            ..Default::default()
        };
        let extent = quad_extent(&config);
        assert_eq!(extent.width, 1.6);
        assert_eq!(extent.height, -1.0);
    }

    #[test]
    fn redraw_rate_limits_to_interval() {
        let interval = 8_333u64;
        assert!(redraw_due(10_000, 0, interval));
        assert!(!redraw_due(10_000, 5_000, interval));
        assert!(redraw_due(15_000, 5_000, interval));
        // Exactly the interval is not yet due.
        assert!(!redraw_due(interval, 0, interval));
    }
}
