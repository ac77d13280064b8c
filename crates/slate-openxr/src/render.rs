//! Minimal GL helpers for rendering into swapchain images.

use glow::HasContext;
use slate_core::{ShellError, ShellResult};

/// Reinterpret a raw GL texture name as a glow texture handle.
pub(crate) fn gl_texture(raw: u32) -> Option<glow::NativeTexture> {
    unsafe { std::mem::transmute::<u32, Option<glow::NativeTexture>>(raw) }
}

/// Renders scene content into an eye's swapchain image through a reusable
/// framebuffer.
pub struct EyeRenderer {
    framebuffer: glow::NativeFramebuffer,
    clear_color: [f32; 4],
}

impl EyeRenderer {
    pub fn new(gl: &glow::Context) -> ShellResult<Self> {
        let framebuffer = unsafe { gl.create_framebuffer() }
            .map_err(|e| ShellError::Graphics(format!("glGenFramebuffers: {e}")))?;
        Ok(Self {
            framebuffer,
            clear_color: [0.5, 0.5, 0.5, 1.0],
        })
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    /// Bind the swapchain image as the render target and draw the scene
    /// content for this eye.
    pub fn draw_eye(&self, gl: &glow::Context, texture: u32, width: i32, height: i32) {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.framebuffer));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                gl_texture(texture),
                0,
            );
            gl.viewport(0, 0, width, height);
            gl.clear_color(
                self.clear_color[0],
                self.clear_color[1],
                self.clear_color[2],
                self.clear_color[3],
            );
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }
}
