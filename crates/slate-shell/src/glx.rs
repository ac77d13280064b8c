//! Headless GLX context bring-up for the OpenXR graphics binding.
//!
//! The runtime compositor owns the display; the shell only needs a current
//! GL context, so the backing window is a tiny unmapped-for-output 16x16
//! surface.

use std::ffi::CString;
use std::ptr;

use slate_core::{ShellError, ShellResult};
use slate_openxr::GlBinding;
use tracing::info;
use x11::{glx, xlib};

pub struct GlxSurface {
    display: *mut xlib::Display,
    fb_config: glx::GLXFBConfig,
    visualid: u64,
    window: xlib::Window,
    context: glx::GLXContext,
}

impl GlxSurface {
    /// Open the display, pick an RGBA8 framebuffer config, and make a
    /// fresh GL context current on a small hidden window.
    ///
    /// # Safety
    /// Must be called on the thread that will own the GL context for the
    /// session's lifetime.
    pub unsafe fn create() -> ShellResult<Self> {
        let display = xlib::XOpenDisplay(ptr::null());
        if display.is_null() {
            return Err(ShellError::Graphics("XOpenDisplay failed".to_string()));
        }

        let screen = xlib::XDefaultScreen(display);
        let attrs = [
            glx::GLX_X_RENDERABLE,
            1,
            glx::GLX_DRAWABLE_TYPE,
            glx::GLX_WINDOW_BIT,
            glx::GLX_RENDER_TYPE,
            glx::GLX_RGBA_BIT,
            glx::GLX_X_VISUAL_TYPE,
            glx::GLX_TRUE_COLOR,
            glx::GLX_RED_SIZE,
            8,
            glx::GLX_GREEN_SIZE,
            8,
            glx::GLX_BLUE_SIZE,
            8,
            glx::GLX_ALPHA_SIZE,
            8,
            glx::GLX_DEPTH_SIZE,
            24,
            glx::GLX_DOUBLEBUFFER,
            1,
            0,
        ];

        let mut config_count = 0;
        let configs = glx::glXChooseFBConfig(display, screen, attrs.as_ptr(), &mut config_count);
        if configs.is_null() || config_count == 0 {
            xlib::XCloseDisplay(display);
            return Err(ShellError::Graphics("glXChooseFBConfig failed".to_string()));
        }
        let fb_config = *configs;

        let visual_info = glx::glXGetVisualFromFBConfig(display, fb_config);
        if visual_info.is_null() {
            xlib::XFree(configs as *mut _);
            xlib::XCloseDisplay(display);
            return Err(ShellError::Graphics(
                "glXGetVisualFromFBConfig failed".to_string(),
            ));
        }
        let visualid = (*visual_info).visualid;

        let root = xlib::XDefaultRootWindow(display);
        let colormap = xlib::XCreateColormap(display, root, (*visual_info).visual, xlib::AllocNone);

        let mut window_attrs: xlib::XSetWindowAttributes = std::mem::zeroed();
        window_attrs.colormap = colormap;
        window_attrs.event_mask = 0;
        let window = xlib::XCreateWindow(
            display,
            root,
            0,
            0,
            16,
            16,
            0,
            (*visual_info).depth,
            xlib::InputOutput as u32,
            (*visual_info).visual,
            xlib::CWColormap,
            &mut window_attrs,
        );
        let title = CString::new("slate").unwrap_or_default();
        xlib::XStoreName(display, window, title.as_ptr());
        xlib::XMapWindow(display, window);

        let context =
            glx::glXCreateNewContext(display, fb_config, glx::GLX_RGBA_TYPE, ptr::null_mut(), 1);
        if context.is_null() {
            xlib::XFree(visual_info as *mut _);
            xlib::XFree(configs as *mut _);
            xlib::XCloseDisplay(display);
            return Err(ShellError::Graphics("glXCreateNewContext failed".to_string()));
        }

        if glx::glXMakeCurrent(display, window, context) == 0 {
            glx::glXDestroyContext(display, context);
            xlib::XFree(visual_info as *mut _);
            xlib::XFree(configs as *mut _);
            xlib::XCloseDisplay(display);
            return Err(ShellError::Graphics("glXMakeCurrent failed".to_string()));
        }

        xlib::XFree(visual_info as *mut _);
        xlib::XFree(configs as *mut _);

        info!("GLX context current");
        Ok(Self {
            display,
            fb_config,
            visualid,
            window,
            context,
        })
    }

    /// The binding handed to session creation.
    pub fn binding(&self) -> GlBinding {
        GlBinding {
            x_display: self.display as *mut _,
            visualid: self.visualid as u32,
            glx_fb_config: self.fb_config as *mut _,
            glx_drawable: self.window,
            glx_context: self.context as *mut _,
        }
    }

    /// Load GL entry points through GLX.
    pub fn load_gl(&self) -> glow::Context {
        unsafe {
            glow::Context::from_loader_function(|name| {
                let name = CString::new(name).unwrap_or_default();
                match glx::glXGetProcAddress(name.as_ptr() as *const u8) {
                    Some(proc) => proc as *const std::ffi::c_void,
                    None => ptr::null(),
                }
            })
        }
    }
}

impl Drop for GlxSurface {
    fn drop(&mut self) {
        unsafe {
            glx::glXMakeCurrent(self.display, 0, ptr::null_mut());
            glx::glXDestroyContext(self.display, self.context);
            xlib::XDestroyWindow(self.display, self.window);
            xlib::XCloseDisplay(self.display);
        }
    }
}
