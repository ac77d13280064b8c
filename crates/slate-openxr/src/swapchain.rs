//! GPU-backed swapchains with scoped image acquisition.
//!
//! Acquire and wait are one blocking operation; release happens exactly
//! once when the returned guard goes out of scope, on every exit path.
//! Callers must serialize acquisitions on a given swapchain — the guard
//! borrows the swapchain mutably, so the borrow checker enforces that at
//! compile time.

use glow::HasContext;
use openxr as xr;
use slate_core::{ShellError, ShellResult};
use tracing::{info, warn};

use crate::context::XrShell;
use crate::render::gl_texture;

/// Parameters for swapchain creation. The format must be supported by the
/// runtime exactly; there is no fallback.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainSpec {
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub sample_count: u32,
}

/// A runtime swapchain plus its fixed chain of GL texture images.
pub struct Swapchain {
    inner: xr::Swapchain<xr::OpenGL>,
    images: Vec<u32>,
    width: u32,
    height: u32,
    format: u32,
}

impl Swapchain {
    pub fn create(shell: &XrShell, gl: &glow::Context, spec: &SwapchainSpec) -> ShellResult<Self> {
        let session = shell.session_handle()?;

        let formats = session
            .enumerate_swapchain_formats()
            .map_err(|e| ShellError::Runtime(format!("xrEnumerateSwapchainFormats: {e:?}")))?;
        if !formats.contains(&spec.format) {
            return Err(ShellError::Graphics(format!(
                "swapchain format {:#06x} not supported by runtime (available: {formats:?})",
                spec.format
            )));
        }

        let create_info = xr::SwapchainCreateInfo {
            create_flags: xr::SwapchainCreateFlags::EMPTY,
            usage_flags: xr::SwapchainUsageFlags::COLOR_ATTACHMENT
                | xr::SwapchainUsageFlags::SAMPLED,
            format: spec.format,
            sample_count: spec.sample_count,
            width: spec.width,
            height: spec.height,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
        };
        let inner = session
            .create_swapchain(&create_info)
            .map_err(|e| ShellError::Runtime(format!("xrCreateSwapchain: {e:?}")))?;
        let images = inner
            .enumerate_images()
            .map_err(|e| ShellError::Runtime(format!("xrEnumerateSwapchainImages: {e:?}")))?;

        info!(
            width = spec.width,
            height = spec.height,
            images = images.len(),
            "created swapchain"
        );

        let swapchain = Self {
            inner,
            images,
            width: spec.width,
            height: spec.height,
            format: spec.format,
        };
        swapchain.apply_default_sampler(gl);
        Ok(swapchain)
    }

    /// Set linear filtering and edge clamping on every image in the chain.
    ///
    /// Best-effort: a GL error leaves the runtime's default sampler in
    /// place with a warning.
    fn apply_default_sampler(&self, gl: &glow::Context) {
        unsafe {
            for &texture in &self.images {
                gl.bind_texture(glow::TEXTURE_2D, gl_texture(texture));
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MIN_FILTER,
                    glow::LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MAG_FILTER,
                    glow::LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_S,
                    glow::CLAMP_TO_EDGE as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_T,
                    glow::CLAMP_TO_EDGE as i32,
                );
            }
            gl.bind_texture(glow::TEXTURE_2D, None);
            let error = gl.get_error();
            if error != glow::NO_ERROR {
                warn!("could not apply sampler state to swapchain images: GL error {error:#x}");
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> u32 {
        self.format
    }

    pub fn extent(&self) -> xr::Extent2Di {
        xr::Extent2Di {
            width: self.width as i32,
            height: self.height as i32,
        }
    }

    pub fn raw(&self) -> &xr::Swapchain<xr::OpenGL> {
        &self.inner
    }

    /// Acquire the next image and block until it is safe to write.
    ///
    /// The matching release is issued exactly once when the guard drops.
    pub fn acquire_scoped(&mut self) -> ShellResult<ScopedImage<'_>> {
        let Self { inner, images, .. } = self;
        let guard = Scoped::acquire(inner)?;
        let texture = images
            .get(guard.index() as usize)
            .copied()
            .ok_or_else(|| {
                ShellError::Runtime(format!(
                    "acquired image index {} out of range ({} images)",
                    guard.index(),
                    images.len()
                ))
            })?;
        Ok(ScopedImage { guard, texture })
    }
}

/// The acquire/wait/release protocol of one image chain.
pub(crate) trait ImageChain {
    fn acquire(&mut self) -> ShellResult<u32>;
    fn wait(&mut self) -> ShellResult<()>;
    fn release(&mut self) -> ShellResult<()>;
}

impl ImageChain for xr::Swapchain<xr::OpenGL> {
    fn acquire(&mut self) -> ShellResult<u32> {
        self.acquire_image()
            .map_err(|e| ShellError::Runtime(format!("xrAcquireSwapchainImage: {e:?}")))
    }

    fn wait(&mut self) -> ShellResult<()> {
        // The caller is only ever in a state where acquisition succeeds
        // quickly, so the timeout is effectively unbounded.
        self.wait_image(xr::Duration::from_nanos(i64::MAX))
            .map_err(|e| ShellError::Runtime(format!("xrWaitSwapchainImage: {e:?}")))
    }

    fn release(&mut self) -> ShellResult<()> {
        self.release_image()
            .map_err(|e| ShellError::Runtime(format!("xrReleaseSwapchainImage: {e:?}")))
    }
}

/// Guard over one acquired image; releases on drop.
pub(crate) struct Scoped<'a, C: ImageChain> {
    chain: &'a mut C,
    index: u32,
}

impl<'a, C: ImageChain> Scoped<'a, C> {
    fn acquire(chain: &'a mut C) -> ShellResult<Self> {
        let index = chain.acquire()?;
        chain.wait()?;
        Ok(Self { chain, index })
    }

    fn index(&self) -> u32 {
        self.index
    }
}

impl<C: ImageChain> Drop for Scoped<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.chain.release() {
            warn!("swapchain release failed: {e}");
        }
    }
}

/// An acquired swapchain image, checked out for writing until dropped.
pub struct ScopedImage<'a> {
    guard: Scoped<'a, xr::Swapchain<xr::OpenGL>>,
    texture: u32,
}

impl ScopedImage<'_> {
    pub fn index(&self) -> u32 {
        self.guard.index()
    }

    /// GL texture name backing the acquired image.
    pub fn texture(&self) -> u32 {
        self.texture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Acquire(u32),
        Wait,
        Release(u32),
    }

    struct FakeChain {
        next: u32,
        outstanding: Vec<u32>,
        log: Rc<RefCell<Vec<Call>>>,
    }

    impl FakeChain {
        fn new(log: Rc<RefCell<Vec<Call>>>) -> Self {
            Self {
                next: 0,
                outstanding: Vec::new(),
                log,
            }
        }
    }

    impl ImageChain for FakeChain {
        fn acquire(&mut self) -> ShellResult<u32> {
            let index = self.next;
            self.next += 1;
            self.outstanding.push(index);
            self.log.borrow_mut().push(Call::Acquire(index));
            Ok(index)
        }

        fn wait(&mut self) -> ShellResult<()> {
            self.log.borrow_mut().push(Call::Wait);
            Ok(())
        }

        fn release(&mut self) -> ShellResult<()> {
            // FIFO: release always applies to the oldest acquire.
            let index = self.outstanding.remove(0);
            self.log.borrow_mut().push(Call::Release(index));
            Ok(())
        }
    }

    #[test]
    fn release_pairs_with_acquire_fifo() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut chain = FakeChain::new(log.clone());

        for _ in 0..3 {
            let scoped = Scoped::acquire(&mut chain).unwrap();
            let _ = scoped.index();
        }

        let calls = log.borrow();
        assert_eq!(
            *calls,
            vec![
                Call::Acquire(0),
                Call::Wait,
                Call::Release(0),
                Call::Acquire(1),
                Call::Wait,
                Call::Release(1),
                Call::Acquire(2),
                Call::Wait,
                Call::Release(2),
            ]
        );
    }

    #[test]
    fn guard_releases_on_early_exit() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut chain = FakeChain::new(log.clone());

        let attempt = (|| -> ShellResult<()> {
            let _scoped = Scoped::acquire(&mut chain)?;
            Err(ShellError::Graphics("render failed".to_string()))
        })();
        assert!(attempt.is_err());

        let calls = log.borrow();
        assert_eq!(calls.last(), Some(&Call::Release(0)));
    }

    #[test]
    fn index_matches_acquired_image() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut chain = FakeChain::new(log);

        {
            let scoped = Scoped::acquire(&mut chain).unwrap();
            assert_eq!(scoped.index(), 0);
        }
        {
            let scoped = Scoped::acquire(&mut chain).unwrap();
            assert_eq!(scoped.index(), 1);
        }
        assert!(chain.outstanding.is_empty());
    }
}
