//! Contract between the panel compositor and the external content renderer.
//!
//! The content renderer (an embedded browser surface or similar) runs on its
//! own thread and produces RGBA frames into a [`SharedCanvas`]. The render
//! thread only ever reads the current frame under the pixel-buffer lock and
//! uploads it bit-exact into the panel swapchain image.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// An external pixel-content producer for the UI panel.
///
/// `request_*` calls are asynchronous and never block on the producer
/// thread; `with_pixels` is the synchronous, lock-protected read side.
pub trait SurfaceSource: Send + Sync {
    /// Ask the producer to render a new frame. No-op while a draw is
    /// already in flight.
    fn request_redraw(&self);

    fn request_pause(&self);

    fn request_resume(&self);

    /// Run `f` with the current RGBA framebuffer held under the pixel lock.
    fn with_pixels(&self, f: &mut dyn FnMut(&[u8]));
}

/// Lock-protected RGBA buffer shared between a producer thread and the
/// render thread, with a drawing flag that suppresses redundant redraw
/// requests while a draw is in flight.
pub struct SharedCanvas {
    width: u32,
    height: u32,
    pixels: Mutex<Vec<u8>>,
    drawing: AtomicBool,
}

impl SharedCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: Mutex::new(vec![0u8; (width * height * 4) as usize]),
            drawing: AtomicBool::new(false),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True while a producer draw is in flight.
    pub fn is_drawing(&self) -> bool {
        self.drawing.load(Ordering::Acquire)
    }

    /// Claim the drawing flag. Returns false if a draw is already in
    /// flight, in which case the caller must not draw.
    pub fn begin_draw(&self) -> bool {
        !self.drawing.swap(true, Ordering::AcqRel)
    }

    pub fn finish_draw(&self) {
        self.drawing.store(false, Ordering::Release);
    }

    /// Producer-side write access under the pixel lock.
    pub fn write_pixels(&self, f: &mut dyn FnMut(&mut [u8])) {
        f(&mut self.lock_pixels());
    }

    /// Consumer-side read access under the pixel lock.
    pub fn read_pixels(&self, f: &mut dyn FnMut(&[u8])) {
        f(&self.lock_pixels());
    }

    fn lock_pixels(&self) -> MutexGuard<'_, Vec<u8>> {
        match self.pixels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sized_for_rgba() {
        let canvas = SharedCanvas::new(4, 2);
        canvas.read_pixels(&mut |pixels| assert_eq!(pixels.len(), 4 * 2 * 4));
    }

    #[test]
    fn drawing_flag_is_claimed_once() {
        let canvas = SharedCanvas::new(1, 1);
        assert!(canvas.begin_draw());
        assert!(!canvas.begin_draw());
        assert!(canvas.is_drawing());
        canvas.finish_draw();
        assert!(canvas.begin_draw());
        canvas.finish_draw();
    }

    #[test]
    fn reader_sees_producer_writes() {
        let canvas = SharedCanvas::new(2, 2);
        canvas.write_pixels(&mut |pixels| pixels.fill(0xAB));
        canvas.read_pixels(&mut |pixels| assert!(pixels.iter().all(|&b| b == 0xAB)));
    }
}
