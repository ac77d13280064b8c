//! A stand-in content source: renders an animated test card on its own
//! thread, through the same surface contract a real web surface would use.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use slate_core::{SharedCanvas, SurfaceSource};
use tracing::{debug, info};

pub struct TestCardSource {
    canvas: Arc<SharedCanvas>,
    pending: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl TestCardSource {
    pub fn new(width: u32, height: u32) -> Self {
        let canvas = Arc::new(SharedCanvas::new(width, height));
        let pending = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let canvas = canvas.clone();
            let pending = pending.clone();
            let paused = paused.clone();
            let running = running.clone();
            thread::Builder::new()
                .name("slate-testcard".to_string())
                .spawn(move || {
                    let mut frame: u32 = 0;
                    while running.load(Ordering::Acquire) {
                        if pending.swap(false, Ordering::AcqRel) && !paused.load(Ordering::Acquire)
                        {
                            if canvas.begin_draw() {
                                draw_test_card(&canvas, frame);
                                canvas.finish_draw();
                                frame = frame.wrapping_add(1);
                            }
                        } else {
                            thread::sleep(Duration::from_millis(1));
                        }
                    }
                })
                .ok()
        };

        Self {
            canvas,
            pending,
            paused,
            running,
            worker,
        }
    }
}

fn draw_test_card(canvas: &SharedCanvas, frame: u32) {
    let width = canvas.width();
    let height = canvas.height();
    let phase = (frame % 255) as u8;
    canvas.write_pixels(&mut |pixels| {
        for y in 0..height {
            for x in 0..width {
                let i = ((y * width + x) * 4) as usize;
                pixels[i] = ((x * 255) / width.max(1)) as u8;
                pixels[i + 1] = ((y * 255) / height.max(1)) as u8;
                pixels[i + 2] = phase;
                pixels[i + 3] = 255;
            }
        }
    });
}

impl SurfaceSource for TestCardSource {
    fn request_redraw(&self) {
        if self.canvas.is_drawing() {
            return;
        }
        self.pending.store(true, Ordering::Release);
    }

    fn request_pause(&self) {
        debug!("test card paused");
        self.paused.store(true, Ordering::Release);
    }

    fn request_resume(&self) {
        debug!("test card resumed");
        self.paused.store(false, Ordering::Release);
    }

    fn with_pixels(&self, f: &mut dyn FnMut(&[u8])) {
        self.canvas.read_pixels(f);
    }
}

impl Drop for TestCardSource {
    fn drop(&mut self) {
        info!("closing test card source");
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn redraw_produces_pixels() {
        let source = TestCardSource::new(8, 8);
        source.request_redraw();

        // Wait for the worker to pick the request up.
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let mut alpha_set = false;
            source.with_pixels(&mut |pixels| {
                alpha_set = pixels.chunks_exact(4).all(|px| px[3] == 255);
            });
            if alpha_set {
                break;
            }
            assert!(Instant::now() < deadline, "worker never drew a frame");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn paused_source_skips_redraws() {
        let source = TestCardSource::new(4, 4);
        source.request_pause();
        source.request_redraw();
        thread::sleep(Duration::from_millis(50));

        let mut untouched = false;
        source.with_pixels(&mut |pixels| {
            untouched = pixels.iter().all(|&b| b == 0);
        });
        assert!(untouched);
    }
}
