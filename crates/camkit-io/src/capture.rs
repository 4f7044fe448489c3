use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use camkit_image::Image;
use camkit_imgproc::color::{bgr_from_rgb, gray_from_rgb_u8, hsv_from_rgb, ColorSpace};

use crate::error::IoError;
use crate::rate::Rate;

/// A blocking producer of RGB frames (camera, video file, network feed).
///
/// Implementations are driven from the capture thread; `grab` may return
/// `Ok(None)` when no frame is available right now.
pub trait FrameSource: Send + 'static {
    /// Fetch the next frame.
    fn grab(&mut self) -> Result<Option<Image<u8, 3>>, IoError>;
}

/// A captured frame in the configured colorspace.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Red-green-blue.
    Rgb(Image<u8, 3>),
    /// Blue-green-red.
    Bgr(Image<u8, 3>),
    /// Hue-saturation-value.
    Hsv(Image<u8, 3>),
    /// Single-channel luminance.
    Gray(Image<u8, 1>),
}

/// Background frame acquisition with last-write-wins semantics.
///
/// A worker thread polls the source at the configured rate and stores only
/// the most recent frame behind a coarse lock. Readers never block on the
/// source and may observe the same frame twice or none at all; there is no
/// queueing and no backpressure.
pub struct ThreadedCapture {
    frame: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadedCapture {
    /// Start the capture loop over a frame source.
    ///
    /// `hz` is the polling rate; `format` the colorspace frames are
    /// converted to before they are published.
    pub fn open<S: FrameSource>(mut source: S, hz: f64, format: ColorSpace) -> Self {
        let frame = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));

        log::info!("opened capture at {} Hz, colorspace {}", hz, format);

        let thread_frame = Arc::clone(&frame);
        let thread_running = Arc::clone(&running);

        let handle = std::thread::spawn(move || {
            let mut rate = Rate::new(hz);
            while thread_running.load(Ordering::Relaxed) {
                match source.grab() {
                    Ok(Some(rgb)) => match convert(&rgb, format) {
                        Ok(converted) => {
                            let mut slot = thread_frame
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner);
                            *slot = Some(converted);
                        }
                        Err(err) => log::warn!("frame conversion failed: {}", err),
                    },
                    Ok(None) => {}
                    Err(err) => log::warn!("frame grab failed: {}", err),
                }
                rate.sleep();
            }
        });

        Self {
            frame,
            running,
            handle: Some(handle),
        }
    }

    /// Start the capture loop with a raw colorspace flag value.
    ///
    /// Unknown flag values are rejected instead of silently defaulting.
    pub fn open_with_flag<S: FrameSource>(
        source: S,
        hz: f64,
        format_flag: u8,
    ) -> Result<Self, IoError> {
        let format =
            ColorSpace::from_flag(format_flag).ok_or(IoError::InvalidColorSpace(format_flag))?;
        Ok(Self::open(source, hz, format))
    }

    /// The most recent frame, if any arrived yet.
    ///
    /// Non-blocking; repeated calls may return the same (stale) frame.
    pub fn read(&self) -> Option<Frame> {
        self.frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop the capture loop and join the worker thread.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("capture thread panicked");
            }
        }
    }
}

impl Drop for ThreadedCapture {
    fn drop(&mut self) {
        self.close();
    }
}

fn convert(rgb: &Image<u8, 3>, format: ColorSpace) -> Result<Frame, IoError> {
    Ok(match format {
        ColorSpace::Rgb => Frame::Rgb(rgb.clone()),
        ColorSpace::Bgr => {
            let mut out = Image::from_size_val(rgb.size(), 0)?;
            bgr_from_rgb(rgb, &mut out)?;
            Frame::Bgr(out)
        }
        ColorSpace::Hsv => {
            let mut out = Image::from_size_val(rgb.size(), 0)?;
            hsv_from_rgb(rgb, &mut out)?;
            Frame::Hsv(out)
        }
        ColorSpace::Gray => {
            let mut out = Image::from_size_val(rgb.size(), 0)?;
            gray_from_rgb_u8(rgb, &mut out)?;
            Frame::Gray(out)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::ImageSize;
    use std::time::Duration;

    /// Source producing numbered solid-color frames.
    struct Counter {
        n: u8,
    }

    impl FrameSource for Counter {
        fn grab(&mut self) -> Result<Option<Image<u8, 3>>, IoError> {
            self.n = self.n.wrapping_add(1);
            Ok(Some(Image::from_size_val(
                ImageSize {
                    width: 8,
                    height: 8,
                },
                self.n,
            )?))
        }
    }

    #[test]
    fn capture_publishes_latest_frame() {
        let mut cap = ThreadedCapture::open(Counter { n: 0 }, 200.0, ColorSpace::Rgb);

        // wait for at least one frame
        let mut frame = None;
        for _ in 0..50 {
            frame = cap.read();
            if frame.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        cap.close();

        match frame.expect("a frame should have arrived") {
            Frame::Rgb(img) => assert_eq!(img.size().width, 8),
            other => panic!("unexpected frame kind: {:?}", other),
        }
    }

    #[test]
    fn gray_format_converts_channels() {
        let cap = ThreadedCapture::open(Counter { n: 100 }, 200.0, ColorSpace::Gray);
        std::thread::sleep(Duration::from_millis(50));
        if let Some(frame) = cap.read() {
            assert!(matches!(frame, Frame::Gray(_)));
        }
        drop(cap);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let res = ThreadedCapture::open_with_flag(Counter { n: 0 }, 30.0, 3);
        assert!(matches!(res, Err(IoError::InvalidColorSpace(3))));
    }

    #[test]
    fn read_before_first_frame_is_none_or_some() {
        // reading immediately must never block or fail
        let cap = ThreadedCapture::open(Counter { n: 0 }, 30.0, ColorSpace::Rgb);
        let _ = cap.read();
        drop(cap);
    }
}
