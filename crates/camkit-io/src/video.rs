use std::path::Path;

use gstreamer::prelude::*;

use camkit_image::{Image, ImageSize};

use crate::error::IoError;

/// The codec used for encoding video output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// H.264 through x264.
    H264,
}

/// Pick a reasonable default codec for the host platform.
///
/// macOS players prefer avc1-tagged H.264; everywhere else H.264 in an mp4
/// container is the portable choice, so the answer is currently uniform.
pub fn default_codec() -> VideoCodec {
    VideoCodec::H264
}

/// The pixel layout of the frames handed to the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    /// 8-bit RGB frames.
    Rgb8,
    /// 8-bit grayscale frames.
    Mono8,
}

/// Writes frames into an encoded video container file.
///
/// Wraps a gstreamer appsrc pipeline; the encoder and muxer do all codec
/// work. Grayscale input is expanded by the pipeline's converter so mono
/// frames can be written directly.
pub struct VideoWriter {
    pipeline: gstreamer::Pipeline,
    appsrc: gstreamer_app::AppSrc,
    fps: i32,
    format: VideoFormat,
    counter: u64,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl VideoWriter {
    /// Create a writer for the given output path.
    pub fn new(
        path: impl AsRef<Path>,
        codec: VideoCodec,
        format: VideoFormat,
        fps: i32,
        size: ImageSize,
    ) -> Result<Self, IoError> {
        if !gstreamer::INITIALIZED.load(std::sync::atomic::Ordering::Relaxed) {
            gstreamer::init().map_err(|e| IoError::CaptureError(e.to_string()))?;
        }

        let encoder = match codec {
            VideoCodec::H264 => "x264enc",
        };

        let format_str = match format {
            VideoFormat::Mono8 => "GRAY8",
            VideoFormat::Rgb8 => "RGB",
        };

        let path = path.as_ref().to_owned();
        let pipeline_str = format!(
            "appsrc name=src ! \
            videoconvert ! video/x-raw,format=I420 ! \
            {encoder} ! \
            video/x-h264,profile=main ! \
            h264parse ! \
            mp4mux ! \
            filesink location={}",
            path.to_string_lossy()
        );

        let pipeline = gstreamer::parse::launch(&pipeline_str)
            .map_err(|e| IoError::CaptureError(e.to_string()))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| IoError::CaptureError("failed to cast pipeline".into()))?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| IoError::CaptureError("appsrc element missing".into()))?
            .dynamic_cast::<gstreamer_app::AppSrc>()
            .map_err(|_| IoError::CaptureError("failed to cast appsrc".into()))?;

        appsrc.set_format(gstreamer::Format::Time);

        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", format_str)
            .field("width", size.width as i32)
            .field("height", size.height as i32)
            .field("framerate", gstreamer::Fraction::new(fps, 1))
            .build();
        appsrc.set_caps(Some(&caps));
        appsrc.set_is_live(true);
        appsrc.set_property("block", false);

        Ok(Self {
            pipeline,
            appsrc,
            fps,
            format,
            counter: 0,
            handle: None,
        })
    }

    /// Set the pipeline playing and watch the bus in the background.
    pub fn start(&mut self) -> Result<(), IoError> {
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| IoError::CaptureError(e.to_string()))?;

        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| IoError::CaptureError("pipeline has no bus".into()))?;

        let handle = std::thread::spawn(move || {
            for msg in bus.iter_timed(gstreamer::ClockTime::NONE) {
                match msg.view() {
                    gstreamer::MessageView::Eos(..) => {
                        log::debug!("gstreamer received EOS");
                        break;
                    }
                    gstreamer::MessageView::Error(err) => {
                        log::error!("gstreamer error: {}", err.error());
                        break;
                    }
                    _ => {}
                }
            }
        });
        self.handle = Some(handle);

        Ok(())
    }

    /// Write one frame.
    ///
    /// The channel count must match the configured [`VideoFormat`].
    pub fn write<const C: usize>(&mut self, img: &Image<u8, C>) -> Result<(), IoError> {
        let expected = match self.format {
            VideoFormat::Mono8 => 1,
            VideoFormat::Rgb8 => 3,
        };
        if C != expected {
            return Err(IoError::InvalidChannels(C));
        }

        let mut buffer = gstreamer::Buffer::from_mut_slice(img.as_slice().to_vec());

        let pts =
            gstreamer::ClockTime::from_nseconds(self.counter * 1_000_000_000 / self.fps as u64);
        let duration = gstreamer::ClockTime::from_nseconds(1_000_000_000 / self.fps as u64);

        let buffer_ref = buffer
            .get_mut()
            .ok_or_else(|| IoError::CaptureError("buffer not writable".into()))?;
        buffer_ref.set_pts(Some(pts));
        buffer_ref.set_duration(Some(duration));

        self.counter += 1;

        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| IoError::CaptureError(e.to_string()))?;

        Ok(())
    }

    /// Finish the stream and close the file.
    pub fn close(&mut self) -> Result<(), IoError> {
        self.appsrc
            .end_of_stream()
            .map_err(|e| IoError::CaptureError(e.to_string()))?;

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(IoError::CaptureError("bus thread panicked".into()));
            }
        }

        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| IoError::CaptureError(e.to_string()))?;

        Ok(())
    }
}

impl Drop for VideoWriter {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(err) = self.close() {
                log::error!("failed to close video writer: {}", err);
            }
        }
    }
}
