//! Stream a directory of images over UDP as JPEG datagrams.
//!
//! Stands in for a live camera: frames are read from disk once, encoded at
//! the requested quality and cycled by a background grabber thread, so the
//! serving loop always hands out the most recent buffer.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use argh::FromArgs;

use camkit_io::compression::{Compressor, CompressionFormat};
use camkit_io::functional::load_images_gray8;
use camkit_io::rate::Rate;
use camkit_io::udp::FrameServer;
use camkit_io::IoError;

#[derive(FromArgs)]
/// Serve images from a directory over UDP. Payloads are limited to 65507
/// bytes, so larger images need a lower JPEG quality.
struct Args {
    /// address to bind, e.g. 0.0.0.0:9050
    #[argh(positional)]
    bind: String,

    /// directory with the images to stream
    #[argh(option, short = 'd')]
    dir: PathBuf,

    /// jpeg quality percentage, default 80
    #[argh(option, short = 'q', default = "80")]
    quality: u8,

    /// frame cycle rate in Hz, default 30
    #[argh(option, short = 'f', default = "30.0")]
    fps: f64,
}

fn main() -> Result<(), IoError> {
    env_logger::init();
    let args: Args = argh::from_env();

    let images = load_images_gray8(&args.dir)?;
    if images.is_empty() {
        return Err(IoError::CaptureError(format!(
            "no images found in {}",
            args.dir.display()
        )));
    }

    let compressor = Compressor::new(CompressionFormat::Jpeg).with_jpeg_quality(args.quality);
    let mut encoded = Vec::with_capacity(images.len());
    for img in &images {
        encoded.push(compressor.compress_gray8(img)?);
    }

    let latest: Arc<Mutex<Option<Vec<u8>>>> = Arc::new(Mutex::new(None));
    let running = Arc::new(AtomicBool::new(true));

    // grabber loop cycling through the encoded frames
    let grabber_latest = Arc::clone(&latest);
    let grabber_running = Arc::clone(&running);
    let fps = args.fps;
    let grabber = std::thread::spawn(move || {
        let mut rate = Rate::new(fps);
        let mut idx = 0usize;
        while grabber_running.load(Ordering::Relaxed) {
            {
                let mut slot = grabber_latest.lock().unwrap_or_else(PoisonError::into_inner);
                *slot = Some(encoded[idx].clone());
            }
            idx = (idx + 1) % encoded.len();
            rate.sleep();
        }
    });

    let server = FrameServer::bind(&args.bind)?;
    log::info!(
        "serving {} frames on {} at {} Hz",
        images.len(),
        server.local_addr()?,
        args.fps
    );

    let result = server.serve(|| {
        latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    });

    running.store(false, Ordering::Relaxed);
    if grabber.join().is_err() {
        log::warn!("grabber thread panicked");
    }
    log::info!("quitting");
    result
}
