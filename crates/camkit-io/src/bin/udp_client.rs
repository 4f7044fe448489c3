//! Poll a UDP frame server and save the received JPEG frames to disk.

use std::path::PathBuf;
use std::time::Duration;

use argh::FromArgs;

use camkit_io::udp::FrameClient;
use camkit_io::IoError;

#[derive(FromArgs)]
/// Receive images from a UDP frame server.
struct Args {
    /// server address, e.g. 192.168.1.10:9050
    #[argh(positional)]
    server: String,

    /// number of frames to receive before exiting, default 100
    #[argh(option, short = 'n', default = "100")]
    count: usize,

    /// directory to write received frames into
    #[argh(option, short = 'o', default = "PathBuf::from(\"frames\")")]
    out: PathBuf,

    /// ask the server to shut down after receiving
    #[argh(switch, short = 's')]
    stop: bool,
}

fn main() -> Result<(), IoError> {
    env_logger::init();
    let args: Args = argh::from_env();

    std::fs::create_dir_all(&args.out)?;
    let client = FrameClient::with_timeout(args.server.as_str(), Duration::from_millis(200))?;

    let mut received = 0usize;
    let mut misses = 0usize;

    while received < args.count {
        match client.request_frame()? {
            Some(bytes) => {
                let path = args.out.join(format!("frame_{received:05}.jpg"));
                std::fs::write(&path, &bytes)?;
                log::info!("frame {} ({} bytes)", received, bytes.len());
                received += 1;
                misses = 0;
            }
            None => {
                misses += 1;
                if misses > 200 {
                    log::error!("no frames after {} attempts, giving up", misses);
                    break;
                }
            }
        }
    }

    if args.stop {
        client.stop_server()?;
        log::info!("sent stop request");
    }

    log::info!("received {} frames into {}", received, args.out.display());
    Ok(())
}
