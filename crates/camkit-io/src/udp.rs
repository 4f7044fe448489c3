use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::error::IoError;

/// Largest payload a single UDP datagram can practically carry.
pub const MAX_PAYLOAD: usize = 65_507;

/// Request code asking the server for the latest frame.
pub const REQUEST_FRAME: u32 = 1;

/// Request code asking the server to shut down.
pub const REQUEST_STOP: u32 = 0;

/// Sentinel payload value signalling a capture error to the client.
pub const CAPTURE_ERROR: u32 = 404;

/// Serves JPEG-encoded frames over UDP request/response polling.
///
/// Wire format: the client sends a 4-byte little-endian request code; the
/// server answers a frame request with a 4-byte little-endian payload
/// length followed by the payload datagram. Frames above [`MAX_PAYLOAD`]
/// are never fragmented; the server sends the [`CAPTURE_ERROR`] sentinel
/// instead. Every message is independent and loss-tolerant.
pub struct FrameServer {
    socket: UdpSocket,
}

impl FrameServer {
    /// Bind the server socket.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self, IoError> {
        Ok(Self {
            socket: UdpSocket::bind(addr)?,
        })
    }

    /// The bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr, IoError> {
        Ok(self.socket.local_addr()?)
    }

    /// Answer requests until a stop request arrives.
    ///
    /// `latest` returns the most recent encoded frame; `None` means no
    /// frame is available yet and the request goes unanswered (the client
    /// polls again).
    pub fn serve<F>(&self, mut latest: F) -> Result<(), IoError>
    where
        F: FnMut() -> Option<Vec<u8>>,
    {
        loop {
            let mut request = [0u8; 4];
            let (n, peer) = self.socket.recv_from(&mut request)?;
            if n < 4 {
                log::warn!("short request ({} bytes) from {}", n, peer);
                continue;
            }

            match u32::from_le_bytes(request) {
                REQUEST_STOP => {
                    log::info!("stop requested by {}", peer);
                    return Ok(());
                }
                REQUEST_FRAME => {
                    let Some(frame) = latest() else {
                        continue;
                    };
                    if frame.is_empty() {
                        continue;
                    }

                    if frame.len() > MAX_PAYLOAD {
                        log::error!(
                            "image exceeds UDP message size ({}): {}",
                            MAX_PAYLOAD,
                            frame.len()
                        );
                        self.socket.send_to(&4u32.to_le_bytes(), peer)?;
                        self.socket.send_to(&CAPTURE_ERROR.to_le_bytes(), peer)?;
                        continue;
                    }

                    self.socket
                        .send_to(&(frame.len() as u32).to_le_bytes(), peer)?;
                    self.socket.send_to(&frame, peer)?;
                }
                other => log::warn!("unknown request code {} from {}", other, peer),
            }
        }
    }
}

/// Polls a [`FrameServer`] for JPEG-encoded frames.
pub struct FrameClient {
    socket: UdpSocket,
    server: SocketAddr,
}

impl FrameClient {
    /// Create a client for the given server address with a 50 ms receive
    /// timeout.
    pub fn connect(server: impl ToSocketAddrs) -> Result<Self, IoError> {
        Self::with_timeout(server, Duration::from_millis(50))
    }

    /// Create a client with an explicit receive timeout.
    pub fn with_timeout(
        server: impl ToSocketAddrs,
        timeout: Duration,
    ) -> Result<Self, IoError> {
        let server = server
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::AddrNotAvailable))?;

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_read_timeout(Some(timeout))?;

        Ok(Self { socket, server })
    }

    /// Request the latest frame.
    ///
    /// Returns `Ok(None)` when the frame was lost, timed out, or the
    /// server signalled a capture error; a dropped frame is never fatal.
    pub fn request_frame(&self) -> Result<Option<Vec<u8>>, IoError> {
        self.socket
            .send_to(&REQUEST_FRAME.to_le_bytes(), self.server)?;

        let mut len_buf = [0u8; 4];
        let n = match self.socket.recv(&mut len_buf) {
            Ok(n) => n,
            Err(err) if is_timeout(&err) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if n < 4 {
            log::warn!("short length prefix ({} bytes)", n);
            return Ok(None);
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        if len == 0 || len > MAX_PAYLOAD {
            log::warn!("implausible frame length {}", len);
            return Ok(None);
        }

        let mut payload = vec![0u8; len];
        let n = match self.socket.recv(&mut payload) {
            Ok(n) => n,
            Err(err) if is_timeout(&err) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if n != len {
            log::warn!("image packet loss: got {} of {} bytes", n, len);
            return Ok(None);
        }

        if len == 4 {
            let value = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
            if value == CAPTURE_ERROR {
                log::warn!("server reported a capture error");
                return Ok(None);
            }
        }

        Ok(Some(payload))
    }

    /// Ask the server to shut down.
    pub fn stop_server(&self) -> Result<(), IoError> {
        self.socket
            .send_to(&REQUEST_STOP.to_le_bytes(), self.server)?;
        Ok(())
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::{decode_image_jpeg_gray8, encode_image_jpeg_gray8};
    use camkit_image::{Image, ImageSize};

    #[test]
    fn frame_roundtrip_over_loopback() -> Result<(), IoError> {
        let server = FrameServer::bind("127.0.0.1:0")?;
        let addr = server.local_addr()?;

        let size = ImageSize {
            width: 40,
            height: 30,
        };
        let img = Image::<u8, 1>::from_size_val(size, 90)?;
        let encoded = encode_image_jpeg_gray8(&img, 85)?;
        let served = encoded.clone();

        let handle = std::thread::spawn(move || server.serve(move || Some(served.clone())));

        let client = FrameClient::with_timeout(addr, Duration::from_millis(500))?;
        let mut received = None;
        for _ in 0..10 {
            if let Some(bytes) = client.request_frame()? {
                received = Some(bytes);
                break;
            }
        }

        client.stop_server()?;
        handle
            .join()
            .expect("server thread should not panic")?;

        let bytes = received.expect("a frame should arrive over loopback");
        assert_eq!(bytes, encoded);

        let decoded = decode_image_jpeg_gray8(&bytes)?;
        assert_eq!(decoded.size(), size);
        Ok(())
    }

    #[test]
    fn oversized_frames_become_capture_errors() -> Result<(), IoError> {
        let server = FrameServer::bind("127.0.0.1:0")?;
        let addr = server.local_addr()?;

        let handle =
            std::thread::spawn(move || server.serve(|| Some(vec![0u8; MAX_PAYLOAD + 1])));

        let client = FrameClient::with_timeout(addr, Duration::from_millis(500))?;
        let mut got_any = false;
        for _ in 0..5 {
            if client.request_frame()?.is_some() {
                got_any = true;
                break;
            }
        }
        assert!(!got_any, "oversized frames must never be delivered");

        client.stop_server()?;
        handle.join().expect("server thread should not panic")?;
        Ok(())
    }

    #[test]
    fn timeout_without_server_is_not_fatal() -> Result<(), IoError> {
        // nothing listens on this port; requests just time out
        let client = FrameClient::with_timeout("127.0.0.1:1", Duration::from_millis(20))?;
        assert!(client.request_frame()?.is_none());
        Ok(())
    }
}
