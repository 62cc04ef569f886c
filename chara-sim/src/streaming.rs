//! Actor status publisher using TCP sockets.
//!
//! Pushes status events to external consumers as length-prefixed JSON
//! frames:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (JSON)           │
//! │ Big-endian u32   │ ActorStatus event        │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! A dedicated publisher thread owns the TCP listener and drains the
//! status feed; producers never block on the network. Clients that fail a
//! write are dropped.

use crate::error::Result;
use crate::status::ActorStatus;
use crossbeam_channel::Receiver;
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Maximum frame payload size (sanity bound for consumers)
const MAX_FRAME_BYTES: usize = 1_048_576;

/// Events drained per loop iteration before checking for new clients
const DRAIN_BATCH: usize = 50;

/// TCP publisher for the live actor status feed.
pub struct StatusPublisher {
    local_addr: SocketAddr,
    publisher_thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl StatusPublisher {
    /// Bind `bind_address` and start the publisher thread draining `events`.
    pub fn start(bind_address: &str, events: Receiver<ActorStatus>) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let publisher_thread = thread::Builder::new()
            .name("status-publisher".to_string())
            .spawn(move || {
                publisher_thread_loop(listener, events, shutdown_clone);
            })?;

        info!("status publisher listening on {}", local_addr);
        Ok(Self {
            local_addr,
            publisher_thread: Some(publisher_thread),
            shutdown,
        })
    }

    /// Address the publisher actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signal the publisher thread to stop and wait for it.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.publisher_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatusPublisher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Publisher thread main loop: accept clients, drain events, broadcast.
fn publisher_thread_loop(
    listener: TcpListener,
    events: Receiver<ActorStatus>,
    shutdown: Arc<AtomicBool>,
) {
    let mut clients: Vec<TcpStream> = Vec::new();

    while !shutdown.load(Ordering::Relaxed) {
        // Accept new client connections (non-blocking)
        match listener.accept() {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    warn!("failed to configure client {}: {}", addr, e);
                } else {
                    info!("status client connected: {}", addr);
                    clients.push(stream);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                // No new connections
            }
            Err(e) => {
                error!("error accepting status client: {}", e);
            }
        }

        // Drain a batch of events; cap the batch so accepts are not starved.
        let mut drained = 0;
        let mut idle = true;
        while drained < DRAIN_BATCH {
            match events.try_recv() {
                Ok(status) => {
                    idle = false;
                    drained += 1;
                    match encode_frame(&status) {
                        Ok(frame) => broadcast_frame(&mut clients, &frame),
                        Err(e) => debug!("skipping unencodable status event: {}", e),
                    }
                }
                Err(crossbeam_channel::TryRecvError::Empty) => break,
                Err(crossbeam_channel::TryRecvError::Disconnected) => {
                    info!("status feed closed, publisher exiting");
                    return;
                }
            }
        }

        if idle {
            thread::sleep(Duration::from_millis(10));
        }
    }
}

/// Serialize one status event into a length-prefixed JSON frame.
fn encode_frame(status: &ActorStatus) -> serde_json::Result<Vec<u8>> {
    let payload = serde_json::to_vec(status)?;
    debug_assert!(payload.len() <= MAX_FRAME_BYTES);

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Write a frame to every client, dropping clients whose write fails.
fn broadcast_frame(clients: &mut Vec<TcpStream>, frame: &[u8]) {
    clients.retain_mut(|client| match client.write_all(frame) {
        Ok(()) => true,
        Err(e) => {
            info!("dropping status client: {}", e);
            false
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::LatestHub;
    use std::io::Read;

    fn read_frame(stream: &mut TcpStream) -> ActorStatus {
        let mut len_bytes = [0u8; 4];
        stream.read_exact(&mut len_bytes).unwrap();
        let len = u32::from_be_bytes(len_bytes) as usize;
        assert!(len <= MAX_FRAME_BYTES);

        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).unwrap();
        serde_json::from_slice(&payload).unwrap()
    }

    #[test]
    fn test_encode_frame_length_prefix() {
        let status = ActorStatus::new(1, 1, 2.0, 3.0, "moving");
        let frame = encode_frame(&status).unwrap();

        let len = u32::from_be_bytes(frame[..4].try_into().unwrap()) as usize;
        assert_eq!(len, frame.len() - 4);

        let decoded: ActorStatus = serde_json::from_slice(&frame[4..]).unwrap();
        assert_eq!(decoded, status);
    }

    #[test]
    fn test_publisher_streams_events_to_client() {
        let hub: LatestHub<ActorStatus> = LatestHub::new();
        let events = hub.subscribe();
        let mut publisher = StatusPublisher::start("127.0.0.1:0", events).unwrap();

        let mut client = TcpStream::connect(publisher.local_addr()).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        // Let the publisher accept before the first event lands.
        thread::sleep(Duration::from_millis(50));

        hub.publish(ActorStatus::new(7, 2, 1.0, 1.0, "moving"));
        hub.publish(ActorStatus::new(7, 2, 2.0, 1.0, "arrived"));

        let first = read_frame(&mut client);
        assert_eq!(first.actor_id, 7);
        assert_eq!(first.speech, "moving");

        let second = read_frame(&mut client);
        assert_eq!(second.speech, "arrived");

        publisher.shutdown();
    }
}
