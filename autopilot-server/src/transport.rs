//! Sentence outputs.
//!
//! Completed sentences go to zero or more outputs:
//! - a named event channel (tokio `broadcast`), for in-process consumers
//! - a UDP socket, for NMEA 0183 equipment and multiplexers on the network
//!
//! With neither enabled, sentences are still computed but go nowhere.

use log::{debug, error, info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;

use autopilot_core::io::{IoError, SentenceSink};

use crate::config::{ConfigError, PluginConfig};

/// Capacity of the event channel; slow subscribers lose the oldest sentences
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Cannot create UDP socket: {0}")]
    Socket(#[from] std::io::Error),
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// An event emitted on the named event channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceEvent {
    pub name: String,
    pub sentence: String,
}

/// Last error reported by an output, shown in the status API.
///
/// Cleared again by the next successful UDP send.
#[derive(Clone, Default)]
pub struct ProviderStatus {
    inner: Arc<RwLock<Option<String>>>,
}

impl ProviderStatus {
    pub fn set_error(&self, message: String) {
        if let Ok(mut status) = self.inner.write() {
            *status = Some(message);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut status) = self.inner.write() {
            *status = None;
        }
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().ok().and_then(|s| s.clone())
    }
}

/// Named event output
pub struct EventOutput {
    name: String,
    tx: broadcast::Sender<SentenceEvent>,
}

impl EventOutput {
    pub fn new(name: &str, tx: broadcast::Sender<SentenceEvent>) -> Self {
        Self {
            name: name.to_string(),
            tx,
        }
    }
}

impl SentenceSink for EventOutput {
    fn send(&mut self, sentence: &str) -> Result<(), IoError> {
        // No subscribers is not an error; the event just has no listeners
        let _ = self.tx.send(SentenceEvent {
            name: self.name.clone(),
            sentence: sentence.to_string(),
        });
        Ok(())
    }
}

/// UDP datagram output
pub struct UdpOutput {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpOutput {
    /// Create a non-blocking socket bound to an ephemeral port.
    pub fn new(target: SocketAddr) -> Result<Self, TransportError> {
        let domain = match target {
            SocketAddr::V4(_) => Domain::IPV4,
            SocketAddr::V6(_) => Domain::IPV6,
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_nonblocking(true)?;
        // Allow sending to a broadcast address such as 192.168.1.255
        if target.is_ipv4() {
            socket.set_broadcast(true)?;
        }
        let any = match target {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        socket.bind(&any.into())?;

        info!("UDP output to {}", target);
        Ok(Self {
            socket: socket.into(),
            target,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl SentenceSink for UdpOutput {
    fn send(&mut self, sentence: &str) -> Result<(), IoError> {
        self.socket
            .send_to(sentence.as_bytes(), self.target)
            .map(|_| ())
            .map_err(IoError::from)
    }
}

/// All configured outputs.
///
/// Every sentence is offered to every output; a failing output does not keep
/// the others from receiving it. Failures are logged and recorded in the
/// provider status, never retried.
pub struct Outputs {
    event: Option<EventOutput>,
    udp: Option<UdpOutput>,
    status: ProviderStatus,
}

impl Outputs {
    pub fn new(
        config: &PluginConfig,
        events: broadcast::Sender<SentenceEvent>,
        status: ProviderStatus,
    ) -> Result<Self, TransportError> {
        let event = config
            .event_output_enabled
            .then(|| EventOutput::new(&config.event_name, events));
        let udp = if config.udp_output_enabled {
            Some(UdpOutput::new(config.udp_target()?)?)
        } else {
            None
        };
        if event.is_none() && udp.is_none() {
            info!("No sentence output enabled");
        }
        Ok(Self { event, udp, status })
    }

    /// An event channel with the default capacity
    pub fn event_channel() -> broadcast::Sender<SentenceEvent> {
        broadcast::channel(EVENT_CHANNEL_CAPACITY).0
    }
}

impl SentenceSink for Outputs {
    fn send(&mut self, sentence: &str) -> Result<(), IoError> {
        debug!("send {}", sentence);
        let mut result = Ok(());
        if let Some(event) = &mut self.event {
            result = event.send(sentence);
        }
        if let Some(udp) = &mut self.udp {
            match udp.send(sentence) {
                Ok(()) => self.status.clear(),
                Err(e) => {
                    if e.is_would_block() {
                        warn!("UDP socket buffer full, sentence to {} dropped", udp.target());
                    } else {
                        error!("UDP send to {} failed: {}", udp.target(), e);
                    }
                    self.status.set_error(e.message.clone());
                    result = Err(e);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XTE: &str = "$MAXTE,A,A,0.0000,L,N,A*18";

    fn config(event: bool, udp: bool, port: u16) -> PluginConfig {
        PluginConfig {
            event_output_enabled: event,
            udp_output_enabled: udp,
            udp_port: port,
            ..PluginConfig::default()
        }
    }

    fn make_outputs(config: &PluginConfig, status: ProviderStatus) -> Outputs {
        Outputs::new(config, Outputs::event_channel(), status).unwrap()
    }

    #[test]
    fn test_event_output() {
        let tx = Outputs::event_channel();
        let mut rx = tx.subscribe();
        let mut outputs = Outputs::new(&config(true, false, 0), tx, ProviderStatus::default())
            .unwrap();

        outputs.send(XTE).unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, "nmea0183out");
        assert_eq!(event.sentence, XTE);
    }

    #[test]
    fn test_event_output_without_subscribers() {
        let mut outputs = make_outputs(&config(true, false, 0), ProviderStatus::default());
        assert!(outputs.send(XTE).is_ok());
    }

    #[test]
    fn test_no_outputs() {
        let tx = Outputs::event_channel();
        let mut rx = tx.subscribe();
        let mut outputs = Outputs::new(&config(false, false, 0), tx, ProviderStatus::default())
            .unwrap();
        assert!(outputs.send(XTE).is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_udp_output() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let status = ProviderStatus::default();
        status.set_error("Connection refused".to_string());
        let mut outputs = make_outputs(&config(false, true, port), status.clone());
        outputs.send("$MAHSC,10.0,T,15.0,M,C*27").unwrap();

        let mut buf = [0u8; 128];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"$MAHSC,10.0,T,15.0,M,C*27");

        // A successful send clears the previous failure
        assert_eq!(status.error(), None);
    }

    #[test]
    fn test_udp_failure_is_recorded() {
        // Port 0 is not a valid destination, so every send fails
        let status = ProviderStatus::default();
        let tx = Outputs::event_channel();
        let mut rx = tx.subscribe();
        let mut outputs = Outputs::new(&config(true, true, 0), tx, status.clone()).unwrap();

        let err = outputs.send(XTE).unwrap_err();
        assert!(!err.message.is_empty());
        assert_eq!(status.error(), Some(err.message));

        // The event output still got the sentence
        assert_eq!(rx.try_recv().unwrap().sentence, XTE);
    }

    #[test]
    fn test_provider_status() {
        let status = ProviderStatus::default();
        assert_eq!(status.error(), None);
        status.set_error("Network is unreachable".to_string());
        assert_eq!(
            status.clone().error().as_deref(),
            Some("Network is unreachable")
        );
        status.clear();
        assert_eq!(status.error(), None);
    }
}
