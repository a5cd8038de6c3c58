//! Connection establishment with discovery polling and bounded connect retries
//!
//! All waits are blocking sleeps on the calling thread, normally the
//! dedicated channel thread that goes on to run the reader loop.

use crate::core::{CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY_MS, DISCOVERY_POLL_INTERVAL_MS};
use crate::link::discovery::{Discovery, ServiceDescriptor};
use crate::link::error::{LinkError, LinkResult};
use crate::utils::config::{ConnectConfig, DiscoveryConfig};
use log::{debug, info, warn};
use std::io;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Opens a byte stream to a resolved endpoint
pub trait Connector: Send + Sync {
    fn connect(&self, endpoint: &ServiceDescriptor) -> io::Result<TcpStream>;
}

/// Plain TCP connector
#[derive(Debug, Clone, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for TcpConnector {
    fn connect(&self, endpoint: &ServiceDescriptor) -> io::Result<TcpStream> {
        TcpStream::connect((endpoint.host.as_str(), endpoint.port))
    }
}

/// Poll and retry timing
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub poll_interval: Duration,
    /// `None` polls discovery until the service shows up
    pub max_polls: Option<u32>,
    pub connect_attempts: u32,
    pub connect_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(discovery: &DiscoveryConfig, connect: &ConnectConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(discovery.poll_interval_ms),
            max_polls: discovery.max_polls,
            connect_attempts: connect.attempts,
            connect_delay: Duration::from_millis(connect.retry_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DISCOVERY_POLL_INTERVAL_MS),
            max_polls: None,
            connect_attempts: CONNECT_ATTEMPTS,
            connect_delay: Duration::from_millis(CONNECT_RETRY_DELAY_MS),
        }
    }
}

/// Live connection plus how much effort it took
#[derive(Debug)]
pub struct Established {
    pub stream: TcpStream,
    pub endpoint: ServiceDescriptor,
    /// Discovery lookups that came back empty before the service resolved
    pub unresolved_polls: u32,
    /// Connect attempts used, the successful one included
    pub connect_attempts: u32,
}

/// Turns a logical (group, name) pair into a connected socket
#[derive(Clone)]
pub struct ConnectionEstablisher {
    discovery: Arc<dyn Discovery>,
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
}

impl ConnectionEstablisher {
    pub fn new(discovery: Arc<dyn Discovery>, connector: Arc<dyn Connector>, policy: RetryPolicy) -> Self {
        Self {
            discovery,
            connector,
            policy,
        }
    }

    /// Resolve then connect
    pub fn establish(&self, group: &str, name: &str) -> LinkResult<Established> {
        let (endpoint, unresolved_polls) = self.resolve(group, name)?;
        let (stream, connect_attempts) = self.connect(&endpoint)?;
        Ok(Established {
            stream,
            endpoint,
            unresolved_polls,
            connect_attempts,
        })
    }

    /// Poll discovery until the service is registered.
    ///
    /// Returns the descriptor and the number of empty lookups before it.
    pub fn resolve(&self, group: &str, name: &str) -> LinkResult<(ServiceDescriptor, u32)> {
        let mut unresolved = 0u32;
        loop {
            if let Some(descriptor) = self.discovery.lookup(group, name) {
                info!("{}/{} resolved to {} after {} empty polls", group, name, descriptor, unresolved);
                return Ok((descriptor, unresolved));
            }
            unresolved += 1;

            if let Some(max) = self.policy.max_polls {
                if unresolved >= max {
                    warn!("{}/{} still unregistered after {} polls, giving up", group, name, unresolved);
                    return Err(LinkError::DiscoveryExhausted {
                        group: group.to_string(),
                        name: name.to_string(),
                        polls: unresolved,
                    });
                }
            }

            debug!("{}/{} not registered yet", group, name);
            thread::sleep(self.policy.poll_interval);
        }
    }

    /// Try to connect up to `connect_attempts` times.
    ///
    /// Returns the stream and the number of attempts used.
    pub fn connect(&self, endpoint: &ServiceDescriptor) -> LinkResult<(TcpStream, u32)> {
        let attempts = self.policy.connect_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match self.connector.connect(endpoint) {
                Ok(stream) => {
                    info!("connected to {} on attempt {}", endpoint, attempt);
                    return Ok((stream, attempt));
                }
                Err(e) => {
                    warn!("connect to {} failed (attempt {}/{}): {}", endpoint, attempt, attempts, e);
                    last_err = Some(e);
                    if attempt < attempts {
                        thread::sleep(self.policy.connect_delay);
                    }
                }
            }
        }

        Err(LinkError::ConnectFailed {
            endpoint: endpoint.to_string(),
            attempts,
            source: last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "no connect attempt made")),
        })
    }
}
