//! Loopback accelerometer service for demos and tests

use crate::link::discovery::{ServiceDescriptor, ServiceTable};
use crate::link::channel::ChannelSpec;
use crate::processing::parser::encode_line;
use log::{info, warn};
use std::io::{self, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Streams a deterministic sinusoid to the first client that connects.
///
/// The service registers in the table only after `register_after`, and
/// unregisters when it stops. Every wait checks the stop flag, so
/// [`stop_and_join`](Self::stop_and_join) returns even if no client ever
/// connected.
pub struct SensorServer {
    name: String,
    port: u16,
    stop: Arc<AtomicBool>,
    thread: JoinHandle<io::Result<u64>>,
}

impl SensorServer {
    pub fn spawn(
        spec: ChannelSpec,
        table: Arc<ServiceTable>,
        register_after: Duration,
        period: Duration,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();
        let stop = Arc::new(AtomicBool::new(false));
        let name = spec.name();

        let thread_stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(format!("sensor-{}", spec.sensor))
            .spawn(move || serve(spec, table, listener, register_after, period, &thread_stop))?;

        Ok(Self { name, port, stop, thread })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Raise the stop flag and wait for the thread; returns lines written
    pub fn stop_and_join(self) -> io::Result<u64> {
        self.stop.store(true, Ordering::SeqCst);
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} sensor thread panicked", self.name),
            )),
        }
    }
}

fn serve(
    spec: ChannelSpec,
    table: Arc<ServiceTable>,
    listener: TcpListener,
    register_after: Duration,
    period: Duration,
    stop: &AtomicBool,
) -> io::Result<u64> {
    let port = listener.local_addr()?.port();
    let registered_at = Instant::now() + register_after;
    while Instant::now() < registered_at {
        if stop.load(Ordering::SeqCst) {
            return Ok(0);
        }
        thread::sleep(period.min(registered_at.saturating_duration_since(Instant::now())));
    }
    table.register(&spec.group, &spec.sensor, ServiceDescriptor::new("127.0.0.1", port));

    let written = match wait_for_client(&listener, period, stop)? {
        Some(socket) => stream(&spec, socket, period, stop),
        None => {
            info!("{}: stopped before any client connected", spec.name());
            0
        }
    };

    table.unregister(&spec.group, &spec.sensor);
    Ok(written)
}

fn wait_for_client(listener: &TcpListener, period: Duration, stop: &AtomicBool) -> io::Result<Option<TcpStream>> {
    loop {
        match listener.accept() {
            Ok((socket, peer)) => {
                socket.set_nonblocking(false)?;
                info!("client {} connected", peer);
                return Ok(Some(socket));
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if stop.load(Ordering::SeqCst) {
                    return Ok(None);
                }
                thread::sleep(period);
            }
            Err(e) => return Err(e),
        }
    }
}

fn stream(spec: &ChannelSpec, mut socket: TcpStream, period: Duration, stop: &AtomicBool) -> u64 {
    let mut written = 0u64;
    while !stop.load(Ordering::SeqCst) {
        let t = written as f32 * period.as_secs_f32();
        let values = [(t * 2.0).sin(), (t * 3.0).cos() * 0.5, 9.81 + (t * 5.0).sin() * 0.2];
        if let Err(e) = writeln!(socket, "{}", encode_line(Some(&spec.sensor), &values)) {
            warn!("{}: client went away: {}", spec.name(), e);
            break;
        }
        written += 1;
        thread::sleep(period);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::discovery::Discovery;
    use crate::processing::parser::decode_line;
    use std::io::{BufRead, BufReader};

    const PERIOD: Duration = Duration::from_millis(5);

    #[test]
    fn test_stop_without_client_returns() {
        let table = Arc::new(ServiceTable::new());
        let server = SensorServer::spawn(
            ChannelSpec::new("accel", "sensor1", "chest"),
            table.clone(),
            Duration::ZERO,
            PERIOD,
        )
        .unwrap();

        // wait for registration, then stop without ever connecting
        let deadline = Instant::now() + Duration::from_secs(2);
        while table.lookup("accel", "sensor1").is_none() && Instant::now() < deadline {
            thread::sleep(PERIOD);
        }
        assert!(table.lookup("accel", "sensor1").is_some());

        assert_eq!(server.stop_and_join().unwrap(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_stop_before_registration_returns() {
        let table = Arc::new(ServiceTable::new());
        let server = SensorServer::spawn(
            ChannelSpec::new("accel", "sensor2", "hand"),
            table.clone(),
            Duration::from_secs(60),
            PERIOD,
        )
        .unwrap();

        assert_eq!(server.stop_and_join().unwrap(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_streams_decodable_lines() {
        let table = Arc::new(ServiceTable::new());
        let server = SensorServer::spawn(
            ChannelSpec::new("accel", "sensor1", "chest"),
            table.clone(),
            Duration::ZERO,
            PERIOD,
        )
        .unwrap();

        let socket = TcpStream::connect(("127.0.0.1", server.port())).unwrap();
        let mut lines = BufReader::new(socket).lines();
        for _ in 0..3 {
            let line = lines.next().unwrap().unwrap();
            let event = decode_line(&line).unwrap();
            assert_eq!(event.label(), Some("sensor1"));
            assert!((event.z() - 9.81).abs() < 0.25);
        }

        assert!(server.stop_and_join().unwrap() >= 3);
    }
}
