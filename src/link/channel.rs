//! Telemetry channels: one sensor service, one socket, one reader thread

use crate::link::discovery::ServiceDescriptor;
use crate::link::error::{LinkError, LinkResult};
use crate::link::establisher::ConnectionEstablisher;
use crate::link::presenter::PresentationContext;
use crate::link::reader::{ReadReport, StreamEnd, StreamingReader};
use crate::processing::series::SampleSink;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::{self, BufReader};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Which sensor service to read and how to title its display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub group: String,
    pub sensor: String,
    pub title: String,
}

impl ChannelSpec {
    pub fn new(group: impl Into<String>, sensor: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            sensor: sensor.into(),
            title: title.into(),
        }
    }

    /// `group/sensor`, used as the thread and log name
    pub fn name(&self) -> String {
        format!("{}/{}", self.group, self.sensor)
    }
}

/// Summary of a channel that connected and then ran to completion
#[derive(Debug)]
pub struct ChannelReport {
    pub spec: ChannelSpec,
    pub endpoint: ServiceDescriptor,
    pub unresolved_polls: u32,
    pub connect_attempts: u32,
    pub read: ReadReport,
}

#[derive(Default)]
struct ChannelControl {
    closed: AtomicBool,
    socket: Mutex<Option<TcpStream>>,
}

impl ChannelControl {
    fn socket(&self) -> std::sync::MutexGuard<'_, Option<TcpStream>> {
        match self.socket.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(socket) = self.socket().as_ref() {
            let _ = socket.shutdown(Shutdown::Both);
        }
    }

    fn attach(&self, socket: TcpStream) {
        let mut slot = self.socket();
        if self.closed.load(Ordering::SeqCst) {
            let _ = socket.shutdown(Shutdown::Both);
        }
        *slot = Some(socket);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Handle to a running channel thread
pub struct ChannelHandle {
    name: String,
    control: Arc<ChannelControl>,
    thread: JoinHandle<LinkResult<ChannelReport>>,
}

impl ChannelHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Close the socket from outside; the reader ends with an error
    pub fn close(&self) {
        info!("{}: closing", self.name);
        self.control.close();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the channel thread to end
    pub fn join(self) -> LinkResult<ChannelReport> {
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => Err(LinkError::ThreadPanicked { channel: self.name }),
        }
    }
}

/// Establishes and reads one telemetry channel
pub struct Channel {
    spec: ChannelSpec,
    establisher: ConnectionEstablisher,
    presenter: Arc<dyn PresentationContext>,
    sink: Arc<dyn SampleSink>,
}

impl Channel {
    pub fn new(
        spec: ChannelSpec,
        establisher: ConnectionEstablisher,
        presenter: Arc<dyn PresentationContext>,
        sink: Arc<dyn SampleSink>,
    ) -> Self {
        Self {
            spec,
            establisher,
            presenter,
            sink,
        }
    }

    /// Run discovery, connect and the reader loop on a dedicated thread
    pub fn spawn(self) -> io::Result<ChannelHandle> {
        let name = self.spec.name();
        let control = Arc::new(ChannelControl::default());
        let thread_control = Arc::clone(&control);
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run(&thread_control))?;
        Ok(ChannelHandle { name, control, thread })
    }

    /// Same as [`spawn`](Self::spawn) but on the calling thread
    pub fn open(self) -> LinkResult<ChannelReport> {
        self.run(&ChannelControl::default())
    }

    fn run(self, control: &ChannelControl) -> LinkResult<ChannelReport> {
        let name = self.spec.name();
        let established = self
            .establisher
            .establish(&self.spec.group, &self.spec.sensor)
            .map_err(|e| {
                warn!("{}: channel not established: {}", name, e);
                e
            })?;

        control.attach(established.stream.try_clone()?);
        info!("{}: streaming from {} ({})", name, established.endpoint, self.spec.title);

        let reader = StreamingReader::new(name, self.presenter, self.sink);
        let mut read = reader.run(BufReader::new(established.stream));

        if control.is_closed() && !read.end.is_error() {
            read.end = StreamEnd::Error(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "channel closed locally",
            ));
        }

        Ok(ChannelReport {
            spec: self.spec,
            endpoint: established.endpoint,
            unresolved_polls: established.unresolved_polls,
            connect_attempts: established.connect_attempts,
            read,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::discovery::ServiceTable;
    use crate::link::establisher::{RetryPolicy, TcpConnector};
    use crate::link::presenter::PresentationQueue;
    use crate::processing::series::ShiftingSeries;
    use std::io::Write;
    use std::net::TcpListener;
    use std::time::Duration;

    fn establisher(table: Arc<ServiceTable>) -> ConnectionEstablisher {
        let policy = RetryPolicy {
            poll_interval: Duration::from_millis(5),
            max_polls: Some(200),
            connect_attempts: 5,
            connect_delay: Duration::from_millis(5),
        };
        ConnectionEstablisher::new(table, Arc::new(TcpConnector::new()), policy)
    }

    #[test]
    fn test_channel_name() {
        let spec = ChannelSpec::new("accel", "sensor1", "Remote Chest Sensor");
        assert_eq!(spec.name(), "accel/sensor1");
    }

    #[test]
    fn test_open_reads_until_server_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            socket.write_all(b"1,0,9.8\n2,0,9.8\n").unwrap();
        });

        let table = Arc::new(ServiceTable::new());
        table.register("accel", "sensor1", ServiceDescriptor::new("127.0.0.1", port));
        let queue = PresentationQueue::new();
        let series = Arc::new(ShiftingSeries::new("chest", 8));

        let channel = Channel::new(
            ChannelSpec::new("accel", "sensor1", "chest"),
            establisher(table),
            Arc::new(queue.handle()),
            series.clone(),
        );
        let report = channel.open().unwrap();
        server.join().unwrap();

        assert_eq!(report.read.samples, 2);
        assert!(!report.read.end.is_error());
        assert_eq!(queue.run_pending(), 2);
        assert_eq!(series.latest().unwrap().x, 2.0);
    }

    #[test]
    fn test_close_ends_reader_with_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (release_tx, release_rx) = crossbeam::channel::bounded::<()>(1);
        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            socket.write_all(b"1,2,3\n").unwrap();
            // hold the connection open until the test is done
            let _ = release_rx.recv_timeout(Duration::from_secs(5));
        });

        let table = Arc::new(ServiceTable::new());
        table.register("accel", "sensor2", ServiceDescriptor::new("127.0.0.1", port));
        let queue = PresentationQueue::new();
        let series = Arc::new(ShiftingSeries::new("hand", 8));

        let handle = Channel::new(
            ChannelSpec::new("accel", "sensor2", "hand"),
            establisher(table),
            Arc::new(queue.handle()),
            series.clone(),
        )
        .spawn()
        .unwrap();

        // wait for the first sample before closing
        assert!(queue.run_until_idle(Duration::from_millis(500)) >= 1);
        assert!(!handle.is_finished());
        handle.close();
        let report = handle.join().unwrap();
        let _ = release_tx.send(());
        server.join().unwrap();

        assert!(report.read.end.is_error());
        assert_eq!(report.read.samples, 1);
    }
}
