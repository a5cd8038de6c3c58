//! Telemetry link layer
//!
//! Resolves sensor services through an injected discovery interface,
//! connects with bounded retries, and runs one streaming reader per
//! channel on its own thread.

pub mod error;
pub mod discovery;
pub mod establisher;
pub mod presenter;
pub mod reader;
pub mod channel;
pub mod sensor;

pub use error::{LinkError, LinkResult, RecoveryStrategy};
pub use discovery::{Discovery, ServiceDescriptor, ServiceTable};
pub use establisher::{ConnectionEstablisher, Connector, Established, RetryPolicy, TcpConnector};
pub use presenter::{Job, PresentationContext, PresentationHandle, PresentationQueue};
pub use reader::{ReadReport, StreamEnd, StreamingReader};
pub use channel::{Channel, ChannelHandle, ChannelReport, ChannelSpec};
pub use sensor::SensorServer;
