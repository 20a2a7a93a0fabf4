pub mod config;
pub mod controller;
pub mod poller;
pub mod pressure;
pub mod transport;

pub use config::{Config, LinkConfig, LoggingConfig, PollingConfig, PressureConfig};
pub use controller::{NodeOutcome, StationController, StationReport};
pub use poller::{AttemptError, NodePoller, PollError, RetryPolicy};
pub use pressure::PressureSensor;
pub use transport::{LinkProfile, MockTransport, SerialTransport, Transport, TransportError};
