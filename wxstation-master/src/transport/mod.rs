pub mod mock;
pub mod serial;

pub use mock::MockTransport;
pub use serial::{LinkProfile, SerialTransport};

/// Longest response line accepted from a device.
pub const MAX_LINE_LENGTH: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out waiting for response")]
    Timeout,

    #[error("response line exceeds {limit} bytes")]
    Overlong { limit: usize },
}

/// A byte link to a device that answers one line per request frame.
///
/// Implementations open the link on demand and close it again once the
/// response line has been read, so no handle is held between transactions.
pub trait Transport: Send {
    fn open(&mut self) -> Result<(), TransportError>;

    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Write `frame` and block until a response line arrives or the
    /// configured timeout expires. The returned line keeps its terminator.
    fn write_frame(&mut self, frame: &[u8]) -> Result<Vec<u8>, TransportError>;
}
