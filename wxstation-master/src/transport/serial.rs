use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, trace};
use wxstation_core::protocol::FRAME_DELIMITER;

use super::{MAX_LINE_LENGTH, Transport, TransportError};
use crate::config::{LinkConfig, PressureConfig};

/// How a device on the other end of the port expects to be talked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkProfile {
    /// The node receiver. Emits garbage after reset and needs a delimiter
    /// round trip before every request.
    Receiver,
    /// The barometer. Echoes the command line before answering.
    Barometer,
}

pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    timeout: Duration,
    settle: Duration,
    profile: LinkProfile,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(
        path: impl Into<String>,
        baud_rate: u32,
        timeout: Duration,
        settle: Duration,
        profile: LinkProfile,
    ) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            timeout,
            settle,
            profile,
            port: None,
        }
    }

    pub fn receiver(config: &LinkConfig) -> Self {
        Self::new(
            config.port.clone(),
            config.baud_rate,
            config.timeout(),
            config.settle(),
            LinkProfile::Receiver,
        )
    }

    pub fn barometer(config: &PressureConfig) -> Self {
        Self::new(
            config.port.clone(),
            config.baud_rate,
            config.timeout(),
            config.settle(),
            LinkProfile::Barometer,
        )
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn connect(&self) -> Result<Box<dyn SerialPort>, TransportError> {
        debug!(port = %self.path, baud_rate = self.baud_rate, "Opening serial connection");
        let mut port = serialport::new(&self.path, self.baud_rate)
            .timeout(self.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: self.path.clone(),
                source,
            })?;

        if self.profile == LinkProfile::Receiver {
            // The receiver resets when the port opens and prints a banner.
            port.write_all(&[FRAME_DELIMITER])?;
            discard_line(port.as_mut());
            port.clear(ClearBuffer::Input)?;
        }

        Ok(port)
    }

    fn exchange(
        &self,
        port: &mut dyn SerialPort,
        frame: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        match self.profile {
            LinkProfile::Receiver => {
                // Push out whatever half-frame the receiver is sitting on.
                port.write_all(&[FRAME_DELIMITER])?;
                discard_line(port);
                std::thread::sleep(self.settle);
                port.clear(ClearBuffer::Input)?;

                trace!(frame = ?String::from_utf8_lossy(frame), "Writing frame");
                port.write_all(frame)?;
                read_line(port)
            }
            LinkProfile::Barometer => {
                port.clear(ClearBuffer::Input)?;

                trace!(frame = ?String::from_utf8_lossy(frame), "Writing frame");
                port.write_all(frame)?;
                std::thread::sleep(self.settle);
                discard_line(port);
                std::thread::sleep(self.settle);
                read_line(port)
            }
        }
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.port.is_none() {
            self.port = Some(self.connect()?);
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.path, "Closed serial connection");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut port = match self.port.take() {
            Some(port) => port,
            None => self.connect()?,
        };

        let result = self.exchange(port.as_mut(), frame);
        drop(port);
        debug!(port = %self.path, "Closed serial connection");

        if let Ok(line) = &result {
            debug!(response = ?String::from_utf8_lossy(line), "Received line");
        }
        result
    }
}

/// Read up to and including the next `\n`.
///
/// A line that reaches [`MAX_LINE_LENGTH`] without its terminator is an error,
/// so the caller resynchronises instead of parsing a cut-off frame.
fn read_line<R: Read + ?Sized>(port: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut line = Vec::with_capacity(64);
    let mut byte = [0u8; 1];

    loop {
        match port.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
                if line.len() >= MAX_LINE_LENGTH {
                    return Err(TransportError::Overlong {
                        limit: MAX_LINE_LENGTH,
                    });
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                if line.is_empty() {
                    return Err(TransportError::Timeout);
                }
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(line)
}

fn discard_line(port: &mut dyn SerialPort) {
    match read_line(port) {
        Ok(line) => trace!(discarded = ?String::from_utf8_lossy(&line), "Discarded line"),
        Err(e) => trace!(error = %e, "Nothing to discard"),
    }
}
