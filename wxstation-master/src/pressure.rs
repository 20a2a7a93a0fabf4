use tracing::{info, instrument};
use wxstation_core::protocol::frame;
use wxstation_core::{Command, FrameCodec};

use crate::poller::{PollError, RetryPolicy, exchange};
use crate::transport::Transport;

/// Barometric sensor on its own link, answering the bare `pres` command.
pub struct PressureSensor<T: Transport> {
    transport: T,
    policy: RetryPolicy,
    last: Option<f64>,
}

impl<T: Transport> PressureSensor<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            last: None,
        }
    }

    /// Read the current pressure. The sensor has no resync frame, so failed
    /// attempts are simply repeated.
    #[instrument(name = "read_pressure", skip(self))]
    pub fn read_pressure(&mut self) -> Result<f64, PollError> {
        let pressure = exchange(
            &mut self.transport,
            Command::Pressure,
            self.policy,
            None,
            |line| frame::parse_pressure(&FrameCodec::line_text(line)),
            || {},
        )?;
        info!(pressure, "Pressure reading received");

        self.last = Some(pressure);
        Ok(pressure)
    }

    /// Last successfully read pressure.
    pub fn last(&self) -> Option<f64> {
        self.last
    }
}
