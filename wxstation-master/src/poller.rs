//! One request/response/validate cycle per node kind.
//!
//! Every poll goes `send -> await response -> parse -> validate | derive`.
//! A transport failure or an unparseable line sends the link back to `send`
//! after a flush frame, up to [`RetryPolicy::max_attempts`] times in total.
//! A reading that parses but fails validation is final for the cycle.

use tracing::{debug, error, info, instrument, warn};
use wxstation_core::protocol::frame;
use wxstation_core::{
    Command, FrameCodec, FrameError, LacrosseReading, NodeId, NodeReading, ParseResult,
    Validator, Verdict,
};

use crate::transport::{Transport, TransportError};

/// How many times a request is tried before the poll is given up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Why a single attempt produced nothing usable.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{source} in response {raw:?}")]
    Frame {
        #[source]
        source: FrameError,
        raw: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("{command} gave no usable response after {attempts} attempt(s): {last}")]
    Exhausted {
        command: Command,
        attempts: u32,
        #[source]
        last: AttemptError,
    },
}

impl PollError {
    pub fn attempts(&self) -> u32 {
        match self {
            PollError::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Send `command` until `parse` accepts a response line or the policy runs out.
///
/// `on_failure` runs after every failed attempt. When `flush` is set, that
/// frame is written before each retry to resynchronise the link.
pub(crate) fn exchange<T, R>(
    transport: &mut T,
    command: Command,
    policy: RetryPolicy,
    flush: Option<Command>,
    parse: impl Fn(&[u8]) -> ParseResult<R>,
    mut on_failure: impl FnMut(),
) -> Result<R, PollError>
where
    T: Transport + ?Sized,
{
    let mut attempt = 1;

    loop {
        let outcome = transport
            .write_frame(&command.frame())
            .map_err(AttemptError::from)
            .and_then(|line| {
                parse(&line).map_err(|source| AttemptError::Frame {
                    source,
                    raw: FrameCodec::line_text(&line),
                })
            });

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        on_failure();
        match &error {
            AttemptError::Frame { raw, .. } => {
                error!(%command, attempt, response = ?raw, "Invalid response received");
            }
            AttemptError::Transport(e) => {
                error!(%command, attempt, error = %e, "Transport failure");
            }
        }

        if attempt >= policy.max_attempts {
            return Err(PollError::Exhausted {
                command,
                attempts: attempt,
                last: error,
            });
        }

        if let Some(flush) = flush {
            if let Err(e) = transport.write_frame(&flush.frame()) {
                debug!(error = %e, "Flush frame got no answer");
            }
        }
        warn!(%command, attempt, max_attempts = policy.max_attempts, "Trying again");
        attempt += 1;
    }
}

/// Polls the node receiver and keeps the latest reading of every node.
pub struct NodePoller<T: Transport> {
    transport: T,
    validator: Validator,
    policy: RetryPolicy,
    readings: [NodeReading; 3],
    lacrosse: Option<LacrosseReading>,
}

impl<T: Transport> NodePoller<T> {
    pub fn new(transport: T, validator: Validator, policy: RetryPolicy) -> Self {
        Self {
            transport,
            validator,
            policy,
            readings: [NodeReading::default(); 3],
            lacrosse: None,
        }
    }

    /// Request, parse and validate the latest frame of `node`.
    ///
    /// Returns the node's updated reading; `error` is set when the frame
    /// failed validation. Fails only when no attempt produced a parseable
    /// frame, in which case the stored reading keeps its previous telemetry
    /// and has `error` set.
    #[instrument(name = "poll_node", skip(self), fields(%node))]
    pub fn poll_node(&mut self, node: NodeId) -> Result<NodeReading, PollError> {
        let slot = &mut self.readings[node.index()];
        let telemetry = exchange(
            &mut self.transport,
            Command::Node(node),
            self.policy,
            Some(Command::Flush),
            |line| frame::parse_node(node, &FrameCodec::decode(line)),
            || slot.error = true,
        )?;
        info!("Node reading received");

        let verdict = self.validator.validate(&telemetry);
        if let Verdict::Rejected(rejection) = verdict {
            error!(%rejection, ?telemetry, "Node out of range - data old or invalid");
        }

        let reading = NodeReading {
            telemetry: Some(telemetry),
            error: !verdict.is_accepted(),
        };
        self.readings[node.index()] = reading;
        debug!(?reading, "Node reading stored");

        Ok(reading)
    }

    /// Request and parse the La Crosse frame and derive dew point and humidex.
    #[instrument(name = "poll_lacrosse", skip(self))]
    pub fn poll_lacrosse(&mut self) -> Result<LacrosseReading, PollError> {
        let parsed = exchange(
            &mut self.transport,
            Command::Lacrosse,
            self.policy,
            Some(Command::Flush),
            |line| frame::parse_lacrosse(&FrameCodec::decode(line)),
            || {},
        )?;
        info!("La Crosse reading received");

        let reading = LacrosseReading::from(parsed);
        self.lacrosse = Some(reading);
        debug!(?reading, "La Crosse reading stored");

        Ok(reading)
    }

    /// Send `command` once and return the response line without its terminator.
    pub fn raw(&mut self, command: Command) -> Result<String, TransportError> {
        let line = self.transport.write_frame(&command.frame())?;
        Ok(FrameCodec::line_text(&line))
    }

    pub fn reading(&self, node: NodeId) -> &NodeReading {
        &self.readings[node.index()]
    }

    pub fn readings(&self) -> &[NodeReading; 3] {
        &self.readings
    }

    pub fn lacrosse(&self) -> Option<&LacrosseReading> {
        self.lacrosse.as_ref()
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }
}
