use std::time::Duration;

use jiff::Timestamp;
use serde::{Serialize, Serializer};
use tracing::{info, instrument, warn};
use wxstation_core::{LacrosseReading, NodeId, NodeReading};

use crate::poller::{NodePoller, PollError};
use crate::pressure::PressureSensor;
use crate::transport::{SerialTransport, Transport};

/// Everything gathered in one station cycle.
#[derive(Debug, Serialize)]
pub struct StationReport {
    pub polled_at: Timestamp,
    pub nodes: Vec<NodeOutcome>,
    #[serde(serialize_with = "outcome")]
    pub lacrosse: Result<LacrosseReading, PollError>,
    #[serde(serialize_with = "optional_outcome")]
    pub pressure: Option<Result<f64, PollError>>,
}

#[derive(Debug, Serialize)]
pub struct NodeOutcome {
    pub node: NodeId,
    #[serde(serialize_with = "outcome")]
    pub result: Result<NodeReading, PollError>,
}

impl StationReport {
    /// Polls that produced nothing usable, pressure included.
    pub fn failed_count(&self) -> usize {
        let nodes = self.nodes.iter().filter(|n| n.result.is_err()).count();
        let lacrosse = usize::from(self.lacrosse.is_err());
        let pressure = usize::from(matches!(self.pressure, Some(Err(_))));
        nodes + lacrosse + pressure
    }

    pub fn node(&self, node: NodeId) -> Option<&Result<NodeReading, PollError>> {
        self.nodes.iter().find(|n| n.node == node).map(|n| &n.result)
    }
}

#[derive(Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
enum Outcome<'a, T> {
    Ok(&'a T),
    Failed(String),
}

impl<'a, T> From<&'a Result<T, PollError>> for Outcome<'a, T> {
    fn from(result: &'a Result<T, PollError>) -> Self {
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}

fn outcome<S, T>(result: &Result<T, PollError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    Outcome::from(result).serialize(serializer)
}

fn optional_outcome<S, T>(
    result: &Option<Result<T, PollError>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    result.as_ref().map(Outcome::from).serialize(serializer)
}

/// Sequences one polling cycle over every node, the La Crosse station and,
/// when fitted, the barometer.
pub struct StationController<T: Transport, P: Transport = SerialTransport> {
    poller: NodePoller<T>,
    pressure: Option<PressureSensor<P>>,
    pacing: Duration,
}

impl<T: Transport> StationController<T> {
    pub fn new(poller: NodePoller<T>, pacing: Duration) -> Self {
        Self {
            poller,
            pressure: None,
            pacing,
        }
    }
}

impl<T: Transport, P: Transport> StationController<T, P> {
    pub fn with_pressure<Q: Transport>(self, sensor: PressureSensor<Q>) -> StationController<T, Q> {
        StationController {
            poller: self.poller,
            pressure: Some(sensor),
            pacing: self.pacing,
        }
    }

    /// Poll `node1`, `node2`, `node3` and `lacrosse` in that order, pausing
    /// between requests, then read the barometer. A failed poll is recorded
    /// in the report and the cycle carries on.
    #[instrument(name = "station_cycle", skip(self))]
    pub fn poll_all(&mut self) -> StationReport {
        let polled_at = Timestamp::now();
        let mut nodes = Vec::with_capacity(NodeId::ALL.len());

        for node in NodeId::ALL {
            let result = self.poller.poll_node(node);
            if let Err(e) = &result {
                warn!(%node, error = %e, "Node poll failed");
            }
            nodes.push(NodeOutcome { node, result });
            self.pause();
        }

        let lacrosse = self.poller.poll_lacrosse();
        if let Err(e) = &lacrosse {
            warn!(error = %e, "La Crosse poll failed");
        }

        let pressure = self.pressure.as_mut().map(|sensor| {
            let result = sensor.read_pressure();
            if let Err(e) = &result {
                warn!(error = %e, "Pressure read failed");
            }
            result
        });

        let report = StationReport {
            polled_at,
            nodes,
            lacrosse,
            pressure,
        };
        info!(failed = report.failed_count(), "Station cycle complete");
        report
    }

    pub fn readings(&self) -> &[NodeReading; 3] {
        self.poller.readings()
    }

    pub fn poller(&self) -> &NodePoller<T> {
        &self.poller
    }

    pub fn poller_mut(&mut self) -> &mut NodePoller<T> {
        &mut self.poller
    }

    pub fn pressure_sensor_mut(&mut self) -> Option<&mut PressureSensor<P>> {
        self.pressure.as_mut()
    }

    fn pause(&self) {
        if !self.pacing.is_zero() {
            std::thread::sleep(self.pacing);
        }
    }
}
