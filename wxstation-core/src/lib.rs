pub mod metrics;
pub mod protocol;
pub mod validator;

pub use protocol::{Command, FrameCodec, FrameError, ParseResult};
pub use validator::{Limits, Rejection, Validator, VarianceField, Verdict};

use serde::{Deserialize, Serialize};

/// Address reported by a telemetry node in the first field of its frame.
pub type NodeAddress = u32;

/// One of the three telemetry nodes hanging off the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeId {
    Node1,
    Node2,
    Node3,
}

impl NodeId {
    /// Polling order used by the station.
    pub const ALL: [NodeId; 3] = [NodeId::Node1, NodeId::Node2, NodeId::Node3];

    /// Command token understood by the receiver firmware.
    pub fn command(&self) -> &'static str {
        match self {
            NodeId::Node1 => "node1",
            NodeId::Node2 => "node2",
            NodeId::Node3 => "node3",
        }
    }

    /// Address the node reports for itself.
    pub fn address(&self) -> NodeAddress {
        match self {
            NodeId::Node1 => 1,
            NodeId::Node2 => 2,
            NodeId::Node3 => 3,
        }
    }

    /// Divisor applied to the raw battery field.
    ///
    /// Node 2 senses its battery through a 1:2 resistor divider, so the
    /// firmware reports twice the real value.
    pub fn vbat_divisor(&self) -> i32 {
        match self {
            NodeId::Node2 => 2,
            NodeId::Node1 | NodeId::Node3 => 1,
        }
    }

    /// Index into per-node tables.
    pub fn index(&self) -> usize {
        match self {
            NodeId::Node1 => 0,
            NodeId::Node2 => 1,
            NodeId::Node3 => 2,
        }
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.pad(self.command())
    }
}

/// A fully parsed telemetry frame from a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeTelemetry {
    /// Address the node reported for itself.
    pub address: NodeAddress,
    /// Seconds since the node last booted.
    pub uptime_seconds: i64,
    /// Probe temperature in degrees Celsius, or the overflow sentinel.
    pub temperature_c: f64,
    /// Supply voltage, raw firmware units.
    pub vin_millivolts: i32,
    /// Battery voltage, raw firmware units after calibration.
    pub vbat_millivolts: i32,
    /// Seconds since the receiver last heard from the node.
    pub age_seconds: i64,
}

/// The in-memory reading kept for one node.
///
/// `telemetry` is `None` until the first frame from the node parses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeReading {
    /// Last successfully parsed frame.
    pub telemetry: Option<NodeTelemetry>,
    /// Set when the last poll failed to parse or failed validation.
    pub error: bool,
}

impl NodeReading {
    pub fn is_populated(&self) -> bool {
        self.telemetry.is_some()
    }
}

impl Default for NodeReading {
    fn default() -> Self {
        Self {
            telemetry: None,
            error: true,
        }
    }
}

/// A frame from the La Crosse weather station, plus derived quantities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LacrosseReading {
    pub station_id: i64,
    /// Air temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Relative humidity as a percentage.
    pub relative_humidity_pct: i32,
    /// Wind speed in km/h.
    pub wind_speed_kmh: f64,
    /// Wind direction in degrees.
    pub wind_direction_deg: i32,
    /// Rainfall in millimeters.
    pub rainfall_mm: i32,
    /// Dew point in whole degrees Celsius.
    pub dew_point_c: i32,
    /// Humidex, one decimal place.
    pub humidex_c: f64,
}
