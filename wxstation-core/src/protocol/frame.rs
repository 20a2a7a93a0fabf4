//! Field layouts of the response lines.
//!
//! Node frames: `address,uptime,temperature,vin,vbat,age`, where the
//! temperature field may be the probe overflow token `ovf`.
//!
//! La Crosse frames: `station,temp*10,rh,wind*10,wind_dir,rainfall`.
//!
//! Extra trailing fields are ignored.

use core::str::FromStr;

use super::{FrameError, ParseResult};
use crate::{NodeId, NodeTelemetry};

pub const NODE_FIELDS: usize = 6;
pub const LACROSSE_FIELDS: usize = 6;

/// Token the node sends when its temperature probe overflows.
pub const OVERFLOW_TOKEN: &str = "ovf";
/// Temperature recorded for an overflowed probe. Outside every valid range.
pub const OVERFLOW_TEMPERATURE_C: f64 = -100.0;

/// Raw La Crosse frame, scaled to real units but without derived values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LacrosseFrame {
    pub station_id: i64,
    pub temperature_c: f64,
    pub relative_humidity_pct: i32,
    pub wind_speed_kmh: f64,
    pub wind_direction_deg: i32,
    pub rainfall_mm: i32,
}

/// Parse a node frame, applying the node's battery calibration.
pub fn parse_node(node: NodeId, fields: &[String]) -> ParseResult<NodeTelemetry> {
    require(fields, NODE_FIELDS)?;

    let temperature_c = if fields[2].trim() == OVERFLOW_TOKEN {
        OVERFLOW_TEMPERATURE_C
    } else {
        finite(fields, 2, "temperature")?
    };
    let vbat: i32 = number(fields, 4, "vbat")?;

    Ok(NodeTelemetry {
        address: number(fields, 0, "address")?,
        uptime_seconds: number(fields, 1, "uptime")?,
        temperature_c,
        vin_millivolts: number(fields, 3, "vin")?,
        vbat_millivolts: vbat.div_euclid(node.vbat_divisor()),
        age_seconds: number(fields, 5, "age")?,
    })
}

/// Parse a La Crosse frame. Temperature and wind speed arrive in tenths;
/// humidity must be a percentage.
pub fn parse_lacrosse(fields: &[String]) -> ParseResult<LacrosseFrame> {
    require(fields, LACROSSE_FIELDS)?;

    Ok(LacrosseFrame {
        station_id: number(fields, 0, "station")?,
        temperature_c: finite(fields, 1, "temperature")? / 10.0,
        relative_humidity_pct: humidity(fields, 2)?,
        wind_speed_kmh: finite(fields, 3, "wind_speed")? / 10.0,
        wind_direction_deg: number(fields, 4, "wind_direction")?,
        rainfall_mm: number(fields, 5, "rainfall")?,
    })
}

/// Parse the barometer's answer line.
pub fn parse_pressure(line: &str) -> ParseResult<f64> {
    let raw = line.trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FrameError::InvalidPressure(raw.to_string())),
    }
}

fn require(fields: &[String], needed: usize) -> ParseResult<()> {
    if fields.len() < needed {
        return Err(FrameError::MissingFields {
            needed,
            available: fields.len(),
        });
    }
    Ok(())
}

fn number<T: FromStr>(fields: &[String], index: usize, name: &'static str) -> ParseResult<T> {
    let raw = fields[index].trim();
    raw.parse().map_err(|_| FrameError::InvalidField {
        index,
        name,
        value: raw.to_string(),
    })
}

fn humidity(fields: &[String], index: usize) -> ParseResult<i32> {
    let value: i32 = number(fields, index, "humidity")?;
    if !(0..=100).contains(&value) {
        return Err(FrameError::InvalidField {
            index,
            name: "humidity",
            value: fields[index].trim().to_string(),
        });
    }
    Ok(value)
}

// NaN and infinities would slip through every range comparison.
fn finite(fields: &[String], index: usize, name: &'static str) -> ParseResult<f64> {
    let value: f64 = number(fields, index, name)?;
    if !value.is_finite() {
        return Err(FrameError::InvalidField {
            index,
            name,
            value: fields[index].trim().to_string(),
        });
    }
    Ok(value)
}
