//! Plausibility checks for node telemetry.
//!
//! A reading is checked against fixed absolute bounds first, then against the
//! last reading accepted for the same node address. Only accepted readings
//! ever become the comparison baseline.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::{NodeAddress, NodeId, NodeTelemetry};

/// Bounds a reading must satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
    pub min_voltage: i32,
    pub max_voltage: i32,
    pub max_age_seconds: i64,
    /// Allowed relative change against the baseline, e.g. `0.3` for 30%.
    pub allowed_variance: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_temperature_c: -50.0,
            max_temperature_c: 50.0,
            min_voltage: 0,
            max_voltage: 1000,
            max_age_seconds: 700,
            allowed_variance: 0.3,
        }
    }
}

/// Quantity that moved too far from its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceField {
    Temperature,
    Vbat,
    Vin,
}

/// Why a reading was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    Temperature { value: f64 },
    Voltage { vin: i32, vbat: i32 },
    Age { seconds: i64 },
    UnknownNode { address: NodeAddress },
    Variance {
        field: VarianceField,
        previous: f64,
        current: f64,
    },
}

impl core::fmt::Display for Rejection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Rejection::Temperature { value } => write!(f, "temperature {value} out of range"),
            Rejection::Voltage { vin, vbat } => {
                write!(f, "vin {vin} or vbat {vbat} out of range")
            }
            Rejection::Age { seconds } => write!(f, "reading is {seconds}s old"),
            Rejection::UnknownNode { address } => write!(f, "unknown node address {address}"),
            Rejection::Variance {
                field,
                previous,
                current,
            } => write!(f, "{field:?} moved from {previous} to {current}"),
        }
    }
}

/// Outcome of validating one reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// First reading for the node; accepted without variance checks.
    Seeded,
    /// Within bounds and close enough to the baseline.
    Accepted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Verdict::Rejected(_))
    }
}

/// Owns the last known good reading of every configured node.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: Limits,
    baselines: BTreeMap<NodeAddress, Option<NodeTelemetry>>,
}

impl Validator {
    /// Validator for the given node addresses, starting from a first run.
    pub fn new(addresses: impl IntoIterator<Item = NodeAddress>) -> Self {
        Self::with_limits(addresses, Limits::default())
    }

    pub fn with_limits(addresses: impl IntoIterator<Item = NodeAddress>, limits: Limits) -> Self {
        Self {
            limits,
            baselines: addresses.into_iter().map(|a| (a, None)).collect(),
        }
    }

    /// Last accepted reading for `address`, if any.
    pub fn baseline(&self, address: NodeAddress) -> Option<&NodeTelemetry> {
        self.baselines.get(&address).and_then(Option::as_ref)
    }

    /// Forget every baseline.
    pub fn reset(&mut self) {
        for baseline in self.baselines.values_mut() {
            *baseline = None;
        }
    }

    /// Check `reading` and, if it passes, make it the node's new baseline.
    pub fn validate(&mut self, reading: &NodeTelemetry) -> Verdict {
        let verdict = self.check(reading);

        match verdict {
            Verdict::Rejected(rejection) => {
                debug!(address = reading.address, %rejection, "Reading rejected");
            }
            Verdict::Seeded | Verdict::Accepted => {
                debug!(address = reading.address, ?verdict, "Reading accepted");
                self.baselines.insert(reading.address, Some(*reading));
            }
        }

        verdict
    }

    fn check(&self, reading: &NodeTelemetry) -> Verdict {
        let limits = &self.limits;

        if reading.temperature_c < limits.min_temperature_c
            || reading.temperature_c > limits.max_temperature_c
        {
            return Verdict::Rejected(Rejection::Temperature {
                value: reading.temperature_c,
            });
        }

        let voltage_range = limits.min_voltage..=limits.max_voltage;
        if !voltage_range.contains(&reading.vin_millivolts)
            || !voltage_range.contains(&reading.vbat_millivolts)
        {
            return Verdict::Rejected(Rejection::Voltage {
                vin: reading.vin_millivolts,
                vbat: reading.vbat_millivolts,
            });
        }

        if reading.age_seconds > limits.max_age_seconds {
            return Verdict::Rejected(Rejection::Age {
                seconds: reading.age_seconds,
            });
        }

        let Some(slot) = self.baselines.get(&reading.address) else {
            return Verdict::Rejected(Rejection::UnknownNode {
                address: reading.address,
            });
        };

        let Some(previous) = slot else {
            return Verdict::Seeded;
        };

        let checks = [
            (
                VarianceField::Temperature,
                previous.temperature_c,
                reading.temperature_c,
            ),
            (
                VarianceField::Vbat,
                f64::from(previous.vbat_millivolts),
                f64::from(reading.vbat_millivolts),
            ),
            (
                VarianceField::Vin,
                f64::from(previous.vin_millivolts),
                f64::from(reading.vin_millivolts),
            ),
        ];

        for (field, previous, current) in checks {
            if !within_band(previous, current, limits.allowed_variance) {
                return Verdict::Rejected(Rejection::Variance {
                    field,
                    previous,
                    current,
                });
            }
        }

        Verdict::Accepted
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(NodeId::ALL.iter().map(NodeId::address))
    }
}

// Band endpoints swap for negative baselines.
fn within_band(previous: f64, current: f64, variance: f64) -> bool {
    let a = previous * (1.0 - variance);
    let b = previous * (1.0 + variance);
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    (low..=high).contains(&current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telemetry(address: NodeAddress, temperature_c: f64, vin: i32, vbat: i32) -> NodeTelemetry {
        NodeTelemetry {
            address,
            uptime_seconds: 10,
            temperature_c,
            vin_millivolts: vin,
            vbat_millivolts: vbat,
            age_seconds: 5,
        }
    }

    #[test]
    fn test_first_reading_seeds_baseline() {
        let mut v = Validator::default();
        let r = telemetry(1, 20.0, 500, 500);

        assert_eq!(v.validate(&r), Verdict::Seeded);
        assert_eq!(v.baseline(1), Some(&r));
        // Same reading against itself passes the variance band.
        assert_eq!(v.validate(&r), Verdict::Accepted);
    }

    #[test]
    fn test_temperature_out_of_range_always_rejected() {
        let mut v = Validator::default();
        for t in [-100.0, -50.1, 50.1, 80.0] {
            let verdict = v.validate(&telemetry(2, t, 500, 500));
            assert!(!verdict.is_accepted(), "temperature {t} accepted");
        }
        assert!(v.baseline(2).is_none());

        v.validate(&telemetry(2, 20.0, 500, 500));
        assert!(!v.validate(&telemetry(2, 51.0, 500, 500)).is_accepted());
    }

    #[test]
    fn test_absolute_voltage_and_age_bounds() {
        let mut v = Validator::default();
        assert!(matches!(
            v.validate(&telemetry(1, 20.0, -1, 500)),
            Verdict::Rejected(Rejection::Voltage { .. })
        ));
        assert!(matches!(
            v.validate(&telemetry(1, 20.0, 500, 1001)),
            Verdict::Rejected(Rejection::Voltage { .. })
        ));

        let mut old = telemetry(1, 20.0, 500, 500);
        old.age_seconds = 701;
        assert_eq!(
            v.validate(&old),
            Verdict::Rejected(Rejection::Age { seconds: 701 })
        );

        old.age_seconds = 700;
        assert!(v.validate(&old).is_accepted());
    }

    #[test]
    fn test_unknown_node_rejected() {
        let mut v = Validator::default();
        assert_eq!(
            v.validate(&telemetry(4, 20.0, 500, 500)),
            Verdict::Rejected(Rejection::UnknownNode { address: 4 })
        );
        assert!(v.baseline(4).is_none());
    }

    #[test]
    fn test_each_field_outside_variance_band_rejects() {
        let base = telemetry(3, 20.0, 500, 600);

        let perturbed = [
            (telemetry(3, 27.0, 500, 600), VarianceField::Temperature),
            (telemetry(3, 13.0, 500, 600), VarianceField::Temperature),
            (telemetry(3, 20.0, 500, 800), VarianceField::Vbat),
            (telemetry(3, 20.0, 500, 400), VarianceField::Vbat),
            (telemetry(3, 20.0, 660, 600), VarianceField::Vin),
            (telemetry(3, 20.0, 340, 600), VarianceField::Vin),
        ];

        for (reading, expected) in perturbed {
            let mut v = Validator::default();
            v.validate(&base);
            match v.validate(&reading) {
                Verdict::Rejected(Rejection::Variance { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {expected:?} variance rejection, got {other:?}"),
            }
            assert_eq!(v.baseline(3), Some(&base));
        }
    }

    #[test]
    fn test_within_variance_band_accepts() {
        let mut v = Validator::default();
        v.validate(&telemetry(1, 20.0, 500, 600));

        let next = telemetry(1, 25.0, 620, 450);
        assert_eq!(v.validate(&next), Verdict::Accepted);
        assert_eq!(v.baseline(1), Some(&next));
    }

    #[test]
    fn test_rejected_reading_does_not_move_baseline() {
        let mut v = Validator::default();
        let first = telemetry(1, 20.0, 500, 500);
        v.validate(&first);

        assert!(!v.validate(&telemetry(1, 29.0, 500, 500)).is_accepted());
        assert_eq!(v.baseline(1), Some(&first));

        let third = telemetry(1, 21.0, 500, 500);
        assert!(v.validate(&third).is_accepted());
        assert_eq!(v.baseline(1).map(|b| b.temperature_c), Some(21.0));
    }

    #[test]
    fn test_negative_baseline_band() {
        let mut v = Validator::default();
        v.validate(&telemetry(1, -10.0, 500, 500));

        assert!(v.validate(&telemetry(1, -11.0, 500, 500)).is_accepted());
        assert!(!v.validate(&telemetry(1, -20.0, 500, 500)).is_accepted());
    }

    #[test]
    fn test_baselines_are_per_node() {
        let mut v = Validator::default();
        v.validate(&telemetry(1, 20.0, 500, 500));

        assert_eq!(v.validate(&telemetry(2, 40.0, 900, 100)), Verdict::Seeded);
    }

    #[test]
    fn test_reset_returns_to_first_run() {
        let mut v = Validator::default();
        v.validate(&telemetry(1, 20.0, 500, 500));
        v.reset();

        assert!(v.baseline(1).is_none());
        assert_eq!(v.validate(&telemetry(1, 40.0, 900, 900)), Verdict::Seeded);
    }

    #[test]
    fn test_custom_address_set() {
        let mut v = Validator::new([7]);
        assert_eq!(v.validate(&telemetry(7, 20.0, 500, 500)), Verdict::Seeded);
        assert!(!v.validate(&telemetry(1, 20.0, 500, 500)).is_accepted());
    }
}
