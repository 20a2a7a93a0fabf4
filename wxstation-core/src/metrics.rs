//! Derived meteorological quantities.

use crate::LacrosseReading;
use crate::protocol::frame::LacrosseFrame;

/// Dew point in whole degrees Celsius.
pub fn dew_point(relative_humidity_pct: i32, temperature_c: f64) -> i32 {
    let d = (f64::from(relative_humidity_pct) / 100.0).powf(0.125);
    let d = d * (112.0 + 0.9 * temperature_c) + 0.1 * temperature_c - 112.0;
    d.round() as i32
}

/// Humidex in degrees Celsius, rounded to one decimal place.
pub fn humidex(dew_point_c: i32, temperature_c: f64) -> f64 {
    let dew_k = f64::from(dew_point_c) + 273.15;
    let exponent = 5417.753 * (1.0 / 273.16 - 1.0 / dew_k);
    let humidex = temperature_c + 0.5555 * (6.11 * exponent.exp() - 10.0);
    (humidex * 10.0).round() / 10.0
}

impl From<LacrosseFrame> for LacrosseReading {
    fn from(frame: LacrosseFrame) -> Self {
        let dew_point_c = dew_point(frame.relative_humidity_pct, frame.temperature_c);
        let humidex_c = humidex(dew_point_c, frame.temperature_c);
        tracing::debug!(dew_point_c, humidex_c, "Derived La Crosse metrics");

        LacrosseReading {
            station_id: frame.station_id,
            temperature_c: frame.temperature_c,
            relative_humidity_pct: frame.relative_humidity_pct,
            wind_speed_kmh: frame.wind_speed_kmh,
            wind_direction_deg: frame.wind_direction_deg,
            rainfall_mm: frame.rainfall_mm,
            dew_point_c,
            humidex_c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_values() {
        let d = dew_point(50, 20.0);
        assert_eq!(d, 9);
        assert!((humidex(d, 20.0) - 20.8).abs() < 0.1);

        let d = dew_point(80, 30.0);
        assert_eq!(d, 26);
        assert!((humidex(d, 30.0) - 43.5).abs() < 0.1);
    }

    #[test]
    fn test_below_freezing() {
        let d = dew_point(30, -5.0);
        assert_eq!(d, -20);
        assert!((humidex(d, -5.0) - (-9.8)).abs() < 0.1);
    }

    #[test]
    fn test_saturated_air_dew_point_equals_temperature() {
        assert_eq!(dew_point(100, 15.0), 15);
    }

    #[test]
    fn test_reading_from_frame() {
        let reading = LacrosseReading::from(LacrosseFrame {
            station_id: 1,
            temperature_c: 20.0,
            relative_humidity_pct: 50,
            wind_speed_kmh: 3.5,
            wind_direction_deg: 90,
            rainfall_mm: 0,
        });
        assert_eq!(reading.dew_point_c, 9);
        assert!((reading.humidex_c - 20.8).abs() < 0.1);
        assert_eq!(reading.wind_speed_kmh, 3.5);
    }
}
