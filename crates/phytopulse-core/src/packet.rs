use chrono::{Local, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::profile::ProfileDetails;

pub const SIMULATED_LABEL: &str = "Simulated";
pub const SIMULATED_ALERT: &str = "Simulated data running in Render ☁️";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlantId {
    #[serde(rename = "PP-SIM-001")]
    Simulated,
    #[serde(rename = "PP-REAL-001")]
    Replayed,
}

/// One telemetry packet as served to clients. Numeric readings are pre-formatted strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlantPacket {
    pub plant_id: PlantId,
    pub signal_strength: String,
    pub electrical_activity: String,
    pub moisture: String,
    pub temperature: String,
    pub emotion: String,
    pub signal_state: String,
    pub health_status: String,
    pub predicted_state: String,
    pub emotion_label: String,
    pub alert_message: String,
    pub timestamp: String,
}

/// Raw readings before formatting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readings {
    pub signal_strength: f64,
    pub electrical_activity: f64,
    pub moisture: f64,
    pub temperature: f64,
}

impl PlantPacket {
    #[must_use]
    pub fn assemble(
        plant_id: PlantId,
        readings: Readings,
        profile: ProfileDetails,
        emotion_label: String,
        alert_message: &str,
        timestamp: String,
    ) -> Self {
        Self {
            plant_id,
            signal_strength: to_fixed(readings.signal_strength, 2),
            electrical_activity: to_fixed(readings.electrical_activity, 3),
            moisture: to_fixed(readings.moisture, 1),
            temperature: to_fixed(readings.temperature, 1),
            emotion: profile.emotion.to_string(),
            signal_state: profile.signal_state.to_string(),
            health_status: profile.health_status.to_string(),
            predicted_state: profile.predicted_state.to_string(),
            emotion_label,
            alert_message: alert_message.to_string(),
            timestamp,
        }
    }
}

/// Digits inspected past the requested precision when looking for an exact tie.
const TIE_DIGITS: usize = 30;

/// Fixed-point formatting that rounds exact ties away from zero.
///
/// `format!("{:.N}")` rounds ties to even, so `0.625` would become `0.62`; readings
/// are published as `0.63`.
#[must_use]
pub fn to_fixed(value: f64, places: usize) -> String {
    let exact = format!("{:.*}", places + TIE_DIGITS, value.abs());
    let tail = &exact[exact.len() - TIE_DIGITS..];
    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|digit| digit == b'0');
    if !is_tie {
        return format!("{value:.places$}");
    }

    let scale = 10_f64.powi(i32::try_from(places).unwrap_or(i32::MAX));
    let rounded = ((value.abs() * scale).ceil() / scale).copysign(value);
    format!("{rounded:.places$}")
}

/// Source of packet timestamps.
pub trait Clock: Send {
    fn time_of_day(&self) -> NaiveTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn time_of_day(&self) -> NaiveTime {
        Local::now().time()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveTime);

impl Clock for FixedClock {
    fn time_of_day(&self) -> NaiveTime {
        self.0
    }
}

/// Formats a time of day like `3:07:09 PM`.
#[must_use]
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%-I:%M:%S %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::StateProfile;

    #[test]
    fn time_of_day_uses_twelve_hour_clock() {
        let afternoon = NaiveTime::from_hms_opt(15, 7, 9).expect("valid time");
        assert_eq!(format_time_of_day(afternoon), "3:07:09 PM");
        let midnight = NaiveTime::from_hms_opt(0, 0, 1).expect("valid time");
        assert_eq!(format_time_of_day(midnight), "12:00:01 AM");
    }

    #[test]
    fn readings_are_formatted_with_fixed_precision() {
        let packet = PlantPacket::assemble(
            PlantId::Replayed,
            Readings {
                signal_strength: 2.5,
                electrical_activity: 1.0,
                moisture: 57.25,
                temperature: 21.04,
            },
            StateProfile::Calm.details(),
            "calm".to_string(),
            StateProfile::Calm.details().alert_message,
            "9:00:00 AM".to_string(),
        );

        assert_eq!(packet.signal_strength, "2.50");
        assert_eq!(packet.electrical_activity, "1.000");
        assert_eq!(packet.moisture, "57.3");
        assert_eq!(packet.temperature, "21.0");
        assert_eq!(packet.predicted_state, "Calm");
        assert_eq!(packet.plant_id, PlantId::Replayed);
    }

    #[test]
    fn exact_ties_round_up() {
        assert_eq!(to_fixed(0.625, 2), "0.63");
        assert_eq!(to_fixed(0.25, 1), "0.3");
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(0.0625, 3), "0.063");
        assert_eq!(to_fixed(-0.625, 2), "-0.63");
    }

    #[test]
    fn near_ties_keep_their_binary_value() {
        // 1.005 is stored slightly below the tie, as is 0.145.
        assert_eq!(to_fixed(1.005, 2), "1.00");
        assert_eq!(to_fixed(0.145, 2), "0.14");
        assert_eq!(to_fixed(4.999_92, 2), "5.00");
        assert_eq!(to_fixed(0.0, 3), "0.000");
    }

    #[test]
    fn packet_serializes_with_camel_case_keys() {
        let packet = PlantPacket::assemble(
            PlantId::Simulated,
            Readings {
                signal_strength: 0.0,
                electrical_activity: 0.0,
                moisture: 50.0,
                temperature: 25.0,
            },
            StateProfile::Normal.details(),
            SIMULATED_LABEL.to_string(),
            SIMULATED_ALERT,
            "1:00:00 PM".to_string(),
        );

        let json = serde_json::to_value(&packet).expect("packet should serialize");
        assert_eq!(json["plantId"], "PP-SIM-001");
        assert_eq!(json["emotionLabel"], "Simulated");
        assert_eq!(json["signalStrength"], "0.00");
        assert_eq!(json["electricalActivity"], "0.000");
        assert_eq!(json["healthStatus"], "Healthy");
        assert_eq!(json["timestamp"], "1:00:00 PM");
        assert_eq!(json.as_object().map(serde_json::Map::len), Some(12));
    }
}
