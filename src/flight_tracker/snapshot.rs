use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TrackerError;

/// Descriptive fields carried through to notifications untouched.
/// Nothing in detection reads these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightDetails {
    pub aircraft_type: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub altitude_agl_ft: Option<f64>,
    pub engine_type: Option<String>,
    pub engine_model: Option<String>,
    pub engine_count: Option<String>,
    pub engines: Option<String>,
}

/// One flight record from one poll of the telemetry source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightSnapshot {
    /// Stable identity: explicit id/uuid, falling back to callsign
    pub id: String,
    pub callsign: Option<String>,
    pub altitude_ft: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_kts: Option<f64>,
    /// Degrees, normalized to [0, 360)
    pub heading_deg: Option<f64>,
    /// Only set when the source reports it directly
    pub vertical_speed_fpm: Option<i32>,
    pub details: FlightDetails,
}

impl FlightSnapshot {
    /// Minimal snapshot with just an identity, handy for building test data
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Current position if both coordinates are known
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Name to show humans: callsign when present, else the identity
    pub fn display_name(&self) -> &str {
        self.callsign.as_deref().unwrap_or(&self.id)
    }

    /// Parse one row of the active-flights feed.
    ///
    /// Numeric columns are accepted as JSON numbers or numeric strings; anything
    /// else reads as unknown. Only a missing identity makes the row unusable.
    pub fn from_record(record: &Value) -> Result<Self, TrackerError> {
        let obj = record.as_object().ok_or_else(|| {
            TrackerError::MalformedRecord(format!("expected an object, got {}", kind_of(record)))
        })?;

        let callsign = text_field(obj, &["callsign"]);
        let id = text_field(obj, &["id", "uuid"])
            .or_else(|| callsign.clone())
            .ok_or_else(|| TrackerError::MalformedRecord("record has no id, uuid or callsign".to_string()))?;

        let vertical_speed_fpm = number_field(obj, &["vertical_speed_fpm", "vertical_speed"])
            .map(|vs| vs.round() as i32);

        Ok(Self {
            id,
            callsign,
            altitude_ft: number_field(obj, &["altitude"]),
            latitude: number_field(obj, &["latitude", "lat"]).filter(|v| v.abs() <= 90.0),
            longitude: number_field(obj, &["longitude", "lon", "lng"]).filter(|v| v.abs() <= 180.0),
            speed_kts: number_field(obj, &["speed", "ground_speed", "groundspeed"]),
            heading_deg: number_field(obj, &["heading", "track"]).map(|h| h.rem_euclid(360.0)),
            vertical_speed_fpm,
            details: FlightDetails {
                aircraft_type: text_field(obj, &["aircraft_type", "aircraft"]),
                origin: text_field(obj, &["origin"]),
                destination: text_field(obj, &["destination"]),
                altitude_agl_ft: number_field(obj, &["altitude_agl"]),
                engine_type: text_field(obj, &["engine_type"]),
                engine_model: text_field(obj, &["engine_model"]),
                engine_count: text_field(obj, &["engine_count"]),
                engines: text_field(obj, &["engines"]),
            },
        })
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// First key holding a finite number (or a string that parses as one)
fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

/// First key holding a non-empty string or a number rendered as text
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefers_explicit_id_over_callsign() {
        let snapshot = FlightSnapshot::from_record(&json!({
            "id": "f-1",
            "callsign": "DAL123",
            "altitude": 35000,
        }))
        .unwrap();
        assert_eq!(snapshot.id, "f-1");
        assert_eq!(snapshot.callsign.as_deref(), Some("DAL123"));
        assert_eq!(snapshot.altitude_ft, Some(35000.0));
    }

    #[test]
    fn test_falls_back_to_uuid_then_callsign() {
        let by_uuid = FlightSnapshot::from_record(&json!({"uuid": "abc", "callsign": "X"})).unwrap();
        assert_eq!(by_uuid.id, "abc");

        let by_callsign = FlightSnapshot::from_record(&json!({"callsign": "UAL9"})).unwrap();
        assert_eq!(by_callsign.id, "UAL9");
    }

    #[test]
    fn test_numeric_id_is_accepted() {
        let snapshot = FlightSnapshot::from_record(&json!({"id": 42})).unwrap();
        assert_eq!(snapshot.id, "42");
    }

    #[test]
    fn test_missing_identity_is_malformed() {
        let err = FlightSnapshot::from_record(&json!({"altitude": 1000, "callsign": "  "}));
        assert!(matches!(err, Err(TrackerError::MalformedRecord(_))));

        let err = FlightSnapshot::from_record(&json!("DAL123"));
        assert!(matches!(err, Err(TrackerError::MalformedRecord(_))));
    }

    #[test]
    fn test_numeric_strings_and_junk_values() {
        let snapshot = FlightSnapshot::from_record(&json!({
            "id": "f-2",
            "altitude": "12000.5",
            "latitude": "40.1",
            "longitude": -74.2,
            "speed": "fast",
            "heading": -90,
            "vertical_speed": "-1500.4",
        }))
        .unwrap();
        assert_eq!(snapshot.altitude_ft, Some(12000.5));
        assert_eq!(snapshot.position(), Some((40.1, -74.2)));
        assert_eq!(snapshot.speed_kts, None);
        assert_eq!(snapshot.heading_deg, Some(270.0));
        assert_eq!(snapshot.vertical_speed_fpm, Some(-1500));
    }

    #[test]
    fn test_out_of_range_coordinates_are_unknown() {
        let snapshot =
            FlightSnapshot::from_record(&json!({"id": "f", "latitude": 123.0, "longitude": 10.0}))
                .unwrap();
        assert_eq!(snapshot.latitude, None);
        assert_eq!(snapshot.position(), None);
    }

    #[test]
    fn test_passthrough_details() {
        let snapshot = FlightSnapshot::from_record(&json!({
            "callsign": "BAW1",
            "aircraft": "B77W",
            "origin": "EGLL",
            "destination": "KJFK",
            "engine_count": 2,
            "engine_model": "GE90-115B",
        }))
        .unwrap();
        assert_eq!(snapshot.details.aircraft_type.as_deref(), Some("B77W"));
        assert_eq!(snapshot.details.origin.as_deref(), Some("EGLL"));
        assert_eq!(snapshot.details.engine_count.as_deref(), Some("2"));
        assert_eq!(snapshot.display_name(), "BAW1");
    }
}
