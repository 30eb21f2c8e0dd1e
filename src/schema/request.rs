//! Raw request types
//!
//! Numeric fields are deliberately wide and signed so that out-of-range input
//! reaches validation and fails with a field-level error instead of a parse
//! error.

use crate::error::FitError;
use crate::types::{Intensity, Sport, SubSport};
use serde::{Deserialize, Serialize};

/// Body of a generate-FIT request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateFitRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub workout: RawWorkout,
    /// Opaque device information, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_profile: Option<serde_json::Value>,
}

impl GenerateFitRequest {
    pub fn from_json(json: &str) -> Result<Self, FitError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Canonical workout body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawWorkout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport: Option<Sport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_sport: Option<SubSport>,
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

/// Unvalidated workout step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub intensity: Intensity,
    #[serde(default)]
    pub duration: RawDuration,
    #[serde(default)]
    pub target: RawTarget,
}

/// Unvalidated step duration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawDuration {
    #[default]
    Open,
    /// Milliseconds
    Time { value: i64 },
    /// Meters
    Distance { value: f64 },
    /// Kilocalories
    Calories { value: i64 },
    /// Indices of earlier steps to repeat
    Repeat { count: i64, steps: Vec<i64> },
}

/// Unvalidated step target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawTarget {
    #[default]
    Open,
    HeartRateZone { zone: i64 },
    PowerZone { zone: i64 },
    /// Revolutions per minute
    Cadence { low: i64, high: i64 },
    /// Meters per second
    Speed { low: f64, high: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_request() {
        let req = GenerateFitRequest::from_json(r#"{"title": "Tempo", "workout": {}}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("Tempo"));
        assert!(req.workout.steps.is_empty());
        assert!(req.workout.sport.is_none());
        assert!(req.device_profile.is_none());
    }

    #[test]
    fn test_parse_tagged_steps() {
        let json = r#"{
            "workout": {
                "sport": "running",
                "steps": [
                    {"name": "Warm up", "intensity": "warmup", "duration": {"type": "time", "value": 600000}},
                    {"duration": {"type": "distance", "value": 400.0}, "target": {"type": "heart_rate_zone", "zone": 4}},
                    {"duration": {"type": "repeat", "count": 4, "steps": [1]}}
                ]
            },
            "device_profile": {"model": "fenix"}
        }"#;
        let req = GenerateFitRequest::from_json(json).unwrap();
        let steps = &req.workout.steps;
        assert_eq!(req.workout.sport, Some(Sport::Running));
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].intensity, Intensity::Warmup);
        assert_eq!(steps[0].duration, RawDuration::Time { value: 600_000 });
        assert_eq!(steps[1].intensity, Intensity::Active);
        assert_eq!(steps[1].target, RawTarget::HeartRateZone { zone: 4 });
        assert_eq!(
            steps[2].duration,
            RawDuration::Repeat {
                count: 4,
                steps: vec![1]
            }
        );
        assert_eq!(steps[2].target, RawTarget::Open);
        assert!(req.device_profile.is_some());
    }

    #[test]
    fn test_missing_workout_is_rejected() {
        let err = GenerateFitRequest::from_json(r#"{"title": "x"}"#).unwrap_err();
        assert!(matches!(err, FitError::Json(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unknown_duration_type_is_rejected() {
        let json = r#"{"workout": {"steps": [{"duration": {"type": "laps", "value": 3}}]}}"#;
        assert!(GenerateFitRequest::from_json(json).is_err());
    }
}
