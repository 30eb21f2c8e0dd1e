//! Pipeline orchestration
//!
//! This module provides the public API for workout-fit.
//! It orchestrates the full pipeline from a request to a downloadable FIT file.

use crate::config::FitConfig;
use crate::encoder::FitEncoder;
use crate::error::FitError;
use crate::messages::MessageBuilder;
use crate::normalizer::Normalizer;
use crate::schema::GenerateFitRequest;
use crate::types::Workout;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

/// Canonical file extension of FIT files
pub const FIT_EXTENSION: &str = "fit";

/// Media type of a FIT download
pub const CONTENT_TYPE: &str = "application/octet-stream";

/// Encode a validated workout with the default configuration, stamped now.
///
/// # Example
/// ```ignore
/// let workout = Normalizer::default().normalize(Some("Tempo"), &steps, None)?;
/// let bytes = encode_workout(&workout)?;
/// ```
pub fn encode_workout(workout: &Workout) -> Result<Vec<u8>, FitError> {
    FitProcessor::default().encode(workout)
}

/// Convert a JSON request body into a downloadable FIT file.
///
/// # Arguments
/// * `request_json` - Request body as produced by the workout mapper
///
/// # Returns
/// The encoded file and its sanitized download name
pub fn generate_fit(request_json: String) -> Result<FitDownload, FitError> {
    let request = GenerateFitRequest::from_json(&request_json)?;
    FitProcessor::default().process_request(&request)
}

/// An encoded file ready to hand to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl FitDownload {
    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    /// Value for a `Content-Disposition` header
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// Derive a filesystem-safe download name from an untrusted title.
///
/// Alphanumerics, `-` and `_` are kept; every other character becomes `_`.
pub fn safe_filename(title: Option<&str>, default_name: &str) -> String {
    let trimmed = title.map(str::trim).unwrap_or_default();
    let base = if trimmed.is_empty() { default_name } else { trimmed };
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}.{FIT_EXTENSION}")
}

/// Configured pipeline: normalizer, message builder and encoder.
///
/// Holds no per-request state; one processor can serve any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct FitProcessor {
    config: FitConfig,
    normalizer: Normalizer,
    builder: MessageBuilder,
    encoder: FitEncoder,
}

impl Default for FitProcessor {
    fn default() -> Self {
        Self::build(FitConfig::default())
    }
}

impl FitProcessor {
    /// Create a processor from a configuration
    pub fn new(config: FitConfig) -> Result<Self, FitError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: FitConfig) -> Self {
        Self {
            normalizer: Normalizer::new(&config),
            builder: MessageBuilder::new(&config),
            encoder: FitEncoder::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Validate a request without encoding it
    pub fn validate_request(&self, request: &GenerateFitRequest) -> Result<Workout, FitError> {
        self.normalizer.normalize_request(request)
    }

    /// Validate and encode a request, deriving the download name from its title
    pub fn process_request(&self, request: &GenerateFitRequest) -> Result<FitDownload, FitError> {
        self.process_request_at(request, Utc::now())
    }

    /// Same as [`Self::process_request`] with a fixed creation time
    pub fn process_request_at(
        &self,
        request: &GenerateFitRequest,
        created_at: DateTime<Utc>,
    ) -> Result<FitDownload, FitError> {
        let workout = self.validate_request(request).map_err(|e| {
            debug!(
                workout_id = request.workout_id.as_deref().unwrap_or("-"),
                error = %e,
                "rejected workout request"
            );
            e
        })?;

        let bytes = self.encode_at(&workout, created_at)?;
        let filename = safe_filename(request.title.as_deref(), &self.config.default_filename);

        info!(
            workout_id = request.workout_id.as_deref().unwrap_or("-"),
            filename = %filename,
            steps = workout.num_steps(),
            bytes = bytes.len(),
            "generated FIT file"
        );
        Ok(FitDownload { filename, bytes })
    }

    /// Encode a workout stamped with the current time
    pub fn encode(&self, workout: &Workout) -> Result<Vec<u8>, FitError> {
        self.encode_at(workout, Utc::now())
    }

    /// Encode a workout with a fixed creation time; identical inputs give identical bytes
    pub fn encode_at(&self, workout: &Workout, created_at: DateTime<Utc>) -> Result<Vec<u8>, FitError> {
        let messages = self.builder.build(workout, created_at);
        debug!(
            title = workout.title(),
            messages = messages.len(),
            repeats = workout.steps().iter().filter(|s| s.duration.is_repeat()).count(),
            "built message sequence"
        );

        self.encoder.encode(&messages).map_err(|e| {
            // callers only surface an opaque fault; keep the detail here
            error!(error = %e, title = workout.title(), "FIT encoding failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc;
    use crate::decoder::FitDecoder;
    use crate::header::FileHeader;
    use crate::profile::{file_id, workout, workout_step, MesgNum};
    use crate::schema::{RawDuration, RawStep};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    const INTERVALS: &str = r#"{
        "workout_id": "w-42",
        "title": "Track 6x400",
        "workout": {
            "sport": "running",
            "sub_sport": "track",
            "steps": [
                {"name": "Warm up", "intensity": "warmup", "duration": {"type": "time", "value": 900000}},
                {"name": "400m", "intensity": "active", "duration": {"type": "distance", "value": 400},
                 "target": {"type": "speed", "low": 5.0, "high": 5.5}},
                {"name": "Jog", "intensity": "rest", "duration": {"type": "time", "value": 90000},
                 "target": {"type": "heart_rate_zone", "zone": 2}},
                {"name": "Repeat", "duration": {"type": "repeat", "count": 6, "steps": [1, 2]}},
                {"name": "Cool down", "intensity": "cooldown"}
            ]
        }
    }"#;

    #[test]
    fn test_scenario_empty_request_gets_default_step() {
        let request = GenerateFitRequest::from_json(r#"{"title": "", "workout": {"steps": []}}"#).unwrap();
        let download = FitProcessor::default()
            .process_request_at(&request, created_at())
            .unwrap();
        assert_eq!(download.filename, "workout.fit");

        let file = FitDecoder::decode(&download.bytes).unwrap();
        let steps: Vec<_> = file.messages_of(MesgNum::WorkoutStep).collect();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].text(workout_step::WKT_STEP_NAME), Some("Workout"));
        assert_eq!(steps[0].uint(workout_step::DURATION_TYPE), Some(5));
    }

    #[test]
    fn test_scenario_single_open_step() {
        let request = GenerateFitRequest::from_json(
            r#"{"title": "5K Easy Run", "workout": {"steps": [
                {"intensity": "active", "duration": {"type": "open"}, "target": {"type": "open"}}
            ]}}"#,
        )
        .unwrap();
        let download = FitProcessor::default()
            .process_request_at(&request, created_at())
            .unwrap();
        let bytes = &download.bytes;

        let header = FileHeader::from_bytes(bytes).unwrap();
        assert_eq!(header.data_size as usize, bytes.len() - FileHeader::SIZE - 2);
        let (content, trailer) = bytes.split_at(bytes.len() - 2);
        assert_eq!(crc::checksum(content), u16::from_le_bytes([trailer[0], trailer[1]]));

        let file = FitDecoder::decode(bytes).unwrap();
        let kinds: Vec<_> = file.messages.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Some(MesgNum::FileId),
                Some(MesgNum::Workout),
                Some(MesgNum::WorkoutStep)
            ]
        );
        let summary = &file.messages[1];
        assert_eq!(summary.text(workout::WKT_NAME), Some("5K Easy Run"));
        assert_eq!(summary.uint(workout::NUM_VALID_STEPS), Some(1));
        assert_eq!(
            file.messages[0].uint(file_id::TIME_CREATED),
            Some(1_705_327_200 - 631_065_600)
        );
    }

    #[test]
    fn test_scenario_negative_duration_never_reaches_encoder() {
        let request = GenerateFitRequest::from_json(
            r#"{"workout": {"steps": [{"duration": {"type": "time", "value": -1}}]}}"#,
        )
        .unwrap();
        let err = FitProcessor::default().process_request(&request).unwrap_err();
        assert!(matches!(err, FitError::Range { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_scenario_forward_repeat_reference() {
        let request = GenerateFitRequest::from_json(
            r#"{"workout": {"steps": [
                {"duration": {"type": "repeat", "count": 3, "steps": [1]}},
                {"duration": {"type": "time", "value": 60000}}
            ]}}"#,
        )
        .unwrap();
        let err = FitProcessor::default().process_request(&request).unwrap_err();
        assert!(matches!(err, FitError::Validation(_)));
    }

    #[test]
    fn test_full_workout_roundtrip() {
        let request = GenerateFitRequest::from_json(INTERVALS).unwrap();
        let download = FitProcessor::default()
            .process_request_at(&request, created_at())
            .unwrap();
        assert_eq!(download.filename, "Track_6x400.fit");

        let file = FitDecoder::decode(&download.bytes).unwrap();
        assert_eq!(file.messages.len(), 2 + 5);

        let summary = file.messages_of(MesgNum::Workout).next().unwrap();
        assert_eq!(summary.uint(workout::SPORT), Some(1));
        assert_eq!(summary.uint(workout::SUB_SPORT), Some(4));
        assert_eq!(summary.uint(workout::NUM_VALID_STEPS), Some(5));

        let steps: Vec<_> = file.messages_of(MesgNum::WorkoutStep).collect();
        assert_eq!(steps.len(), 5);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.uint(workout_step::MESSAGE_INDEX), Some(i as u64));
        }
        assert_eq!(steps[1].uint(workout_step::DURATION_VALUE), Some(40_000));
        assert_eq!(steps[1].uint(workout_step::CUSTOM_TARGET_VALUE_LOW), Some(5000));
        assert_eq!(steps[1].uint(workout_step::CUSTOM_TARGET_VALUE_HIGH), Some(5500));
        assert_eq!(steps[2].uint(workout_step::TARGET_VALUE), Some(2));
        assert_eq!(steps[2].uint(workout_step::CUSTOM_TARGET_VALUE_LOW), None);
        assert_eq!(steps[3].uint(workout_step::DURATION_TYPE), Some(6));
        assert_eq!(steps[3].uint(workout_step::DURATION_VALUE), Some(1));
        assert_eq!(steps[3].uint(workout_step::TARGET_VALUE), Some(6));
        assert_eq!(steps[4].uint(workout_step::INTENSITY), Some(3));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let request = GenerateFitRequest::from_json(INTERVALS).unwrap();
        let processor = FitProcessor::default();
        let workout = processor.validate_request(&request).unwrap();
        let a = processor.encode_at(&workout, created_at()).unwrap();
        let b = processor.encode_at(&workout, created_at()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_step_count_matches_workout() {
        let steps: Vec<RawStep> = (0..40)
            .map(|i| RawStep {
                duration: RawDuration::Time { value: 1000 * i },
                ..Default::default()
            })
            .collect();
        let workout = Normalizer::default().normalize(Some("Ladder"), &steps, None).unwrap();
        let bytes = FitProcessor::default().encode_at(&workout, created_at()).unwrap();
        let file = FitDecoder::decode(&bytes).unwrap();
        assert_eq!(
            file.messages_of(MesgNum::WorkoutStep).count(),
            workout.num_steps()
        );
    }

    #[test]
    fn test_truncated_title_decodes_to_prefix() {
        let title = format!("Fartlek {}", "🏃".repeat(20));
        let workout = Normalizer::default().normalize(Some(&title), &[], None).unwrap();
        let bytes = encode_workout(&workout).unwrap();
        let file = FitDecoder::decode(&bytes).unwrap();
        let name = file
            .messages_of(MesgNum::Workout)
            .next()
            .and_then(|m| m.text(workout::WKT_NAME))
            .unwrap()
            .to_string();
        assert!(name.len() <= 50);
        assert!(title.starts_with(&name));
        assert!(!name.contains('\u{FFFD}'));
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename(Some("5K Easy Run!"), "workout"), "5K_Easy_Run_.fit");
        assert_eq!(safe_filename(Some("  "), "workout"), "workout.fit");
        assert_eq!(safe_filename(None, "workout"), "workout.fit");
        assert_eq!(safe_filename(Some("../../etc/passwd"), "workout"), "______etc_passwd.fit");
        assert_eq!(safe_filename(Some("tempo-run_2"), "workout"), "tempo-run_2.fit");
    }

    #[test]
    fn test_download_headers() {
        let download = FitDownload {
            filename: "5K_Easy_Run_.fit".to_string(),
            bytes: vec![],
        };
        assert_eq!(download.content_type(), "application/octet-stream");
        assert_eq!(
            download.content_disposition(),
            "attachment; filename=\"5K_Easy_Run_.fit\""
        );
    }

    #[test]
    fn test_generate_fit_from_json() {
        let download = generate_fit(INTERVALS.to_string()).unwrap();
        assert!(FitDecoder::decode(&download.bytes).is_ok());

        let err = generate_fit("not json".to_string()).unwrap_err();
        assert!(matches!(err, FitError::Json(_)));
    }

    #[test]
    fn test_custom_config() {
        let config = FitConfig {
            serial_number: 99,
            max_string_bytes: 8,
            ..FitConfig::default()
        };
        let processor = FitProcessor::new(config).unwrap();
        let workout = processor
            .normalizer()
            .normalize(Some("Long Sunday Run"), &[], None)
            .unwrap();
        assert_eq!(workout.title(), "Long Sun");

        let bytes = processor.encode_at(&workout, created_at()).unwrap();
        let file = FitDecoder::decode(&bytes).unwrap();
        assert_eq!(file.messages[0].uint(file_id::SERIAL_NUMBER), Some(99));
        assert_eq!(file.messages[1].text(workout::WKT_NAME), Some("Long Sun"));
    }

    #[test]
    fn test_nul_in_title_is_client_error() {
        let request = GenerateFitRequest::from_json(
            r#"{"title": "Tempo\u0000Run", "workout": {"steps": []}}"#,
        )
        .unwrap();
        let err = FitProcessor::default().process_request(&request).unwrap_err();
        assert!(matches!(err, FitError::Validation(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_widest_string_config_encodes() {
        let config = FitConfig {
            max_string_bytes: 254,
            ..FitConfig::default()
        };
        let processor = FitProcessor::new(config).unwrap();
        let title = "T".repeat(300);
        let workout = processor
            .normalizer()
            .normalize(Some(&title), &[], None)
            .unwrap();
        let bytes = processor.encode_at(&workout, created_at()).unwrap();
        let file = FitDecoder::decode(&bytes).unwrap();
        assert_eq!(file.messages[1].text(workout::WKT_NAME), Some("T".repeat(254).as_str()));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = FitConfig {
            max_string_bytes: 0,
            ..FitConfig::default()
        };
        assert!(FitProcessor::new(config).is_err());
    }
}
