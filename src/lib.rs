//! workout-fit - Deterministic FIT workout file encoder
//!
//! workout-fit turns a structured workout description into a binary FIT file
//! that wearable devices accept, through a one-way pipeline:
//! request validation → message building → binary encoding.
//!
//! ## Modules
//!
//! - **Workout Model**: [`normalizer`] validates raw input into an immutable [`Workout`]
//! - **Message Builder**: [`messages`] lays out `file_id`, `workout` and `workout_step` messages
//! - **Binary Encoder**: [`encoder`] writes header, definitions, data records and CRC
//! - **Decoder**: [`decoder`] reads back the encoder's output for inspection

pub mod config;
pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod header;
pub mod messages;
pub mod normalizer;
pub mod pipeline;
pub mod profile;
pub mod schema;
pub mod types;

pub use config::FitConfig;
pub use decoder::{FitDecoder, FitFile};
pub use encoder::FitEncoder;
pub use error::FitError;
pub use messages::MessageBuilder;
pub use normalizer::Normalizer;
pub use pipeline::{encode_workout, generate_fit, safe_filename, FitDownload, FitProcessor};
pub use schema::GenerateFitRequest;
pub use types::{Workout, WorkoutStep};

/// Crate version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "workout-fit";
