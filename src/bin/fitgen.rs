//! fitgen - Command-line interface for workout-fit
//!
//! Commands:
//! - encode: Turn a workout request into a .fit file
//! - validate: Check a workout request without encoding it
//! - inspect: Decode a .fit file and print its messages

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use workout_fit::decoder::FitFile;
use workout_fit::{FitConfig, FitDecoder, FitProcessor, GenerateFitRequest, PRODUCER_NAME, VERSION};

/// fitgen - Generate FIT workout files for wearable devices
#[derive(Parser)]
#[command(name = "fitgen")]
#[command(version = VERSION)]
#[command(about = "Encode structured workouts as FIT files", long_about = None)]
struct Cli {
    /// Encoder configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a workout request into a .fit file
    Encode {
        /// Request JSON file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file or directory (use - for stdout); defaults to a name derived from the title
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a workout request without encoding it
    Validate {
        /// Request JSON file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a .fit file and print its messages
    Inspect {
        /// FIT file to decode
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FitCliError> {
    let processor = load_processor(cli.config.as_deref())?;

    match cli.command {
        Commands::Encode { input, output } => cmd_encode(&processor, &input, output.as_deref()),
        Commands::Validate { input, json } => cmd_validate(&processor, &input, json),
        Commands::Inspect { input, json } => cmd_inspect(&input, json),
    }
}

fn load_processor(config: Option<&Path>) -> Result<FitProcessor, FitCliError> {
    let config = match config {
        Some(path) => FitConfig::from_json(&fs::read_to_string(path)?)?,
        None => FitConfig::default(),
    };
    Ok(FitProcessor::new(config)?)
}

fn read_input(input: &Path) -> Result<String, FitCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_encode(
    processor: &FitProcessor,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), FitCliError> {
    let request = GenerateFitRequest::from_json(&read_input(input)?)?;
    let download = processor.process_request(&request)?;

    match output {
        Some(path) if path.to_string_lossy() == "-" => {
            if atty::is(atty::Stream::Stdout) {
                return Err(FitCliError::StdoutIsTerminal);
            }
            let mut stdout = io::stdout();
            stdout.write_all(&download.bytes)?;
            stdout.flush()?;
        }
        Some(path) if path.is_dir() => {
            let target = path.join(&download.filename);
            fs::write(&target, &download.bytes)?;
            eprintln!("Wrote {} ({} bytes)", target.display(), download.bytes.len());
        }
        Some(path) => {
            fs::write(path, &download.bytes)?;
            eprintln!("Wrote {} ({} bytes)", path.display(), download.bytes.len());
        }
        None => {
            fs::write(&download.filename, &download.bytes)?;
            eprintln!("Wrote {} ({} bytes)", download.filename, download.bytes.len());
        }
    }

    Ok(())
}

fn cmd_validate(processor: &FitProcessor, input: &Path, json: bool) -> Result<(), FitCliError> {
    let request = GenerateFitRequest::from_json(&read_input(input)?)?;

    let report = match processor.validate_request(&request) {
        Ok(workout) => ValidationReport {
            valid: true,
            title: Some(workout.title().to_string()),
            num_steps: Some(workout.num_steps()),
            filename: Some(workout_fit::safe_filename(
                request.title.as_deref(),
                &processor.config().default_filename,
            )),
            error: None,
        },
        Err(e) => ValidationReport {
            valid: false,
            title: None,
            num_steps: None,
            filename: None,
            error: Some(e.to_string()),
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        if report.valid {
            println!("Title:    {}", report.title.as_deref().unwrap_or_default());
            println!("Steps:    {}", report.num_steps.unwrap_or_default());
            println!("Filename: {}", report.filename.as_deref().unwrap_or_default());
        } else {
            println!("Invalid: {}", report.error.as_deref().unwrap_or_default());
        }
    }

    if report.valid {
        Ok(())
    } else {
        Err(FitCliError::ValidationFailed)
    }
}

fn cmd_inspect(input: &Path, json: bool) -> Result<(), FitCliError> {
    let bytes = fs::read(input)?;
    let file = FitDecoder::decode(&bytes)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&file)?);
    } else {
        print_file(&file);
    }
    Ok(())
}

fn print_file(file: &FitFile) {
    println!("FIT File");
    println!("========");
    println!("Producer: {} {}", PRODUCER_NAME, VERSION);
    println!(
        "Header:   {} bytes, protocol {:#04x}, profile {}",
        file.header.header_size, file.header.protocol_version, file.header.profile_version
    );
    println!("Data:     {} bytes, CRC {:#06x}", file.header.data_size, file.crc);
    println!("\nMessages:");

    for message in &file.messages {
        let name = message.kind.map(|k| k.as_str()).unwrap_or("unknown");
        println!("  {} (global {})", name, message.global);
        for field in &message.fields {
            let label = field
                .name
                .map(str::to_string)
                .unwrap_or_else(|| format!("field_{}", field.number));
            match &field.value {
                Some(value) => println!("    {}: {}", label, serde_json::to_string(value).unwrap_or_default()),
                None => println!("    {}: -", label),
            }
        }
    }
}

// Error types

#[derive(Debug)]
enum FitCliError {
    Io(io::Error),
    Fit(workout_fit::FitError),
    Json(serde_json::Error),
    ValidationFailed,
    StdoutIsTerminal,
}

impl From<io::Error> for FitCliError {
    fn from(e: io::Error) -> Self {
        FitCliError::Io(e)
    }
}

impl From<workout_fit::FitError> for FitCliError {
    fn from(e: workout_fit::FitError) -> Self {
        FitCliError::Fit(e)
    }
}

impl From<serde_json::Error> for FitCliError {
    fn from(e: serde_json::Error) -> Self {
        FitCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FitCliError> for CliError {
    fn from(e: FitCliError) -> Self {
        match e {
            FitCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FitCliError::Fit(e) if e.is_client_error() => CliError {
                code: "INVALID_WORKOUT".to_string(),
                message: e.to_string(),
                hint: Some("Run 'fitgen validate' for details".to_string()),
            },
            FitCliError::Fit(workout_fit::FitError::Decode(msg)) => CliError {
                code: "DECODE_ERROR".to_string(),
                message: msg,
                hint: Some("Input is not a FIT file this tool can read".to_string()),
            },
            FitCliError::Fit(e) => {
                tracing::error!(error = %e, "encoding failed");
                CliError {
                    code: "ENCODE_ERROR".to_string(),
                    message: "Failed to generate FIT file".to_string(),
                    hint: Some("Re-run with RUST_LOG=debug for details".to_string()),
                }
            }
            FitCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FitCliError::ValidationFailed => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: "Workout request failed validation".to_string(),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            FitCliError::StdoutIsTerminal => CliError {
                code: "STDOUT_IS_TERMINAL".to_string(),
                message: "Refusing to write binary data to a terminal".to_string(),
                hint: Some("Redirect stdout or pass --output <file>".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    valid: bool,
    title: Option<String>,
    num_steps: Option<usize>,
    filename: Option<String>,
    error: Option<String>,
}
