use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use safevision::analysis::{GeminiClient, GeminiConfig, HazardAnalyzer};
use safevision::capture::{CaptureMode, MockCamera, MediaAcquirer, format_elapsed};
use safevision::credential::{CredentialGate, EnvKeyChooser};
use safevision::report::{InspectionReport, render_error, render_text};
use safevision::session::InspectionSession;
use tracing_subscriber::EnvFilter;

/// SafeVision - workplace hazard inspection with a vision model
#[derive(Parser, Debug)]
#[command(
    name = "safevision",
    about = "Analyze site images and clips for occupational safety hazards",
    after_help = "ENVIRONMENT VARIABLES:\n\
        SAFEVISION_API_KEY           API key (also GEMINI_API_KEY, API_KEY)\n\
        SAFEVISION_GEMINI_ENDPOINT   Gemini REST base URL\n\
        SAFEVISION_GEMINI_MODEL      Gemini model name\n\
        SAFEVISION_REQUEST_TIMEOUT   Analysis request timeout (seconds)\n\
        SAFEVISION_CAMERA_WIDTH      Ideal camera width\n\
        SAFEVISION_CAMERA_HEIGHT     Ideal camera height\n\
        SAFEVISION_LOG               Log filter (e.g. debug, safevision=trace)"
)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze an image or video file for hazards
    Analyze {
        /// Path to the image or video
        file: PathBuf,

        /// Gemini model name
        #[arg(long, env = "SAFEVISION_GEMINI_MODEL")]
        model: Option<String>,

        /// Gemini REST base URL
        #[arg(long, env = "SAFEVISION_GEMINI_ENDPOINT")]
        endpoint: Option<String>,

        /// Extra site context appended to the prompt
        #[arg(long)]
        context: Option<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a clip from the mock camera, optionally analyzing it
    Record {
        /// Recording length in seconds
        #[arg(long, short = 's', default_value = "3")]
        seconds: u64,

        /// Write the recorded clip to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Send the clip for analysis
        #[arg(long)]
        analyze: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that an API key is selected and can reach the model
    CheckKey,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("SAFEVISION_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Startup check, then one selection attempt if no key is selected.
async fn select_credential() -> Result<CredentialGate, Box<dyn Error>> {
    let gate = CredentialGate::init(Arc::new(EnvKeyChooser)).await;
    if !gate.is_satisfied() {
        gate.request_credential().await;
        gate.verify().await;
    }
    gate.ensure_satisfied()?;
    Ok(gate)
}

fn gemini_client(
    model: Option<String>,
    endpoint: Option<String>,
    context: Option<String>,
) -> Result<GeminiClient, Box<dyn Error>> {
    let mut config = GeminiConfig::default();
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint;
    }
    if let Some(model) = model {
        config = config.model(model);
    }
    if let Some(context) = context {
        config = config.site_context(context);
    }
    Ok(GeminiClient::new(config)?)
}

fn print_outcome(session: &InspectionSession, json: bool) -> Result<bool, Box<dyn Error>> {
    let report = InspectionReport::from_state(session.media(), session.analysis());
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(result) = &report.result {
        print!("{}", render_text(result));
    } else if let Some(error) = &report.error {
        eprintln!("{}", render_error(error));
    }
    Ok(report.success)
}

async fn run_analyze(
    file: &Path,
    analyzer: Arc<dyn HazardAnalyzer>,
    gate: CredentialGate,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let acquirer = MediaAcquirer::new(Arc::new(MockCamera::default()));
    let mut session = InspectionSession::new(gate, acquirer, analyzer);

    session.accept_path(file)?;
    if session.media().is_some() {
        if !json {
            eprintln!("Analyzing {}...", file.display());
        }
        session.analyze().await?;
    }

    if !print_outcome(&session, json)? {
        return Err(format!("analysis of {} failed", file.display()).into());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Some(Commands::Analyze {
            file,
            model,
            endpoint,
            context,
            json,
        }) => {
            let gate = select_credential().await?;
            let client = gemini_client(model, endpoint, context)?;
            run_analyze(&file, Arc::new(client), gate, json).await?;
        }

        Some(Commands::Record {
            seconds,
            output,
            analyze,
            json,
        }) => {
            let gate = if analyze {
                select_credential().await?
            } else {
                // Recording alone makes no paid call.
                CredentialGate::new(Arc::new(EnvKeyChooser))
            };
            let client = gemini_client(None, None, None)?;
            let acquirer = MediaAcquirer::new(Arc::new(MockCamera::default()));
            let mut session = InspectionSession::new(gate, acquirer, Arc::new(client));

            session.switch_mode(CaptureMode::Video).await?;
            if let Some(error) = session.analysis().error() {
                return Err(render_error(error).into());
            }
            if !session.start_recording()? {
                return Err("camera did not start recording".into());
            }

            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.tick().await;
            for _ in 0..seconds {
                ticker.tick().await;
                session.poll_recording();
                if !json {
                    if let Some(badge) = session.recording_badge() {
                        eprint!("\rREC {}", badge);
                    }
                }
            }
            session.stop_recording()?;
            if !json {
                eprintln!(
                    "\rRecorded {}",
                    format_elapsed(session.acquirer().elapsed_seconds())
                );
            }

            let Some(media) = session.media() else {
                return Err("recording produced no media".into());
            };
            if let Some(path) = &output {
                std::fs::write(path, &media.data)?;
                if !json {
                    println!("Saved clip: {} ({} bytes)", path.display(), media.len());
                }
            }

            if analyze {
                session.analyze().await?;
                if !print_outcome(&session, json)? {
                    return Err("analysis of the recording failed".into());
                }
            } else if json {
                print_outcome(&session, json)?;
            }
        }

        Some(Commands::CheckKey) => {
            select_credential().await?;
            let client = gemini_client(None, None, None)?;
            match client.check_model().await {
                Ok(()) => println!("API key OK for model {}", client.config().model),
                Err(e) => {
                    eprintln!("{}", e.kind().user_message());
                    return Err(e.into());
                }
            }
        }

        None => {
            println!("SafeVision - workplace hazard inspection with a vision model");
            println!();
            println!("Usage: safevision <COMMAND>");
            println!();
            println!("Commands:");
            println!("  analyze    Analyze an image or video file for hazards");
            println!("  record     Record a clip from the mock camera");
            println!("  check-key  Check the API key against the configured model");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}
