use billboard_detector::imaging::{ReduceConfig, RustBackend, reduce_image};
use billboard_detector::workflow::{Cycle, Workflow, WorkflowEvent};
use billboard_detector::{config, output, session, upload};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use tokio::io::AsyncBufReadExt;
use tokio::task::JoinSet;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn version_string() -> &'static str {
    if env!("BUILD_ON_RELEASE_TAG") == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("BUILD_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "billboard-detector")]
#[command(about = "Photograph a billboard and check whether it is permitted where it stands")]
#[command(long_about = "\
Photograph a billboard and check whether it is permitted where it stands

Each capture is shrunk to about two megapixels, tagged with the last known
GPS position, and posted to the analysis server, which answers with a
verdict:

  Authorized: false
  Reason: Billboard is outside any permitted zone

Camera and location sources come from billboard.toml:

  [camera]
  command = [\"libcamera-still\", \"-n\", \"-o\", \"{output}\"]

  [location]
  fix_file = \"/run/gpsd/last-fix.json\"

Run 'billboard-detector gen-config' to generate a documented billboard.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Fixed latitude, overriding the configured location source
    #[arg(long, requires = "lon", allow_hyphen_values = true, global = true)]
    lat: Option<f64>,

    /// Fixed longitude, overriding the configured location source
    #[arg(long, requires = "lat", allow_hyphen_values = true, global = true)]
    lon: Option<f64>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one capture → upload cycle
    Capture,
    /// Interactive shutter: Enter captures, `l` refreshes location, `q` quits
    Run,
    /// Reduce an image without uploading it
    Reduce {
        image: PathBuf,
        /// Where to write the reduced copy (defaults to the image's directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Verify camera, location, and server settings without capturing
    Check,
    /// Print a stock billboard.toml with all options documented
    GenConfig,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "billboard_detector=warn",
        1 => "billboard_detector=info",
        _ => "billboard_detector=debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn load(cli: &Cli) -> Result<config::ClientConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.config)?;
    if let (Some(lat), Some(lon)) = (cli.lat, cli.lon) {
        config.location.latitude = Some(lat);
        config.location.longitude = Some(lon);
        config.location.fix_file = None;
        config.validate()?;
    }
    Ok(config)
}

fn spawn_printer(rx: Receiver<WorkflowEvent>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for event in rx {
            for line in output::format_workflow_event(&event) {
                println!("{}", line);
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Capture => {
            let config = load(&cli)?;
            let (tx, rx) = std::sync::mpsc::channel();
            let workflow = match session::open(&config, tx) {
                Ok(w) => w,
                Err(e) => {
                    output::print_session_error(&e);
                    return Ok(ExitCode::from(2));
                }
            };
            let printer = spawn_printer(rx);

            workflow.refresh_location().await?;
            let cycle = workflow.trigger().await;

            drop(workflow);
            printer.join().map_err(|_| "output thread panicked")?;
            if !cycle.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Run => {
            let config = load(&cli)?;
            let (tx, rx) = std::sync::mpsc::channel();
            let workflow = match session::open(&config, tx) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    output::print_session_error(&e);
                    return Ok(ExitCode::from(2));
                }
            };
            let printer = spawn_printer(rx);

            println!("Enter: capture   l: refresh location   q: quit");
            workflow.refresh_location();
            let cycles = shutter_loop(&workflow).await?;

            drop(workflow);
            printer.join().map_err(|_| "output thread panicked")?;
            tracing::info!("{cycles} capture cycles finished");
        }
        Command::Reduce { image, output_dir } => {
            let config = load(&cli)?;
            let output_dir = match output_dir {
                Some(dir) => dir.clone(),
                None => parent_dir(image),
            };
            std::fs::create_dir_all(&output_dir)?;
            let reduce_config: ReduceConfig = config.reduction.to_reduce_config();
            let reduction = reduce_image(&RustBackend::new(), image, &output_dir, &reduce_config);
            output::print_reduction(&reduction);
            println!("{}", reduction.path().display());
        }
        Command::Check => {
            let config = load(&cli)?;
            let (tx, _rx) = std::sync::mpsc::channel();
            let workflow = match session::open(&config, tx) {
                Ok(w) => w,
                Err(e) => {
                    output::print_session_error(&e);
                    return Ok(ExitCode::from(2));
                }
            };
            let endpoint = upload::analyze_url(&config.server.base_url)?;
            for line in output::format_check(&config, workflow.output_dir(), endpoint.as_str()) {
                println!("{}", line);
            }
            println!("==> Ready");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Read shutter presses from stdin until `q` or end of input.
///
/// Each press runs its cycle concurrently with further input so a press
/// during an in-flight cycle is seen (and refused). Returns the number of
/// cycles that ran to completion.
async fn shutter_loop(workflow: &Arc<Workflow>) -> std::io::Result<usize> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut cycles = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "q" | "quit" => break,
            "l" => {
                workflow.refresh_location();
            }
            "" | "c" => {
                let workflow = Arc::clone(workflow);
                cycles.spawn(async move { workflow.trigger().await });
            }
            other => println!("Unknown command: {other}"),
        }
    }

    // In-flight uploads run to completion
    let mut finished = 0;
    while let Some(cycle) = cycles.join_next().await {
        if cycle.is_ok_and(|c| !matches!(c, Cycle::Busy)) {
            finished += 1;
        }
    }
    Ok(finished)
}

fn parent_dir(image: &Path) -> PathBuf {
    match image.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
