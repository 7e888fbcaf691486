use anyhow::Result;
use camflow::{CamflowConfig, CamflowOrchestrator, LensFacing};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "camflow")]
#[command(about = "Camera capture session controller with still capture and recording")]
#[command(version)]
#[command(long_about = "Drives a camera through open, configure and stream phases, takes \
still pictures into a storage directory and toggles video recording. Runs against a simulated \
camera platform configured in the TOML file.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "camflow.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without opening a camera")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// List cameras and exit
    #[arg(long, help = "List the cameras the platform exposes and exit")]
    list_devices: bool,

    /// Override the lens facing to open
    #[arg(long, value_name = "FACING", help = "Camera to open: back, front or external")]
    facing: Option<LensFacing>,

    /// Disable keyboard triggers
    #[arg(long, help = "Do not read capture and recording keys from the terminal")]
    no_keyboard: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting camflow v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match CamflowConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(facing) = args.facing {
        config.camera.facing = facing;
    }
    if args.no_keyboard {
        config.system.keyboard = false;
    }

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    if args.list_devices {
        for device in CamflowOrchestrator::list_devices(&config)? {
            println!(
                "{}\t{}\tsensor {}°\tmax still {}",
                device.id, device.facing, device.sensor_orientation_degrees, device.max_still_size
            );
        }
        return Ok(());
    }

    let mut orchestrator = CamflowOrchestrator::new(config).map_err(|e| {
        error!("Failed to create orchestrator: {}", e);
        e
    })?;

    orchestrator.initialize().await?;

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start camflow: {}", e);
        e
    })?;

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    info!("camflow exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("camflow={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# camflow configuration file");
    println!("# Every option with its default value. Environment variables of the form");
    println!("# CAMFLOW_<SECTION>__<KEY> override file values.");
    println!();
    println!("{}", toml::to_string_pretty(&CamflowConfig::default())?);
    Ok(())
}
