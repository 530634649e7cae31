use anyhow::Result;
use clap::Parser;
use jscr::{JscrConfig, JscrOrchestrator};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "jscr")]
#[command(about = "Keeps one ffmpeg recorder running per IP camera")]
#[command(version)]
#[command(long_about = "Supervises one ffmpeg process per configured RTSP camera, \
restarting recorders that die and cycling them every hour so output is split into \
fresh segment files. Stop it with Ctrl+C or SIGTERM; running recorders are not \
signalled on exit.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = jscr::config::DEFAULT_CONFIG_FILE, help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting recorders")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print a sample configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to daily rolling files in this directory
    #[arg(long, value_name = "DIR", help = "Directory for daily rolling log files")]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let log_guard = init_logging(&args)?;

    info!("Starting jscr v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match JscrConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Fatal error reading configuration: {}", e);
            eprintln!("✗ Fatal error reading configuration: {}", e);
            drop(log_guard);
            std::process::exit(1);
        }
    };

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let mut orchestrator = JscrOrchestrator::new(config);

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("Supervisor error: {}", e);
        e
    })?;

    info!("jscr exited with code: {}", exit_code);
    drop(log_guard);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("jscr={}", log_level)));

    let stdout_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer().compact().with_target(false).boxed(),
        Some("pretty") => fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        None => fmt::layer().with_target(args.debug).boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(args.debug).boxed()
        }
    };

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "jscr.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print a sample configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# jscr configuration file");
    println!("# video_duration is in minutes; output_directory and ffmpeg_binary default to \".\" and \"ffmpeg\"");
    println!();
    println!("{}", JscrConfig::sample().to_toml()?);
    Ok(())
}
