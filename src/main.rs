use anyhow::Result;
use clap::Parser;
use scanner_agent::{AgentConfig, ScannerAgent};
use std::path::Path;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "scanner-agent")]
#[command(about = "Device-side agent of the book scanner: camera lifecycle and server registration")]
#[command(version)]
#[command(long_about = "Keeps the device camera acquired while the agent is active, captures \
pictures at the highest supported resolution and announces the device to the scanner server \
with a JSON POST to /scanner.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "scanner-agent.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Override the server host
    #[arg(long, value_name = "HOST", help = "Scanner server host name or address")]
    host: Option<String>,

    /// Override the server port
    #[arg(long, value_name = "PORT", help = "Scanner server port (falls back to 8001 if unparsable)")]
    port: Option<String>,

    /// Run a single resume/capture/notify/pause cycle and exit
    #[arg(long, help = "Capture once, notify the server and exit")]
    once: bool,

    /// Enable keyboard commands
    #[arg(short, long, help = "Enable keyboard commands (SPACE/c capture, p pause, r resume, q quit)")]
    keyboard: bool,

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
    #[arg(long, help = "Validate configuration file and exit without starting the agent")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", help = "Append log output to the given file")]
    log_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let log_guard = init_logging(&args)?;

    info!("Starting scanner agent v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match AgentConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = &args.port {
        config.server.port = Some(port.clone());
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let mut agent = ScannerAgent::new(config).map_err(|e| {
        error!("Failed to create scanner agent: {}", e);
        e
    })?;

    let exit_code = if args.once {
        let summary = agent.run_once().await.map_err(|e| {
            error!("Scanner agent run failed: {}", e);
            e
        })?;
        println!("{}", summary.availability.user_message());
        println!("{}", summary.notification.user_message());
        summary.exit_code()
    } else {
        agent.set_keyboard_enabled(args.keyboard);
        agent.run().await.map_err(|e| {
            error!("Scanner agent error during execution: {}", e);
            e
        })?
    };

    info!("Scanner agent exited with code: {}", exit_code);

    drop(log_guard);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
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
        .unwrap_or_else(|_| EnvFilter::new(format!("scanner_agent={}", log_level)));

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

    let (file_layer, guard) = match &args.log_file {
        Some(log_file) => {
            let path = Path::new(log_file);
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", log_file))?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Scanner agent configuration file");
    println!("# Every value can also be set through SCANNER_AGENT__<SECTION>__<KEY>");
    println!("# [server] port is optional; unparsable values fall back to 8001");
    println!("# [device] manufacturer/model are optional overrides of the detected values");
    println!();
    println!("{}", toml::to_string_pretty(&AgentConfig::default())?);
    Ok(())
}
