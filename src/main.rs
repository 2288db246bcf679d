use anyhow::Result;
use checkin_kiosk::api::HttpAttendanceApi;
use checkin_kiosk::registration::{semester_options, Registrar, RegistrationForm};
use checkin_kiosk::talk;
use checkin_kiosk::{KioskConfig, KioskOrchestrator};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "checkin")]
#[command(about = "Event check-in kiosk that confirms attendance from scanned QR codes")]
#[command(version)]
#[command(long_about = "A check-in kiosk for talks and events. It watches a camera for \
attendee QR codes, asks the operator to confirm each attendee and records the attendance \
with the remote attendance API. The register command issues attendee QR codes.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "checkin.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, global = true, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, global = true, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, global = true, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the kiosk")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't start components
    #[arg(long, help = "Perform dry run - initialize components but don't start them")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", global = true, help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Write logs to a daily rolling file in this directory instead of stderr
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the check-in kiosk
    Run(RunArgs),
    /// Register an attendee and write their QR code
    Register(RegisterArgs),
}

#[derive(ClapArgs, Debug)]
struct TalkArgs {
    /// Talk code
    #[arg(long)]
    code: Option<String>,

    /// Kiosk link whose query carries `c` or `codigo`
    #[arg(long)]
    link: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    #[command(flatten)]
    talk: TalkArgs,

    /// Use a still image as the camera
    #[arg(long, value_name = "IMAGE")]
    mock_image: Option<PathBuf>,

    /// Disable the operator console and key bindings
    #[arg(long)]
    no_console: bool,
}

#[derive(ClapArgs, Debug)]
struct RegisterArgs {
    #[command(flatten)]
    talk: TalkArgs,

    #[arg(long, default_value = "")]
    name: String,

    #[arg(long, default_value = "")]
    email: String,

    #[arg(long, default_value = "")]
    period: String,

    #[arg(long, default_value = "")]
    profile: String,

    /// One of 1º through 12º
    #[arg(long, default_value = "")]
    semester: String,

    /// Four-digit year
    #[arg(long, default_value = "")]
    graduation_year: String,

    /// Directory for qrcode.png, overriding the configuration
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print!("{}", toml::to_string_pretty(&KioskConfig::default())?);
        return Ok(());
    }

    // Keeps the non-blocking file writer flushing until exit
    let _guard = init_logging(&args)?;

    info!("Starting check-in kiosk v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    // Loading validates too
    let mut config = match KioskConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", args.config);
            config
        }
        Err(e) if args.validate_config => {
            error!("Configuration validation failed: {}", e);
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    match args.command {
        Some(Command::Run(run)) => {
            let exit_code = run_kiosk(config, run, args.dry_run).await?;
            info!("Check-in kiosk exited with code: {}", exit_code);
            std::process::exit(exit_code);
        }
        Some(Command::Register(register)) => {
            if let Some(dir) = &register.output_dir {
                config.registration.output_dir = dir.to_string_lossy().into_owned();
            }
            register_attendee(config, register).await
        }
        None => {
            eprintln!("No command given; try `checkin run --code <CODE>` or `checkin --help`");
            std::process::exit(2);
        }
    }
}

async fn run_kiosk(config: KioskConfig, args: RunArgs, dry_run: bool) -> Result<i32> {
    let talk_code = match talk::resolve_code(args.talk.code.as_deref(), args.talk.link.as_deref()) {
        Ok(code) => Some(code),
        Err(e) => {
            // The kiosk still comes up and shows why it cannot scan
            error!("{}", e);
            None
        }
    };

    let mut orchestrator =
        KioskOrchestrator::from_config(config, talk_code, args.mock_image.as_deref()).map_err(
            |e| {
                error!("Failed to create orchestrator: {}", e);
                e
            },
        )?;
    orchestrator.set_interactive(!args.no_console);

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize kiosk: {}", e);
        e
    })?;

    if dry_run {
        info!("Dry run mode - components initialized but not started");
        println!("✓ Dry run completed successfully - all components initialized");
        return Ok(0);
    }

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start kiosk: {}", e);
        e
    })?;

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("Kiosk error during execution: {}", e);
        e
    })?;
    Ok(exit_code)
}

async fn register_attendee(config: KioskConfig, args: RegisterArgs) -> Result<()> {
    let api = Arc::new(HttpAttendanceApi::new(&config.api)?);
    let registrar = Registrar::new(api, config.registration.clone());

    let code = talk::resolve_code(args.talk.code.as_deref(), args.talk.link.as_deref()).ok();
    let talk = registrar.open(code.as_deref()).await?;

    println!("{}", talk.pill());
    println!("{}", talk.title());
    if let Some(line) = talk.university_line() {
        println!("{}", line);
    }

    let form = RegistrationForm {
        name: args.name,
        email: args.email,
        period: args.period,
        profile: args.profile,
        semester: args.semester,
        graduation_year: args.graduation_year,
    };

    match registrar.submit(&talk, &form).await {
        Ok(outcome) => {
            println!("{}", outcome.message());
            println!("Saved {}", outcome.qr_path.display());
            Ok(())
        }
        Err(e) => {
            error!("Registration failed: {}", e);
            if !semester_options().contains(&form.semester) {
                eprintln!("Semester must be one of: {}", semester_options().join(", "));
            }
            Err(e.into())
        }
    }
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
        .unwrap_or_else(|_| EnvFilter::new(format!("checkin_kiosk={},checkin={}", log_level, log_level)));

    let (writer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "checkin.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (fmt::writer::BoxMakeWriter::new(writer), Some(guard))
        }
        None => (fmt::writer::BoxMakeWriter::new(std::io::stderr), None),
    };
    let to_file = guard.is_some();

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(!to_file)
            .with_target(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(!to_file)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(writer)
                .with_ansi(!to_file)
                .with_target(true)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(guard)
}
