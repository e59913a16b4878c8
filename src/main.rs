// src/main.rs - Command-line front end: open the port, connect, run one action
use clap::{ArgAction, Parser, Subcommand};
use mpy_repl::communication::{NativeSerial, SerialInterface};
use mpy_repl::config::{self, Config};
use mpy_repl::file_manager::FileManager;
use mpy_repl::ReplSession;
use std::path::Path;
use tracing::Level;

const DEFAULT_CONFIG: &str = "mpy.toml";

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Parser)]
#[command(name = "mpy-repl", version, about = "Drive a MicroPython board over its serial REPL")]
struct Cli {
    /// Configuration file (defaults to ./mpy.toml when present)
    #[arg(short, long)]
    config: Option<String>,
    /// Serial port, overrides [device] port
    #[arg(short, long)]
    port: Option<String>,
    /// Baud rate, overrides [device] baud
    #[arg(short, long)]
    baud: Option<u32>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List serial ports on this host
    Ports,
    #[command(flatten)]
    Device(DeviceCommand),
}

/// Commands that need a connected board.
#[derive(Debug, Subcommand)]
enum DeviceCommand {
    /// Show the board's uname() identity
    Info,
    /// List a directory on the board
    Ls {
        #[arg(default_value = "/")]
        dir: String,
    },
    /// Copy a local text file to the board
    Put {
        local: String,
        remote: Option<String>,
    },
    /// Run one Python statement and print its output
    Exec { statement: String },
    /// Reboot the board into its bootloader
    Bootloader,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    // Initialize logging
    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let serial = NativeSerial;
    let Command::Device(command) = &cli.command else {
        for port in serial.available_ports() {
            println!("{}", port);
        }
        return Ok(());
    };

    let config = load_config(&cli)?;
    if config.device.port.is_empty() {
        tracing::error!("No serial port configured");
        return Err("no serial port given; pass --port or set [device] port".into());
    }

    let port = serial
        .open(&config.device.port, config.device.baud)
        .await
        .map_err(|e| {
            tracing::error!("Failed to open '{}': {}", config.device.port, e);
            Box::new(e) as BoxError
        })?;

    let mut session = ReplSession::connect(port, config.repl.clone())
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to {}: {}", config.device.port, e);
            Box::new(e) as BoxError
        })?;

    match command {
        DeviceCommand::Info => match session.device_info() {
            Some(info) => {
                println!("sysname:  {}", info.sysname);
                println!("nodename: {}", info.nodename);
                println!("release:  {}", info.release);
                println!("version:  {}", info.version);
                println!("machine:  {}", info.machine);
            }
            None => println!("MicroPython (version unavailable)"),
        },
        DeviceCommand::Ls { dir } => {
            for name in session.list_files(dir).await? {
                println!("{}", name);
            }
        }
        DeviceCommand::Put { local, remote } => {
            let files = FileManager::new();
            let contents = files.read_upload(local).await?;
            let remote = files.remote_name(local, remote.as_deref());
            session.save_file(&remote, &contents).await?;
            tracing::info!("Copied {} to {}", local, remote);
        }
        DeviceCommand::Exec { statement } => {
            let output = session.exec(statement).await?;
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        DeviceCommand::Bootloader => session.enter_bootloader().await?,
    }

    Ok(())
}

/// Load the config file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<Config, BoxError> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            config::load_config(path)?
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            tracing::info!("Loading configuration from: {}", DEFAULT_CONFIG);
            config::load_config(DEFAULT_CONFIG)?
        }
        None => Config::default(),
    };

    if let Some(port) = &cli.port {
        config.device.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.device.baud = baud;
    }
    Ok(config)
}
