use at_probe::config::{Config, ConfigError, ConfigLoader, LogFormat, LoggingConfig};
use at_probe::engine::{CommandEngine, LineEnding};
use at_probe::error::{AppError, AppResult};
use at_probe::port::{list_ports, PortConfiguration, SyncSerialPort};
use at_probe::report::Console;
use at_probe::scenario::{self, Outcome, Probe};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "at-probe",
    version,
    about = "Diagnostic harness for ESP32 modems running ESP-AT firmware.",
    long_about = "Sends AT commands over a serial link, classifies each reply by its OK/ERROR \
                  terminator and reports whether the module is ready for OTA updates and MQTT. \
                  Exits 0 when the chosen check passes and 1 otherwise."
)]
struct Args {
    /// Configuration file (default: AT_PROBE_CONFIG, ./at-probe.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial port device or alias
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Per-command response timeout in seconds
    #[arg(short, long, global = true)]
    timeout: Option<f64>,

    /// Line ending appended to commands: crlf, cr, lf or lfcr
    #[arg(long, global = true)]
    line_ending: Option<LineEnding>,

    /// Print one JSON document instead of the transcript
    #[arg(long, global = true)]
    json: bool,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Send AT and report whether the module answers
    Ping,
    /// Check that PSRAM can buffer an OTA image (AT+FWMEMINFO?)
    MemoryCheck {
        /// Required contiguous PSRAM in bytes
        #[arg(long)]
        min_psram: Option<u64>,
    },
    /// Check which MQTT commands the firmware supports
    MqttProbe,
    /// Join WiFi, then connect, subscribe and publish to a broker
    MqttSession {
        /// WiFi network name (password comes from config or AT_PROBE_WIFI_PASSWORD)
        #[arg(long)]
        ssid: Option<String>,
        /// Broker host name
        #[arg(long)]
        host: Option<String>,
        /// Broker port
        #[arg(long)]
        broker_port: Option<u16>,
    },
    /// Open a TLS socket to a host (AT+CIPSTART="SSL") and close it
    TlsProbe {
        /// Host name or IP address
        #[arg(long)]
        host: String,
        /// Remote TLS port
        #[arg(long, default_value_t = 443)]
        tls_port: u16,
        /// Join this WiFi network first (password comes from config or AT_PROBE_WIFI_PASSWORD)
        #[arg(long)]
        ssid: Option<String>,
    },
    /// List every command the firmware was built with (AT+CMD?)
    ListCommands {
        /// Response window in seconds; the list is long
        #[arg(long, default_value_t = 5.0)]
        wait: f64,
    },
    /// Send a single command
    Send {
        /// Command text, e.g. "AT+GMR"
        text: String,
    },
    /// Print whatever the device sends, without sending anything
    Monitor {
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
    },
    /// Wait for the boot banner, then check that AT works
    WaitReady {
        #[arg(long, default_value_t = 15.0)]
        seconds: f64,
    },
    /// Find out which line ending the firmware accepts
    LineEndings,
    /// List serial ports visible to the OS
    ListPorts,
    /// Print the effective configuration as TOML
    ShowConfig,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {}", err);
            let hints = err.troubleshooting();
            if !hints.is_empty() {
                eprintln!("\nTroubleshooting:");
                for hint in hints {
                    eprintln!("  - {}", hint);
                }
            }
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the selected check passed.
fn run(args: Args) -> AppResult<bool> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let config_path = loader.config_path.clone();
    let mut config = loader.into_config();
    apply_overrides(&args, &mut config)?;

    init_logging(&config.logging, args.verbose);
    match &config_path {
        Some(path) => debug!(path = %path.display(), "configuration loaded"),
        None => debug!("no configuration file, using defaults"),
    }
    config.validate()?;

    match &args.command {
        Cmd::ListPorts => return print_ports(args.json),
        Cmd::ShowConfig => return print_config(&config),
        _ => {}
    }

    let port_name = config.serial.resolve_port(&config.serial.port);
    let port = SyncSerialPort::open(&port_name, PortConfiguration::with_baud(config.serial.baud))?;
    info!(port = %port_name, baud = config.serial.baud, "connected");

    // Boot output is the point of these two; everything else starts clean.
    if !matches!(args.command, Cmd::Monitor { .. } | Cmd::WaitReady { .. }) {
        std::thread::sleep(config.serial.settle());
    }

    let mut engine = CommandEngine::with_settings(port, config.serial.engine_settings());
    let mut console = Console::stdout(args.json);
    console.line(format!(
        "Port: {} @ {} baud, line ending {}",
        port_name, config.serial.baud, config.serial.line_ending
    ))?;

    let probe = Probe::new(&mut engine, &mut console);
    let outcome = dispatch(&args.command, probe, &config)?;

    if args.json {
        console.raw(&serde_json::to_string_pretty(&outcome)?)?;
    }
    engine.into_inner().close();
    Ok(outcome.passed)
}

fn dispatch(
    command: &Cmd,
    probe: Probe<'_, SyncSerialPort>,
    config: &Config,
) -> AppResult<Outcome> {
    match command {
        Cmd::Ping => scenario::ping(probe),
        Cmd::MemoryCheck { .. } => scenario::memory_check(probe, config.memory.min_psram_bytes),
        Cmd::MqttProbe => scenario::mqtt_probe(probe),
        Cmd::MqttSession { .. } => scenario::mqtt_session(probe, &config.wifi, &config.mqtt),
        Cmd::TlsProbe { host, tls_port, .. } => {
            scenario::tls_probe(probe, &config.wifi, host, *tls_port)
        }
        Cmd::ListCommands { wait } => scenario::list_commands(probe, seconds("--wait", *wait)?),
        Cmd::Send { text } => scenario::send(probe, text, None),
        Cmd::Monitor { seconds: window } => scenario::monitor(probe, seconds("--seconds", *window)?),
        Cmd::WaitReady { seconds: window } => {
            scenario::wait_ready(probe, seconds("--seconds", *window)?)
        }
        Cmd::LineEndings => scenario::line_endings(probe),
        Cmd::ListPorts | Cmd::ShowConfig => Err(AppError::Configuration(
            "subcommand does not use the serial port".to_string(),
        )),
    }
}

/// Command-line flags win over the file and environment.
fn apply_overrides(args: &Args, config: &mut Config) -> AppResult<()> {
    if let Some(port) = &args.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = args.baud {
        config.serial.baud = baud;
    }
    if let Some(timeout) = args.timeout {
        let window = seconds("--timeout", timeout)?;
        config.serial.timeout_ms = u64::try_from(window.as_millis()).map_err(|_| {
            AppError::Configuration(format!("--timeout is out of range: {}", timeout))
        })?;
    }
    if let Some(line_ending) = args.line_ending {
        config.serial.line_ending = line_ending;
    }

    match &args.command {
        Cmd::MemoryCheck {
            min_psram: Some(bytes),
        } => config.memory.min_psram_bytes = *bytes,
        Cmd::TlsProbe {
            ssid: Some(ssid), ..
        } => config.wifi.ssid = Some(ssid.clone()),
        Cmd::MqttSession {
            ssid,
            host,
            broker_port,
        } => {
            if let Some(ssid) = ssid {
                config.wifi.ssid = Some(ssid.clone());
            }
            if let Some(host) = host {
                config.mqtt.host = host.clone();
            }
            if let Some(port) = broker_port {
                config.mqtt.port = *port;
            }
        }
        _ => {}
    }
    Ok(())
}

fn seconds(flag: &str, value: f64) -> AppResult<Duration> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::Configuration(format!(
            "{} must be a positive number of seconds, got {}",
            flag, value
        )));
    }
    Duration::try_from_secs_f64(value).map_err(|e| {
        AppError::Configuration(format!("{} is out of range ({}): {}", flag, e, value))
    })
}

/// Logs go to stderr so stdout stays clean for the transcript or JSON.
///
/// `RUST_LOG` takes precedence; otherwise `-v` flags raise the configured level.
fn init_logging(logging: &LoggingConfig, verbose: u8) {
    let directive = match verbose {
        0 => logging.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match logging.format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

fn print_ports(json: bool) -> AppResult<bool> {
    let ports = list_ports()?;
    let mut console = Console::stdout(json);

    if json {
        console.raw(&serde_json::to_string_pretty(&ports)?)?;
        return Ok(!ports.is_empty());
    }
    if ports.is_empty() {
        console.warn("No serial ports found")?;
        return Ok(false);
    }
    for port in &ports {
        let mut line = format!("{:<20} {}", port.port_name, port.kind);
        if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            line.push_str(&format!(" {:04x}:{:04x}", vid, pid));
        }
        if let Some(product) = &port.product {
            line.push_str(&format!(" {}", product));
        }
        console.line(line)?;
    }
    Ok(true)
}

fn print_config(config: &Config) -> AppResult<bool> {
    let mut shown = config.clone();
    if shown.wifi.password.is_some() {
        shown.wifi.password = Some("****".to_string());
    }
    if !shown.mqtt.password.is_empty() {
        shown.mqtt.password = "****".to_string();
    }
    let text = toml::to_string_pretty(&shown).map_err(ConfigError::from)?;
    Console::stdout(false).raw(&text)?;
    Ok(true)
}
