//! TV input probe
//!
//! Opens the TV input HAL the way the platform does and exercises it:
//! 1. Load configuration
//! 2. Register the module and open the configured device
//! 3. Initialize and collect device notifications
//! 4. Query every device's configurations, open and close every stream
//!
//! Prints a report and exits non-zero when any operation failed.

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use tvinput_config::{LoggingConfig, MockConfig, TvInputConfig};
use tvinput_hal::mock::{MockModule, MockProfile, MockTvInput};
use tvinput_hal::{
    ApiVersion, DeviceInfo, HardwareModule, ModuleInfo, ModuleRegistry, StreamConfig,
    TvInputDevice, TvInputSession, event_channel, status_of,
};

const USAGE: &str = "Usage: tvinput-probe [--config PATH] [--json]";

/// Probe stages for timing
#[derive(Debug, Clone, Copy)]
enum ProbeStage {
    Module,
    Initialize,
    Streams,
}

impl ProbeStage {
    fn name(&self) -> &'static str {
        match self {
            ProbeStage::Module => "module",
            ProbeStage::Initialize => "initialize",
            ProbeStage::Streams => "streams",
        }
    }
}

/// Command line arguments
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    json: bool,
    help: bool,
}

impl Args {
    fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Args::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow!("--config needs a path\n{USAGE}"))?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--json" => parsed.json = true,
                "--help" | "-h" => parsed.help = true,
                other => bail!("Unknown argument '{other}'\n{USAGE}"),
            }
        }

        Ok(parsed)
    }
}

/// Result of opening and closing one stream
#[derive(Debug, Serialize)]
struct StreamCheck {
    config: StreamConfig,
    open_status: i32,
    close_status: Option<i32>,
}

#[derive(Debug, Serialize)]
struct DeviceReport {
    info: DeviceInfo,
    configurations_status: i32,
    streams: Vec<StreamCheck>,
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    module: ModuleInfo,
    device_api_version: ApiVersion,
    notifications: usize,
    devices: Vec<DeviceReport>,
}

impl ProbeReport {
    /// Number of operations that did not return success
    fn failures(&self) -> usize {
        self.devices
            .iter()
            .map(|d| {
                usize::from(d.configurations_status != 0)
                    + d.streams
                        .iter()
                        .filter(|s| s.open_status != 0 || s.close_status.is_some_and(|c| c != 0))
                        .count()
            })
            .sum()
    }
}

fn main() -> Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;

    // Setup logging
    setup_logging(&config.logging);

    let start = Instant::now();
    info!("TV input probe starting...");

    let report = run_probe(&config)?;
    print_report(&report, args.json)?;

    info!("Probe complete in {:?}", start.elapsed());

    let failures = report.failures();
    if failures > 0 {
        bail!("{failures} operation(s) failed");
    }
    Ok(())
}

/// Load the given file, or the first standard one, plus environment overrides
fn load_config(path: Option<&Path>) -> Result<TvInputConfig> {
    let path = path.map(Path::to_path_buf).or_else(TvInputConfig::default_path);

    TvInputConfig::load_layered(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration from environment".to_string(),
    })
}

/// Setup logging to stderr
fn setup_logging(logging: &LoggingConfig) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(logging.ansi)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Build the simulated hardware module
fn build_module(mock: &MockConfig) -> Result<MockModule> {
    let device = match &mock.description {
        Some(path) => MockTvInput::from_profile_file(path)
            .with_context(|| format!("Failed to load hardware description {}", path.display()))?,
        None => {
            let profile = MockProfile::from_name(&mock.profile)
                .ok_or_else(|| anyhow!("Unknown mock profile '{}'", mock.profile))?;
            debug!("Using mock profile {}", profile.name());
            MockTvInput::new(profile)
        }
    };

    Ok(MockModule::with_device(device))
}

/// Open the HAL and exercise every device and stream
fn run_probe(config: &TvInputConfig) -> Result<ProbeReport> {
    // Stage 1: module lookup and device open
    let stage_start = Instant::now();
    let supported = config.hal.supported_version()?;

    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(build_module(&config.mock)?));

    let module = registry.get(&config.hal.module_id)?;
    let device = registry
        .open_device(&config.hal.module_id, &config.hal.device_name, supported)
        .with_context(|| {
            format!(
                "Failed to open device '{}' of module '{}'",
                config.hal.device_name, config.hal.module_id
            )
        })?;
    let device_api_version = device.api_version();
    log_stage_complete(ProbeStage::Module, stage_start);

    // Stage 2: initialize and collect the initial notifications
    let stage_start = Instant::now();
    let session = TvInputSession::new(device);
    let (sender, mut events) = event_channel();
    session
        .initialize(Arc::new(sender))
        .context("Failed to initialize device")?;

    let mut notifications = 0;
    while let Ok(event) = events.try_recv() {
        debug!("Notification: {:?}", event);
        notifications += 1;
    }
    log_stage_complete(ProbeStage::Initialize, stage_start);

    // Stage 3: streams
    let stage_start = Instant::now();
    let devices = session
        .available_devices()
        .into_iter()
        .map(|info| probe_device(&session, info))
        .collect();
    log_stage_complete(ProbeStage::Streams, stage_start);

    if let Err(e) = session.close() {
        warn!("Failed to close device: {}", e);
    }

    Ok(ProbeReport {
        module: module.info().clone(),
        device_api_version,
        notifications,
        devices,
    })
}

/// Query one device and open/close each of its streams in turn
fn probe_device(session: &TvInputSession, info: DeviceInfo) -> DeviceReport {
    let configs = session.stream_configurations(info.device_id);
    let configurations_status = status_of(&configs);

    let streams = match configs {
        Ok(configs) => configs
            .into_iter()
            .map(|config| {
                let opened = session.open_stream(info.device_id, config.stream_id);
                let open_status = status_of(&opened);
                let close_status = opened
                    .is_ok()
                    .then(|| status_of(&session.close_stream(info.device_id, config.stream_id)));

                if open_status != 0 {
                    warn!(
                        "Opening stream {}/{} failed with status {}",
                        info.device_id, config.stream_id, open_status
                    );
                }

                StreamCheck {
                    config,
                    open_status,
                    close_status,
                }
            })
            .collect(),
        Err(e) => {
            warn!("Device {}: {}", info.device_id, e);
            Vec::new()
        }
    };

    DeviceReport {
        info,
        configurations_status,
        streams,
    }
}

fn print_report(report: &ProbeReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}", render_text(report));
    Ok(())
}

fn render_text(report: &ProbeReport) -> String {
    let mut out = format!(
        "Module: {} ({}) v{}, device API v{}\nNotifications: {}\n",
        report.module.name,
        report.module.id,
        report.module.module_api_version,
        report.device_api_version,
        report.notifications
    );

    for device in &report.devices {
        out.push_str(&format!(
            "Device {} [{}]: configurations status {}\n",
            device.info.device_id,
            device.info.input_type.name(),
            device.configurations_status
        ));
        for stream in &device.streams {
            out.push_str(&format!(
                "  stream {} {}x{}: open {}, close {}\n",
                stream.config.stream_id,
                stream.config.max_video_width,
                stream.config.max_video_height,
                stream.open_status,
                stream
                    .close_status
                    .map_or_else(|| "-".to_string(), |s| s.to_string())
            ));
        }
    }

    out.push_str(&format!("Failures: {}", report.failures()));
    out
}

fn log_stage_complete(stage: ProbeStage, start: Instant) {
    info!("Stage {} complete in {:?}", stage.name(), start.elapsed());
}
