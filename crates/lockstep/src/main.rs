//! lockstep - process and hardware telemetry sampler.
//!
//! Samples `/proc` and `/sys` at a fixed interval and writes one
//! `|`-delimited line per record. When a workload command is given it is
//! started alongside the sampler, and its exit ends the run with the
//! workload's own exit status.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use lockstep_core::collector::DEFAULT_MIN_UID;
use lockstep_core::config::{ConfigError, ConfigFile, SamplerConfig};
use lockstep_core::field::Registry;
use lockstep_core::model::SensorClass;
use lockstep_core::sampler;
use lockstep_core::util::parse_duration;

/// Process and hardware telemetry sampler.
#[derive(Parser, Debug)]
#[command(
    name = "lockstep",
    about = "Samples process and hardware telemetry, optionally alongside a workload",
    version
)]
struct Args {
    /// Sampling interval: microseconds, or a number with us, ms, s or m suffix [default: 1s].
    #[arg(short, long, value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Comma separated process fields [default: all].
    #[arg(short, long, value_name = "LIST")]
    fields: Option<String>,

    /// Comma separated sensor fields [default: all].
    #[arg(short = 's', long, value_name = "LIST")]
    system_fields: Option<String>,

    /// Append process records to FILE instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Append sensor records to FILE instead of stdout.
    #[arg(short = 'O', long, value_name = "FILE")]
    system_output: Option<PathBuf>,

    /// Hardware classes to sample: hwmon, thermal, drm.
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    sensors: Vec<SensorClass>,

    /// Skip processes owned by a uid below this value.
    #[arg(long, default_value_t = DEFAULT_MIN_UID)]
    min_uid: u32,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: PathBuf,

    /// Path to /sys filesystem (for testing/mocking).
    #[arg(long, default_value = "/sys")]
    sys_path: PathBuf,

    /// Record per-process NVIDIA accounting statistics (needs the `nvml` build feature).
    #[arg(long)]
    gpu: bool,

    /// Configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print every field name and exit.
    #[arg(short, long)]
    list_fields: bool,

    /// Increase verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,

    /// Workload to run while sampling.
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

/// Initializes the tracing subscriber on stderr; stdout carries records.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Layers command-line flags over the configuration file over defaults.
fn build_config(args: &Args) -> Result<SamplerConfig, ConfigError> {
    let mut config = SamplerConfig::default();

    if let Some(path) = &args.config {
        config.apply_file(ConfigFile::load(path)?);
        info!("Loaded configuration from {}", path.display());
    }

    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    config.process_fields = args.fields.clone();
    config.system_fields = args.system_fields.clone();
    config.process_output = args.output.clone();
    config.system_output = args.system_output.clone();
    config.sensors = args.sensors.clone();
    config.min_uid = args.min_uid;
    config.proc_path = args.proc_path.clone();
    config.sys_path = args.sys_path.clone();
    config.gpu = args.gpu;
    config.command = args.command.clone();

    Ok(config)
}

/// Every field name, process fields first.
fn field_names(gpu: bool) -> Vec<&'static str> {
    let process = Registry::process(gpu);
    let sensor = Registry::sensor();
    process.names().chain(sensor.names()).collect()
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    if args.list_fields {
        for name in field_names(args.gpu) {
            println!("{}", name);
        }
        return;
    }

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("lockstep {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={:?}, proc={}, sys={}, min_uid={}",
        config.interval,
        config.proc_path.display(),
        config.sys_path.display(),
        config.min_uid
    );

    // Setup graceful shutdown on SIGINT, SIGTERM and SIGHUP, plus SIGPIPE,
    // SIGUSR1, SIGUSR2 and SIGALRM
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        error!("Failed to set signal handler: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = sampler::register_stop_signals(&running) {
        error!("Failed to set signal handler: {}", e);
        std::process::exit(1);
    }

    let mut sampler = match sampler::build(&config) {
        Ok(sampler) => sampler,
        Err(e) => {
            error!("Setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let reason = sampler.run(&running);
    info!("Shutdown complete");
    std::process::exit(reason.exit_code());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn trailing_command_is_workload() {
        let args = Args::try_parse_from([
            "lockstep", "-i", "200ms", "-f", "pid,command", "--", "sh", "-c", "exit 3",
        ])
        .unwrap();
        assert_eq!(args.interval, Some(Duration::from_millis(200)));
        assert_eq!(args.fields.as_deref(), Some("pid,command"));
        assert_eq!(args.command, vec!["sh", "-c", "exit 3"]);
    }

    #[test]
    fn sensors_list_parsed() {
        let args = Args::try_parse_from(["lockstep", "--sensors", "hwmon,drm"]).unwrap();
        assert_eq!(args.sensors, vec![SensorClass::Hwmon, SensorClass::Drm]);
        assert!(Args::try_parse_from(["lockstep", "--sensors", "gpu"]).is_err());
    }

    #[test]
    fn invalid_interval_rejected() {
        assert!(Args::try_parse_from(["lockstep", "-i", "0"]).is_err());
        assert!(Args::try_parse_from(["lockstep", "-i", "fast"]).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interval = 5s\nsyslog_interval = 1m").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = Args::try_parse_from(["lockstep", "-c", &path]).unwrap();
        let config = build_config(&args).unwrap();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.syslog_interval, Some(Duration::from_secs(60)));

        let args = Args::try_parse_from(["lockstep", "-c", &path, "-i", "1s"]).unwrap();
        let config = build_config(&args).unwrap();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.low_rate().unwrap().unwrap().period, 60);
    }

    #[test]
    fn bad_config_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "colour = red").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = Args::try_parse_from(["lockstep", "--config", &path]).unwrap();
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn field_listing_covers_both_records() {
        let names = field_names(false);
        assert_eq!(names.first(), Some(&"pid"));
        assert!(names.contains(&"executable"));
        assert!(names.contains(&"label"));
        assert!(!names.contains(&"gpu_time_ms"));
        assert!(field_names(true).contains(&"gpu_time_ms"));
    }
}
