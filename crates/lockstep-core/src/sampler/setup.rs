//! Builds a ready-to-run sampler from a resolved configuration.

use tracing::info;

use super::scheduler::Sampler;
use super::supervisor::{Supervisor, SupervisorError};
use crate::collector::{Collector, GpuError, RealFs, clock_ticks_per_second};
use crate::config::{ConfigError, SamplerConfig};
use crate::field::{FieldError, Registry, Serializer};
use crate::model::{ProcessSample, SensorReading};
use crate::output::{Decimator, Forwarder, Multiplexer, Sink, SinkError, SyslogSink, WriterSink};

/// Anything that prevents the loop from starting.
#[derive(Debug)]
pub enum SetupError {
    Config(ConfigError),
    Field(FieldError),
    Sink(SinkError),
    Accelerator(GpuError),
    Supervisor(SupervisorError),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::Config(e) => write!(f, "{}", e),
            SetupError::Field(e) => write!(f, "{}", e),
            SetupError::Sink(e) => write!(f, "{}", e),
            SetupError::Accelerator(e) => write!(f, "{}", e),
            SetupError::Supervisor(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SetupError {}

impl From<ConfigError> for SetupError {
    fn from(e: ConfigError) -> Self {
        SetupError::Config(e)
    }
}

impl From<FieldError> for SetupError {
    fn from(e: FieldError) -> Self {
        SetupError::Field(e)
    }
}

impl From<SinkError> for SetupError {
    fn from(e: SinkError) -> Self {
        SetupError::Sink(e)
    }
}

impl From<GpuError> for SetupError {
    fn from(e: GpuError) -> Self {
        SetupError::Accelerator(e)
    }
}

impl From<SupervisorError> for SetupError {
    fn from(e: SupervisorError) -> Self {
        SetupError::Supervisor(e)
    }
}

/// Resolves field selections against the registries.
pub fn serializers(
    config: &SamplerConfig,
) -> Result<(Serializer<ProcessSample>, Serializer<SensorReading>), FieldError> {
    let process = Registry::process(config.gpu);
    let process_selection = config
        .process_fields
        .as_deref()
        .map(|list| process.select(list))
        .transpose()?;

    let sensor = Registry::sensor();
    let sensor_selection = config
        .system_fields
        .as_deref()
        .map(|list| sensor.select(list))
        .transpose()?;

    Ok((
        Serializer::new(process, process_selection),
        Serializer::new(sensor, sensor_selection),
    ))
}

#[cfg(feature = "nvml")]
fn attach_gpu(
    collector: Collector<RealFs>,
    config: &SamplerConfig,
) -> Result<Collector<RealFs>, GpuError> {
    use crate::collector::{AccountingSource, NvmlAccounting};

    if !config.gpu {
        return Ok(collector);
    }
    let nvml = NvmlAccounting::init()?;
    info!("accelerator accounting enabled on {} devices", nvml.device_count());
    Ok(collector.with_gpu(Box::new(nvml)))
}

#[cfg(not(feature = "nvml"))]
fn attach_gpu(
    collector: Collector<RealFs>,
    config: &SamplerConfig,
) -> Result<Collector<RealFs>, GpuError> {
    if config.gpu {
        return Err(GpuError::Init("built without NVML support".to_string()));
    }
    Ok(collector)
}

/// Validates `config`, opens every sink, initialises accounting and
/// finally starts the workload, in that order, so that a setup failure
/// never leaves a workload running.
pub fn build(config: &SamplerConfig) -> Result<Sampler<RealFs>, SetupError> {
    let low_rate = config.low_rate()?;
    let (process_serializer, sensor_serializer) = serializers(config)?;

    let process_sink = WriterSink::open(config.process_output.as_deref())?;
    let system_sink = WriterSink::open(config.system_output.as_deref())?;
    info!(
        "process records -> {}, sensor records -> {}",
        process_sink.name(),
        system_sink.name()
    );

    let mut mux = Multiplexer::new(
        Box::new(process_sink),
        Box::new(system_sink),
        config.system_categories(),
    );
    if let Some(low) = low_rate {
        info!(
            "forwarding to syslog every {} ticks ({}, {:?})",
            low.period, low.facility, low.priority
        );
        let sink = SyslogSink::open(low.facility, low.priority);
        mux = mux.with_forwarder(Forwarder::new(
            Box::new(sink),
            low.classes,
            Decimator::new(low.period),
        ));
    }

    let collector = Collector::new(RealFs, &config.proc_path, &config.sys_path)
        .with_min_uid(config.min_uid)
        .with_ticks_per_second(clock_ticks_per_second());
    let collector = attach_gpu(collector, config)?;

    let mut sampler = Sampler::new(
        collector,
        process_serializer,
        sensor_serializer,
        mux,
        config.interval,
    );
    if !config.command.is_empty() {
        sampler = sampler.with_supervisor(Supervisor::spawn(&config.command)?);
    }
    Ok(sampler)
}
