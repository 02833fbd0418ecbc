//! Fixed-interval sampling loop.
//!
//! One thread, one tick at a time: capture the timestamp, assemble and
//! write every wanted category, flush, poll the workload, sleep. The only
//! state shared with other threads is the `running` flag cleared by the
//! signal handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info};

use super::supervisor::{ExitOutcome, Supervisor, SupervisorError};
use crate::collector::{Collector, FileSystem, GpuError};
use crate::field::Serializer;
use crate::model::{ProcessSample, SensorClass, SensorReading};
use crate::output::{Category, Multiplexer, SinkError};

/// Granularity at which the sleep re-checks the `running` flag.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Error that ends the run from inside a tick.
#[derive(Debug)]
pub enum TickError {
    Accelerator(GpuError),
    Sink(SinkError),
    Supervisor(SupervisorError),
}

impl std::fmt::Display for TickError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickError::Accelerator(e) => write!(f, "{}", e),
            TickError::Sink(e) => write!(f, "{}", e),
            TickError::Supervisor(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TickError {}

impl From<GpuError> for TickError {
    fn from(e: GpuError) -> Self {
        TickError::Accelerator(e)
    }
}

impl From<SinkError> for TickError {
    fn from(e: SinkError) -> Self {
        TickError::Sink(e)
    }
}

impl From<SupervisorError> for TickError {
    fn from(e: SupervisorError) -> Self {
        TickError::Supervisor(e)
    }
}

/// Loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Draining,
    Stopped,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Termination signal received.
    Signal,
    /// The supervised workload terminated on its own.
    WorkloadExited(ExitOutcome),
    /// A tick failed in a way that cannot be contained.
    Fatal,
}

impl StopReason {
    /// Process exit status for this reason.
    pub fn exit_code(&self) -> i32 {
        match self {
            StopReason::Signal => 0,
            StopReason::WorkloadExited(outcome) => outcome.exit_code(),
            StopReason::Fatal => 1,
        }
    }
}

/// Drives ticks until stopped.
pub struct Sampler<F: FileSystem + Clone> {
    collector: Collector<F>,
    process_serializer: Serializer<ProcessSample>,
    sensor_serializer: Serializer<SensorReading>,
    mux: Multiplexer,
    interval: Duration,
    supervisor: Option<Supervisor>,
    state: LoopState,
    line: String,
}

impl<F: FileSystem + Clone> Sampler<F> {
    pub fn new(
        collector: Collector<F>,
        process_serializer: Serializer<ProcessSample>,
        sensor_serializer: Serializer<SensorReading>,
        mux: Multiplexer,
        interval: Duration,
    ) -> Self {
        Self {
            collector,
            process_serializer,
            sensor_serializer,
            mux,
            interval,
            supervisor: None,
            state: LoopState::Stopped,
            line: String::new(),
        }
    }

    /// Attaches a started workload; its exit ends the run.
    pub fn with_supervisor(mut self, supervisor: Supervisor) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn supervisor(&self) -> Option<&Supervisor> {
        self.supervisor.as_ref()
    }

    /// Samples and writes every wanted category once, all stamped with
    /// `timestamp`. Returns the number of records written.
    ///
    /// Process samples are assembled completely before the first one is
    /// written, so an accounting failure leaves no records of this tick.
    pub fn run_tick(&mut self, timestamp: i64) -> Result<usize, TickError> {
        let armed = self.mux.begin_tick();
        let mut records = 0;

        if self.mux.wants(Category::Process) {
            let samples = self.collector.collect_processes(timestamp)?;
            for sample in &samples {
                self.process_serializer.render_line(sample, &mut self.line);
                self.mux.emit(Category::Process, &self.line)?;
            }
            records += samples.len();
        }

        for class in SensorClass::ALL {
            let category = Category::from(class);
            if !self.mux.wants(category) {
                continue;
            }
            let readings = self.collector.collect_sensors(class, timestamp);
            for reading in &readings {
                self.sensor_serializer.render_line(reading, &mut self.line);
                self.mux.emit(category, &self.line)?;
            }
            records += readings.len();
        }

        self.mux.flush()?;
        debug!("tick {}: {} records (low-rate armed: {})", timestamp, records, armed);
        Ok(records)
    }

    /// Runs ticks until `running` is cleared, the workload exits or a tick
    /// fails, then reaps the workload.
    pub fn run(&mut self, running: &AtomicBool) -> StopReason {
        self.state = LoopState::Running;
        info!("sampling every {:?}", self.interval);

        let reason = loop {
            if !running.load(Ordering::SeqCst) {
                info!("stop requested");
                break StopReason::Signal;
            }

            let timestamp = Utc::now().timestamp();
            if let Err(e) = self.run_tick(timestamp) {
                // A write into a closed pipe fails after SIGPIPE already
                // asked for a stop.
                if !running.load(Ordering::SeqCst) {
                    info!("stop requested, last tick failed: {}", e);
                    break StopReason::Signal;
                }
                error!("{}", e);
                break StopReason::Fatal;
            }

            if let Some(supervisor) = &mut self.supervisor {
                match supervisor.poll() {
                    Ok(Some(outcome)) => break StopReason::WorkloadExited(outcome),
                    Ok(None) => {}
                    Err(e) => {
                        error!("{}", e);
                        break StopReason::Fatal;
                    }
                }
            }

            let mut remaining = self.interval;
            while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
                let slice = remaining.min(SLEEP_SLICE);
                std::thread::sleep(slice);
                remaining = remaining.saturating_sub(slice);
            }
        };

        self.state = LoopState::Draining;
        self.shutdown();
        self.state = LoopState::Stopped;
        info!("stopped: {:?}", reason);
        reason
    }

    /// Terminates a workload that is still alive.
    fn shutdown(&mut self) {
        let Some(supervisor) = &mut self.supervisor else {
            return;
        };
        if supervisor.outcome().is_some() {
            return;
        }
        if let Err(e) = supervisor.terminate() {
            error!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::gpu::tests::FakeAccounting;
    use crate::collector::mock::MockFs;
    use crate::field::Registry;
    use crate::output::{CategorySet, Decimator, Forwarder, MemorySink, Sink};
    use std::io;
    use std::sync::Arc;

    struct Captured {
        process: MemorySink,
        system: MemorySink,
        low: MemorySink,
    }

    /// Sink whose writes always fail, optionally clearing a flag first the
    /// way SIGPIPE does before the write reports `EPIPE`.
    struct FailingSink {
        clears: Option<Arc<AtomicBool>>,
    }

    impl Sink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn write_record(&mut self, _line: &str) -> Result<(), SinkError> {
            if let Some(flag) = &self.clears {
                flag.store(false, Ordering::SeqCst);
            }
            Err(SinkError::Write(
                self.name().to_string(),
                io::Error::from(io::ErrorKind::BrokenPipe),
            ))
        }

        fn flush(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn failing_sampler(clears: Option<Arc<AtomicBool>>) -> Sampler<MockFs> {
        let registry = Registry::process(false);
        let selection = registry.select("pid").unwrap();
        let mux = Multiplexer::new(
            Box::new(FailingSink { clears }),
            Box::new(MemorySink::new()),
            CategorySet::of(&[]),
        );
        let workload = vec!["sleep".to_string(), "30".to_string()];
        Sampler::new(
            collector(MockFs::typical_system()),
            Serializer::new(registry, Some(selection)),
            Serializer::new(Registry::sensor(), None),
            mux,
            Duration::from_millis(10),
        )
        .with_supervisor(Supervisor::spawn(&workload).unwrap())
    }

    fn system_with_sensors() -> MockFs {
        let mut fs = MockFs::typical_system();
        fs.add_file("/sys/class/hwmon/hwmon0/name", "coretemp\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "45000\n");
        fs.add_file("/sys/class/thermal/thermal_zone0/temp", "38000\n");
        fs.add_file("/sys/class/thermal/thermal_zone0/type", "acpitz\n");
        fs
    }

    fn sampler(
        collector: Collector<MockFs>,
        fields: &str,
        system: &[Category],
        forwarded: &[Category],
        period: u64,
    ) -> (Sampler<MockFs>, Captured) {
        let captured = Captured {
            process: MemorySink::new(),
            system: MemorySink::new(),
            low: MemorySink::new(),
        };
        let registry = Registry::process(collector.gpu_enabled());
        let selection = registry.select(fields).unwrap();
        let sensor_registry = Registry::sensor();
        let sensor_selection = sensor_registry.select("timestamp,class,value,name").unwrap();
        let mux = Multiplexer::new(
            Box::new(captured.process.clone()),
            Box::new(captured.system.clone()),
            CategorySet::of(system),
        )
        .with_forwarder(Forwarder::new(
            Box::new(captured.low.clone()),
            CategorySet::of(forwarded),
            Decimator::new(period),
        ));
        let sampler = Sampler::new(
            collector,
            Serializer::new(registry, Some(selection)),
            Serializer::new(sensor_registry, Some(sensor_selection)),
            mux,
            Duration::from_millis(10),
        );
        (sampler, captured)
    }

    fn collector(fs: MockFs) -> Collector<MockFs> {
        Collector::new(fs, "/proc", "/sys").with_self_pid(u32::MAX)
    }

    #[test]
    fn test_tick_writes_one_line_per_admitted_process() {
        let (mut sampler, captured) =
            sampler(collector(MockFs::typical_system()), "pid,command,timestamp", &[], &[], 1);

        assert_eq!(sampler.run_tick(1_700_000_000).unwrap(), 2);
        assert_eq!(
            captured.process.lines(),
            vec!["1000|bash|1700000000\n", "1001|cat|1700000000\n"]
        );
        assert_eq!(captured.process.flush_count(), 1);
        assert!(captured.system.lines().is_empty());
    }

    #[test]
    fn test_records_of_one_tick_share_timestamp() {
        let (mut sampler, captured) = sampler(
            collector(system_with_sensors()),
            "timestamp",
            &[Category::Hwmon, Category::Thermal],
            &[],
            1,
        );
        sampler.run_tick(42).unwrap();

        assert_eq!(captured.process.lines(), vec!["42\n", "42\n"]);
        assert_eq!(
            captured.system.lines(),
            vec!["42|hwmon|45000|coretemp\n", "42|thermal|38000|acpitz\n"]
        );
    }

    #[test]
    fn test_unrequested_sensor_classes_not_written() {
        let (mut sampler, captured) =
            sampler(collector(system_with_sensors()), "pid", &[Category::Thermal], &[], 1);
        sampler.run_tick(0).unwrap();

        assert_eq!(captured.system.lines(), vec!["0|thermal|38000|acpitz\n"]);
    }

    #[test]
    fn test_low_rate_channel_decimated() {
        let (mut sampler, captured) =
            sampler(collector(system_with_sensors()), "pid", &[], &[Category::Thermal], 2);
        for tick in 1..=4 {
            sampler.run_tick(tick).unwrap();
        }

        assert_eq!(
            captured.low.lines(),
            vec!["2|thermal|38000|acpitz\n", "4|thermal|38000|acpitz\n"]
        );
        assert!(captured.system.lines().is_empty());
        assert_eq!(captured.process.lines().len(), 8);
    }

    #[test]
    fn test_incomplete_process_never_written() {
        let mut fs = MockFs::typical_system();
        fs.remove_file("/proc/1001/io");
        let (mut sampler, captured) = sampler(collector(fs), "pid,read_bytes", &[], &[], 1);
        sampler.run_tick(0).unwrap();

        assert_eq!(captured.process.lines(), vec!["1000|100000\n"]);
    }

    #[test]
    fn test_accelerator_failure_discards_tick() {
        let fake = FakeAccounting {
            devices: 1,
            failing: Some((0, 1001)),
            ..Default::default()
        };
        let collector = collector(MockFs::typical_system()).with_gpu(Box::new(fake));
        let (mut sampler, captured) = sampler(collector, "pid,gpu_time_ms", &[], &[], 1);

        assert!(matches!(
            sampler.run_tick(0),
            Err(TickError::Accelerator(_))
        ));
        assert!(captured.process.lines().is_empty());
    }

    #[test]
    fn test_run_stops_on_cleared_flag() {
        let (mut sampler, captured) =
            sampler(collector(MockFs::typical_system()), "pid", &[], &[], 1);
        let running = AtomicBool::new(false);

        let reason = sampler.run(&running);
        assert_eq!(reason, StopReason::Signal);
        assert_eq!(reason.exit_code(), 0);
        assert_eq!(sampler.state(), LoopState::Stopped);
        assert!(captured.process.lines().is_empty());
    }

    #[test]
    fn test_run_mirrors_workload_exit() {
        let (sampler, captured) = sampler(collector(MockFs::typical_system()), "pid", &[], &[], 1);
        let workload = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        let mut sampler = sampler.with_supervisor(Supervisor::spawn(&workload).unwrap());
        let running = AtomicBool::new(true);

        let reason = sampler.run(&running);
        assert_eq!(reason, StopReason::WorkloadExited(ExitOutcome::Code(3)));
        assert_eq!(reason.exit_code(), 3);
        assert!(!captured.process.lines().is_empty());
    }

    #[test]
    fn test_signal_stop_terminates_workload() {
        let (sampler, _captured) = sampler(collector(MockFs::typical_system()), "pid", &[], &[], 1);
        let workload = vec!["sleep".to_string(), "30".to_string()];
        let mut sampler = sampler.with_supervisor(Supervisor::spawn(&workload).unwrap());

        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            flag.store(false, Ordering::SeqCst);
        });

        let reason = sampler.run(&running);
        stopper.join().unwrap();

        assert_eq!(reason, StopReason::Signal);
        assert_eq!(reason.exit_code(), 0);
        assert_eq!(
            sampler.supervisor().and_then(|s| s.outcome()),
            Some(ExitOutcome::Signal(libc::SIGTERM))
        );
    }

    #[test]
    fn test_sink_failure_is_fatal_and_terminates_workload() {
        let mut sampler = failing_sampler(None);
        let running = AtomicBool::new(true);

        let reason = sampler.run(&running);
        assert_eq!(reason, StopReason::Fatal);
        assert_eq!(reason.exit_code(), 1);
        assert_eq!(sampler.state(), LoopState::Stopped);
        assert_eq!(
            sampler.supervisor().and_then(|s| s.outcome()),
            Some(ExitOutcome::Signal(libc::SIGTERM))
        );
    }

    #[test]
    fn test_write_failure_after_stop_request_is_clean_stop() {
        let running = Arc::new(AtomicBool::new(true));
        let mut sampler = failing_sampler(Some(running.clone()));

        let reason = sampler.run(&running);
        assert_eq!(reason, StopReason::Signal);
        assert_eq!(reason.exit_code(), 0);
        assert_eq!(
            sampler.supervisor().and_then(|s| s.outcome()),
            Some(ExitOutcome::Signal(libc::SIGTERM))
        );
    }

    #[test]
    fn test_fatal_exit_code() {
        assert_eq!(StopReason::Fatal.exit_code(), 1);
        assert_eq!(
            StopReason::WorkloadExited(ExitOutcome::Signal(9)).exit_code(),
            137
        );
    }
}
