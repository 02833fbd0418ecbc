//! Supervision of the optional workload process.

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus};

use tracing::{debug, info};

/// Error type for workload supervision.
#[derive(Debug)]
pub enum SupervisorError {
    /// No program was given.
    EmptyCommand,
    /// The workload could not be started.
    Spawn(String, io::Error),
    /// Waiting for or signalling the workload failed.
    Wait(io::Error),
}

impl std::fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorError::EmptyCommand => write!(f, "empty workload command"),
            SupervisorError::Spawn(program, e) => write!(f, "failed to start {}: {}", program, e),
            SupervisorError::Wait(e) => write!(f, "failed to wait for workload: {}", e),
        }
    }
}

impl std::error::Error for SupervisorError {}

/// How the workload terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Code(i32),
    Signal(i32),
}

impl ExitOutcome {
    fn from_status(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => ExitOutcome::Code(code),
            (None, Some(signal)) => ExitOutcome::Signal(signal),
            (None, None) => ExitOutcome::Code(1),
        }
    }

    /// Exit status the sampler reports for this outcome, shell style.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitOutcome::Code(code) => *code,
            ExitOutcome::Signal(signal) => 128 + signal,
        }
    }
}

/// Owns the workload child process until it has been reaped.
pub struct Supervisor {
    child: Child,
    program: String,
    outcome: Option<ExitOutcome>,
}

impl Supervisor {
    /// Starts `command[0]` with the remaining elements as arguments.
    /// Standard streams are inherited.
    pub fn spawn(command: &[String]) -> Result<Self, SupervisorError> {
        let (program, args) = command.split_first().ok_or(SupervisorError::EmptyCommand)?;
        let child = Command::new(program)
            .args(args)
            .spawn()
            .map_err(|e| SupervisorError::Spawn(program.clone(), e))?;
        info!("started workload {} (pid {})", program, child.id());
        Ok(Self {
            child,
            program: program.clone(),
            outcome: None,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Terminal outcome, once observed.
    pub fn outcome(&self) -> Option<ExitOutcome> {
        self.outcome
    }

    /// Non-blocking status check; reaps the child when it has exited.
    pub fn poll(&mut self) -> Result<Option<ExitOutcome>, SupervisorError> {
        if self.outcome.is_some() {
            return Ok(self.outcome);
        }
        if let Some(status) = self.child.try_wait().map_err(SupervisorError::Wait)? {
            let outcome = ExitOutcome::from_status(status);
            info!("workload {} exited: {:?}", self.program, outcome);
            self.outcome = Some(outcome);
        }
        Ok(self.outcome)
    }

    /// Asks a still-running workload to stop with SIGTERM and blocks until
    /// it is reaped.
    pub fn terminate(&mut self) -> Result<ExitOutcome, SupervisorError> {
        if let Some(outcome) = self.poll()? {
            return Ok(outcome);
        }
        debug!("sending SIGTERM to workload pid {}", self.pid());
        // SAFETY: kill has no memory-safety preconditions; the pid belongs
        // to our unreaped child so it cannot have been recycled.
        let rc = unsafe { libc::kill(self.pid() as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(SupervisorError::Wait(err));
            }
        }
        let status = self.child.wait().map_err(SupervisorError::Wait)?;
        let outcome = ExitOutcome::from_status(status);
        info!("workload {} terminated: {:?}", self.program, outcome);
        self.outcome = Some(outcome);
        Ok(outcome)
    }
}
