//! Stop signals beyond the interrupt, terminate and hangup set.
//!
//! `ctrlc` covers SIGINT, SIGTERM and SIGHUP. The signals below would
//! otherwise end the process with their default action and leave the
//! workload running, so each one clears the same `running` flag instead.

use std::io;
use std::os::raw::c_int;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::signal::{SIGALRM, SIGPIPE, SIGUSR1, SIGUSR2};
use tracing::debug;

/// Signals routed to an orderly stop in addition to those `ctrlc` handles.
pub const STOP_SIGNALS: [c_int; 4] = [SIGPIPE, SIGUSR1, SIGUSR2, SIGALRM];

/// Installs handlers that clear `running` on every signal in
/// [`STOP_SIGNALS`].
pub fn register_stop_signals(running: &Arc<AtomicBool>) -> io::Result<()> {
    for signal in STOP_SIGNALS {
        let flag = Arc::clone(running);
        // SAFETY: the handler only performs an atomic store.
        unsafe {
            signal_hook::low_level::register(signal, move || flag.store(false, Ordering::SeqCst))?;
        }
        debug!("signal {} stops the sampler", signal);
    }
    Ok(())
}
