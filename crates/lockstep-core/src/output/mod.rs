//! Record sinks and the output multiplexer.

mod multiplexer;
mod sink;
mod syslog;

pub use multiplexer::{Category, CategorySet, Decimator, Forwarder, Multiplexer};
pub use sink::{MemorySink, Sink, SinkError, WriterSink};
pub use syslog::{Facility, Priority, SyslogSink};
