//! Readers for the Linux `/proc` filesystem.
//!
//! `parser` holds pure content parsers; `process` wires them to files.

pub mod parser;
pub mod process;

pub use parser::ParseError;
pub use process::{CollectError, ProcessReader};
