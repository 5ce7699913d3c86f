//! Human-readable rendering of compiled flows and run reports.

mod formatter;

pub use formatter::TraceFormatter;
