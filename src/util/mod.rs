//! Process-level helpers shared by the binary and the library

pub mod logging;

pub use logging::{init_logging, LoggingConfig};
