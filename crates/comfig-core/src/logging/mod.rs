//! Logging abstractions for the configuration pipeline

mod noop;
mod traits;
mod tracing_logger;

pub use noop::NoOpLogger;
pub use traits::{Logger, LoggerExt, SharedLogger};
pub use tracing_logger::TracingLogger;
