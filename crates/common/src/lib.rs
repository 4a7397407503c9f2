pub mod errors;
pub mod logging;

pub use errors::{LlmError, LlmResult};
pub use logging::{init_logging, LoggingConfig};
