pub mod config;
pub mod error;
pub mod formatter;
pub mod processor;
pub mod snapshot;

pub use config::{ProcessorConfig, DEFAULT_ENV_PREFIX};
pub use error::ConfigurationError;
pub use formatter::{RequestFormatter, ResponseFormatter};
pub use processor::{ProcessorCallback, ProcessorLayer, ProcessorService, RequestResponseProcessor};
pub use snapshot::{RequestSnapshot, ResponseSnapshot};
