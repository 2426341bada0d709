mod application_impl;
pub mod data;
mod logging;
mod runtime_config;

pub use application_impl::{Application, ApplicationError};
pub use logging::{LoggingError, setup_tracing};
pub use runtime_config::{RuntimeConfig, SettingsError};
