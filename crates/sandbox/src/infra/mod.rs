//! Infrastructure adapters: HTTP backend, configuration, and logging.

pub mod config;
pub mod http;
pub mod logging;
