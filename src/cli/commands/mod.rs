//! CLI command implementations.

mod ask;
mod config;
mod serve;
mod watch;

pub use ask::run_ask;
pub use config::run_config;
pub use serve::run_serve;
pub use watch::run_watch;
