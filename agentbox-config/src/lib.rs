//! Configuration for the agentbox sandbox.
//!
//! Configuration lives in `agentbox.toml` at the project root (or wherever
//! `AGENTBOX_CONFIG_PATH` points). Every key has a default, so an absent file
//! yields the stock allowlist, the 60s command bound, the 3s server grace
//! period and the 5s stop timeout.

pub mod commands;
pub mod constants;
pub mod limits;
pub mod loader;
pub mod server;
pub mod timeouts;

pub use commands::CommandsConfig;
pub use limits::LimitsConfig;
pub use loader::{ConfigManager, SandboxConfig};
pub use server::{ExecutionMode, ServerConfig, ServerPatternConfig};
pub use timeouts::TimeoutsConfig;
