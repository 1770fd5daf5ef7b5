//! Pre-execution hooks.

pub mod security;

pub use security::{HookConvention, HookDecision, HookOutcome, SecurityHook, is_shell_tool};
