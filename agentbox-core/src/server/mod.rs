//! Background process tracking for long-running dev servers.

pub mod lifecycle;

pub use lifecycle::{
    LifecycleSettings, ProcessLifecycleManager, ProcessState, ServerStatus, StartOutcome,
    StopOutcome, TrackedProcess,
};
