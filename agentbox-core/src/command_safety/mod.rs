//! Command validation for agent-issued shell commands.
//!
//! A command line is accepted only if every segment of it passes:
//!
//! 1. The line contains no command or process substitution.
//! 2. It is split on `&&`, `||`, `;`, `|`, `&` and newlines, honouring quotes.
//! 3. Each segment's program (after `NAME=VALUE` prefixes, by basename) is in
//!    the [`AllowedCommandSet`].
//! 4. Programs with dangerous argument forms (`chmod`, `find`, `init.sh`,
//!    `pkill`/`killall`, `kill`, shell interpreters) pass structural checks.
//!
//! Validation is fail-closed: anything unparseable is rejected.

pub mod allowlist;
pub mod argument_policy;
pub mod shell_parser;
pub mod validator;
pub mod violation;

pub use allowlist::AllowedCommandSet;
pub use validator::{
    CommandInvocation, CommandValidator, ValidationDecision, extract_programs, validate_command,
};
pub use violation::PolicyViolation;
