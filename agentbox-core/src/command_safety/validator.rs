use std::collections::BTreeSet;
use std::path::Path;

use agentbox_config::CommandsConfig;
use agentbox_config::constants::commands::DEFAULT_DEV_PROCESS_NAMES;
use serde::Serialize;
use tracing::debug;

use super::allowlist::AllowedCommandSet;
use super::argument_policy::{SHELL_INTERPRETERS, check_arguments};
use super::shell_parser::{split_segments, tokenize_segment};
use super::violation::PolicyViolation;

/// `bash -c "bash -c '...'"` is followed this many levels before giving up.
const MAX_SCRIPT_DEPTH: usize = 3;

/// One program invocation extracted from a segment of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// The program token as written, e.g. `./init.sh` or `/usr/bin/node`.
    pub program: String,
    pub arguments: Vec<String>,
    pub raw_text: String,
}

impl CommandInvocation {
    /// Tokenize `segment`, skipping leading `NAME=VALUE` assignments.
    pub fn parse(segment: &str) -> Result<Self, PolicyViolation> {
        let tokens = tokenize_segment(segment)?;
        let mut tokens = tokens
            .into_iter()
            .skip_while(|token| is_env_assignment(token));

        let program = tokens
            .next()
            .filter(|program| !program.is_empty())
            .ok_or_else(|| PolicyViolation::MissingProgram {
                segment: segment.to_string(),
            })?;

        Ok(Self {
            program,
            arguments: tokens.collect(),
            raw_text: segment.to_string(),
        })
    }

    /// Final path component of the program; `/usr/bin/node` and `node` share
    /// one policy.
    pub fn policy_key(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.program)
    }
}

fn is_env_assignment(token: &str) -> bool {
    let Some((name, _)) = token.split_once('=') else {
        return false;
    };
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Outcome of validating one command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

impl From<Result<(), PolicyViolation>> for ValidationDecision {
    fn from(result: Result<(), PolicyViolation>) -> Self {
        match result {
            Ok(()) => Self::allow(),
            Err(violation) => Self::reject(violation.to_string()),
        }
    }
}

/// Allowlist plus per-command structural policy.
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    allowed: AllowedCommandSet,
    dev_process_names: BTreeSet<String>,
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::new(AllowedCommandSet::defaults())
    }
}

impl CommandValidator {
    pub fn new(allowed: AllowedCommandSet) -> Self {
        Self {
            allowed,
            dev_process_names: DEFAULT_DEV_PROCESS_NAMES
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        }
    }

    pub fn from_config(config: &CommandsConfig) -> Self {
        Self::new(AllowedCommandSet::from_config(config))
            .with_dev_process_names(config.dev_process_names.iter().cloned())
    }

    pub fn with_dev_process_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.dev_process_names = names.into_iter().collect();
        self
    }

    pub fn allowed(&self) -> &AllowedCommandSet {
        &self.allowed
    }

    pub fn validate(&self, command: &str) -> ValidationDecision {
        let result = self.check(command).map(|_| ());
        match &result {
            Ok(()) => debug!(command, "command allowed"),
            Err(violation) => debug!(command, reason = %violation, "command rejected"),
        }
        result.into()
    }

    /// Validate every segment of `command`, returning the parsed invocations
    /// on success or the first violation.
    pub fn check(&self, command: &str) -> Result<Vec<CommandInvocation>, PolicyViolation> {
        self.check_at_depth(command, 0)
    }

    fn check_at_depth(
        &self,
        command: &str,
        depth: usize,
    ) -> Result<Vec<CommandInvocation>, PolicyViolation> {
        if depth > MAX_SCRIPT_DEPTH {
            return Err(PolicyViolation::NestingTooDeep {
                depth: MAX_SCRIPT_DEPTH,
            });
        }

        let invocations = parse_invocations(command)?;
        for invocation in &invocations {
            let program = invocation.policy_key();
            if !self.allowed.contains(program) {
                return Err(PolicyViolation::NotAllowed {
                    program: program.to_string(),
                });
            }
            check_arguments(invocation, &self.dev_process_names)?;

            if let Some(script) = inline_script(invocation) {
                self.check_at_depth(script, depth + 1)?;
            }
        }
        Ok(invocations)
    }
}

fn parse_invocations(command: &str) -> Result<Vec<CommandInvocation>, PolicyViolation> {
    if command.trim().is_empty() {
        return Err(PolicyViolation::EmptyCommand);
    }
    let segments = split_segments(command)?;
    if segments.is_empty() {
        return Err(PolicyViolation::EmptyCommand);
    }
    segments
        .iter()
        .map(|segment| CommandInvocation::parse(segment))
        .collect()
}

/// Script passed to an allowlisted interpreter via `-c` (or a cluster such as
/// `-lc`), which must pass the same policy as a top-level command.
fn inline_script(invocation: &CommandInvocation) -> Option<&str> {
    if !SHELL_INTERPRETERS.contains(&invocation.policy_key()) {
        return None;
    }
    let mut args = invocation.arguments.iter();
    while let Some(arg) = args.next() {
        let is_command_flag = arg
            .strip_prefix('-')
            .is_some_and(|flags| !flags.starts_with('-') && flags.contains('c'));
        if is_command_flag {
            return args.next().map(String::as_str);
        }
    }
    None
}

/// Validate `command` against `allowed` with the default dev process names.
pub fn validate_command(command: &str, allowed: &AllowedCommandSet) -> ValidationDecision {
    CommandValidator::new(allowed.clone()).validate(command)
}

/// Policy keys of every segment in `command`, in order.
pub fn extract_programs(command: &str) -> Result<Vec<String>, PolicyViolation> {
    Ok(parse_invocations(command)?
        .iter()
        .map(|invocation| invocation.policy_key().to_string())
        .collect())
}
