use thiserror::Error;

/// Reason a command line was rejected.
///
/// The `Display` output is the human-readable reason surfaced to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("empty command")]
    EmptyCommand,

    #[error("no program found in '{segment}'")]
    MissingProgram { segment: String },

    #[error("could not parse '{segment}': {reason}")]
    Unparseable { segment: String, reason: String },

    #[error("unterminated quote in command")]
    UnterminatedQuote,

    #[error("command substitution ($(...) or backticks) is not allowed")]
    CommandSubstitution,

    #[error("process substitution (<(...) or >(...)) is not allowed")]
    ProcessSubstitution,

    #[error("command '{program}' is not in the allowed commands list")]
    NotAllowed { program: String },

    #[error("chmod -R/--recursive is not allowed")]
    ChmodRecursive,

    #[error("chmod option '{option}' is not allowed")]
    ChmodOption { option: String },

    #[error("numeric chmod mode '{mode}' is not allowed; only +x is permitted")]
    ChmodNumericMode { mode: String },

    #[error("chmod mode '{mode}' is not allowed; only +x is permitted")]
    ChmodMode { mode: String },

    #[error("chmod requires a mode")]
    ChmodMissingMode,

    #[error("chmod requires at least one file")]
    ChmodMissingFile,

    #[error("find {action} is not allowed")]
    FindAction { action: String },

    #[error("find requires an explicit path ('.' or './subdir')")]
    FindMissingPath,

    #[error("find path '{path}' must be '.' or start with './' and must not contain '..'")]
    FindPath { path: String },

    #[error("init.sh must be invoked by a literal path, not '{program}'")]
    InitScriptPath { program: String },

    #[error("init.sh must be executed directly, not through {interpreter}")]
    InitScriptViaInterpreter { interpreter: String },

    #[error("kill by PID is not allowed; use pkill with a development process name")]
    KillByPid,

    #[error("{program} requires a process name")]
    KillMissingTarget { program: String },

    #[error("{program} option '{option}' is not allowed")]
    KillOption { program: String, option: String },

    #[error("{program} may only target development processes, not '{target}'")]
    KillTarget { program: String, target: String },

    #[error("shell scripts nested deeper than {depth} levels are not allowed")]
    NestingTooDeep { depth: usize },
}
