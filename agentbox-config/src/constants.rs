/// File looked up in the project root when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "agentbox.toml";

/// Environment variable that points at an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "AGENTBOX_CONFIG_PATH";

pub mod commands {
    /// Programs an agent may invoke when no override is configured.
    pub const DEFAULT_ALLOWED_COMMANDS: &[&str] = &[
        // File inspection
        "ls", "cat", "head", "tail", "wc", "grep", "find",
        // File operations
        "cp", "mkdir", "chmod", "pwd",
        // Node.js toolchain
        "npm", "npx", "node",
        // Version control
        "git",
        // Process inspection
        "ps", "lsof", "sleep", "pkill",
        // Project bootstrap script
        "init.sh",
    ];

    /// Process names that process-kill commands may target.
    pub const DEFAULT_DEV_PROCESS_NAMES: &[&str] = &["node", "npm", "npx", "vite", "next"];
}

pub mod timeouts {
    pub const COMMAND_SECONDS: u64 = 60;
    pub const SERVER_GRACE_MS: u64 = 3_000;
    pub const SERVER_STOP_SECONDS: u64 = 5;
    pub const FILE_IO_SECONDS: u64 = 30;
    pub const BROWSER_SECONDS: u64 = 30;
}

pub mod limits {
    pub const BATCH_READ_MAX_FILES: usize = 10;
    pub const BATCH_READ_MAX_CHARS: usize = 5_000;
    pub const READ_FILE_MAX_BYTES: usize = 1024 * 1024;
    pub const COMMAND_OUTPUT_MAX_BYTES: usize = 64 * 1024;
    pub const RECORD_OUTPUT_MAX_CHARS: usize = 500;
    pub const SERVER_OUTPUT_TAIL_BYTES: usize = 8 * 1024;
}

pub mod server {
    use crate::server::ExecutionMode;

    pub const DEFAULT_COMMAND: &str = "npm run dev";

    /// Ordered server-command table; the first matching pattern wins.
    pub const DEFAULT_PATTERNS: &[(&str, ExecutionMode)] = &[
        ("npx vite build", ExecutionMode::Blocking),
        ("npm run dev", ExecutionMode::Background),
        ("npm start", ExecutionMode::Background),
        ("npm run start", ExecutionMode::Background),
        ("node server", ExecutionMode::Background),
        ("node app", ExecutionMode::Background),
        ("node index", ExecutionMode::Background),
        ("npx next dev", ExecutionMode::Background),
        ("npx vite", ExecutionMode::Background),
        ("yarn dev", ExecutionMode::Background),
        ("yarn start", ExecutionMode::Background),
        ("pnpm dev", ExecutionMode::Background),
    ];
}
