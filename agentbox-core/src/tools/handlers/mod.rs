//! Built-in tool handlers and the router that dispatches to them.

pub mod browser_handler;
pub mod file_handlers;
pub mod router;
pub mod server_handler;
pub mod shell_handler;
pub mod tool_handler;

pub use browser_handler::{BrowserAction, BrowserHandler, SCREENSHOT_DIR};
pub use file_handlers::{
    BatchReadFilesHandler, ListDirectoryHandler, ReadFileHandler, TRUNCATION_MARKER,
    WriteFileHandler,
};
pub use router::{ToolRegistry, ToolRegistryBuilder, ToolRouter};
pub use server_handler::ManageServerHandler;
pub use shell_handler::RunCommandHandler;
pub use tool_handler::{
    JsonSchema, ToolCallError, ToolHandler, ToolInvocation, ToolOutput, ToolSpec, ToolStatus,
    describe_duration, parse_arguments,
};
