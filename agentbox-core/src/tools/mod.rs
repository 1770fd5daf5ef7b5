//! The tool surface exposed to agents.

pub mod browser;
pub mod classification;
pub mod dispatcher;
pub mod handlers;
pub mod record;

pub use browser::{BrowserDriver, PageSummary, ScreenshotOptions};
pub use classification::CommandClassifier;
pub use dispatcher::{ToolDispatcher, default_registry};
pub use handlers::{ToolCallError, ToolHandler, ToolInvocation, ToolOutput, ToolSpec, ToolStatus};
pub use record::ToolCallRecord;
