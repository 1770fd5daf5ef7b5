//! Shared helpers reused by the agentbox component crates.
//!
//! Nothing in here knows about tools or commands; it only answers questions
//! like "does this path stay inside the project" and "how do I cut this text
//! down without splitting a character".

pub mod error_category;
pub mod paths;
pub mod text;

pub use error_category::ErrorCategory;
pub use paths::{PathError, canonicalize_workspace, normalize_path, resolve_within_root};
pub use text::{TruncatedText, truncate_chars};
