//! File tools confined to the project root.
//!
//! Every requested path goes through `resolve_within_root`, which rejects
//! traversal and symlink escapes before any I/O happens.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agentbox_commons::{resolve_within_root, truncate_chars};
use agentbox_config::constants::CONFIG_FILE_NAME;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncReadExt;

use super::tool_handler::{
    JsonSchema, ToolCallError, ToolHandler, ToolInvocation, ToolOutput, ToolSpec, parse_arguments,
};
use crate::context::AgentContext;

/// Appended wherever file content was cut short.
pub const TRUNCATION_MARKER: &str = "\n... (truncated, file too large)";

fn resolve(context: &AgentContext, requested: &str) -> Result<PathBuf, ToolCallError> {
    Ok(resolve_within_root(context.project_root(), requested)?)
}

/// Like [`resolve`], also refusing the workspace configuration file, which
/// is reloaded on every CLI call and would let an agent widen its own policy.
fn resolve_writable(context: &AgentContext, requested: &str) -> Result<PathBuf, ToolCallError> {
    let path = resolve(context, requested)?;
    let is_config = path.parent() == Some(context.project_root())
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.eq_ignore_ascii_case(CONFIG_FILE_NAME));
    if is_config {
        return Err(ToolCallError::AccessDenied(format!(
            "Writing {CONFIG_FILE_NAME} is not allowed"
        )));
    }
    Ok(path)
}

fn io_error(action: &str, requested: &str, error: std::io::Error) -> ToolCallError {
    match error.kind() {
        ErrorKind::NotFound => ToolCallError::NotFound(format!("File not found: {requested}")),
        ErrorKind::PermissionDenied => {
            ToolCallError::AccessDenied(format!("Permission denied: {requested}"))
        }
        _ => ToolCallError::execution(format!("Failed to {action} '{requested}': {error}")),
    }
}

/// Read at most `max_bytes` of `path`; the flag reports whether more existed.
async fn read_bounded(
    path: &Path,
    requested: &str,
    max_bytes: usize,
) -> Result<(String, bool), ToolCallError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|err| io_error("read", requested, err))?;
    if metadata.is_dir() {
        return Err(ToolCallError::invalid(format!(
            "'{requested}' is a directory; use list_directory instead"
        )));
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|err| io_error("read", requested, err))?;
    let mut bytes = Vec::new();
    file.take(u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1))
        .read_to_end(&mut bytes)
        .await
        .map_err(|err| io_error("read", requested, err))?;

    let truncated = bytes.len() > max_bytes;
    bytes.truncate(max_bytes);
    Ok((String::from_utf8_lossy(&bytes).into_owned(), truncated))
}

#[derive(Debug, Deserialize)]
struct PathArgs {
    path: String,
}

pub struct ReadFileHandler;

#[async_trait]
impl ToolHandler for ReadFileHandler {
    fn spec(&self) -> ToolSpec {
        let mut properties = BTreeMap::new();
        properties.insert(
            "path".to_string(),
            JsonSchema::string("Path relative to the project root"),
        );
        ToolSpec::new("read_file", "Read a text file from the project.")
            .with_parameters(JsonSchema::object(properties, vec!["path"]))
    }

    fn validate_arguments(&self, arguments: &Value) -> Result<(), ToolCallError> {
        parse_arguments::<PathArgs>(arguments).map(|_| ())
    }

    fn timeout(&self, context: &AgentContext) -> Option<Duration> {
        Some(context.config().timeouts.file_io_timeout())
    }

    async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolCallError> {
        let args: PathArgs = parse_arguments(&invocation.arguments)?;
        let context = &invocation.context;
        let path = resolve(context, &args.path)?;
        let max_bytes = context.config().limits.read_file_max_bytes;

        let (mut content, truncated) = read_bounded(&path, &args.path, max_bytes).await?;
        if truncated {
            content.push_str(TRUNCATION_MARKER);
        }
        Ok(ToolOutput::success(content))
    }
}

#[derive(Debug, Deserialize)]
struct BatchReadArgs {
    paths: Vec<String>,
}

pub struct BatchReadFilesHandler;

impl BatchReadFilesHandler {
    async fn read_one(context: &AgentContext, requested: &str) -> String {
        let limits = &context.config().limits;
        let result = match resolve(context, requested) {
            Ok(path) => read_bounded(&path, requested, limits.read_file_max_bytes).await,
            Err(err) => Err(err),
        };
        match result {
            Ok((content, bytes_truncated)) => {
                let bounded = truncate_chars(&content, limits.batch_read_max_chars, TRUNCATION_MARKER);
                if bytes_truncated && !bounded.truncated {
                    format!("{}{TRUNCATION_MARKER}", bounded.text)
                } else {
                    bounded.text
                }
            }
            Err(err) => format!("Error: {err}"),
        }
    }
}

#[async_trait]
impl ToolHandler for BatchReadFilesHandler {
    fn spec(&self) -> ToolSpec {
        let mut properties = BTreeMap::new();
        properties.insert(
            "paths".to_string(),
            JsonSchema::array_of(
                JsonSchema::string("Path relative to the project root"),
                "Files to read; only the first few are read per call",
            ),
        );
        ToolSpec::new(
            "batch_read_files",
            "Read several files at once. Large files are truncated.",
        )
        .with_parameters(JsonSchema::object(properties, vec!["paths"]))
    }

    fn validate_arguments(&self, arguments: &Value) -> Result<(), ToolCallError> {
        let args: BatchReadArgs = parse_arguments(arguments)?;
        if args.paths.is_empty() {
            return Err(ToolCallError::invalid("'paths' must contain at least one path"));
        }
        Ok(())
    }

    fn timeout(&self, context: &AgentContext) -> Option<Duration> {
        Some(context.config().timeouts.file_io_timeout())
    }

    async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolCallError> {
        let args: BatchReadArgs = parse_arguments(&invocation.arguments)?;
        let context = &invocation.context;
        let max_files = context.config().limits.batch_read_max_files;

        let mut sections = Vec::new();
        for requested in args.paths.iter().take(max_files) {
            let body = Self::read_one(context, requested).await;
            sections.push(format!("=== {requested} ===\n{body}"));
        }

        let skipped = args.paths.len().saturating_sub(max_files);
        if skipped > 0 {
            sections.push(format!(
                "({skipped} more path(s) skipped; at most {max_files} files are read per call)"
            ));
        }
        Ok(ToolOutput::success(sections.join("\n\n")))
    }
}

#[derive(Debug, Deserialize)]
struct WriteFileArgs {
    path: String,
    content: String,
}

pub struct WriteFileHandler;

#[async_trait]
impl ToolHandler for WriteFileHandler {
    fn spec(&self) -> ToolSpec {
        let mut properties = BTreeMap::new();
        properties.insert(
            "path".to_string(),
            JsonSchema::string("Path relative to the project root"),
        );
        properties.insert(
            "content".to_string(),
            JsonSchema::string("Full file content to write"),
        );
        ToolSpec::new(
            "write_file",
            "Create or overwrite a file. Parent directories are created as needed.",
        )
        .with_parameters(JsonSchema::object(properties, vec!["path", "content"]))
    }

    fn validate_arguments(&self, arguments: &Value) -> Result<(), ToolCallError> {
        parse_arguments::<WriteFileArgs>(arguments).map(|_| ())
    }

    fn timeout(&self, context: &AgentContext) -> Option<Duration> {
        Some(context.config().timeouts.file_io_timeout())
    }

    async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolCallError> {
        let args: WriteFileArgs = parse_arguments(&invocation.arguments)?;
        let path = resolve_writable(&invocation.context, &args.path)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| io_error("create directories for", &args.path, err))?;
        }
        tokio::fs::write(&path, args.content.as_bytes())
            .await
            .map_err(|err| io_error("write", &args.path, err))?;

        Ok(ToolOutput::success(format!(
            "Successfully wrote {} bytes to {}",
            args.content.len(),
            args.path
        )))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListDirectoryArgs {
    #[serde(default)]
    path: Option<String>,
}

pub struct ListDirectoryHandler;

#[async_trait]
impl ToolHandler for ListDirectoryHandler {
    fn spec(&self) -> ToolSpec {
        let mut properties = BTreeMap::new();
        properties.insert(
            "path".to_string(),
            JsonSchema::string("Directory relative to the project root (default '.')"),
        );
        ToolSpec::new(
            "list_directory",
            "List a directory. Subdirectories end with '/'.",
        )
        .with_parameters(JsonSchema::object(properties, Vec::new()))
    }

    fn validate_arguments(&self, arguments: &Value) -> Result<(), ToolCallError> {
        if arguments.is_null() {
            return Ok(());
        }
        parse_arguments::<ListDirectoryArgs>(arguments).map(|_| ())
    }

    fn timeout(&self, context: &AgentContext) -> Option<Duration> {
        Some(context.config().timeouts.file_io_timeout())
    }

    async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolCallError> {
        let args: ListDirectoryArgs = if invocation.arguments.is_null() {
            ListDirectoryArgs::default()
        } else {
            parse_arguments(&invocation.arguments)?
        };
        let requested = args.path.as_deref().unwrap_or(".");
        let path = resolve(&invocation.context, requested)?;

        let metadata = tokio::fs::metadata(&path).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => ToolCallError::NotFound(format!("Directory not found: {requested}")),
            _ => io_error("list", requested, err),
        })?;
        if !metadata.is_dir() {
            return Err(ToolCallError::invalid(format!(
                "'{requested}' is not a directory"
            )));
        }

        let mut reader = tokio::fs::read_dir(&path)
            .await
            .map_err(|err| io_error("list", requested, err))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| io_error("list", requested, err))?
        {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.is_ok_and(|kind| kind.is_dir()) {
                name.push('/');
            }
            entries.push(name);
        }

        if entries.is_empty() {
            return Ok(ToolOutput::success("(empty directory)"));
        }
        entries.sort();
        Ok(ToolOutput::success(entries.join("\n")))
    }
}
