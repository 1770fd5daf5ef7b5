//! Browser actions routed to the context's [`BrowserDriver`].

use std::collections::BTreeMap;
use std::time::Duration;

use agentbox_commons::resolve_within_root;
use anyhow::Context as _;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::tool_handler::{
    JsonSchema, ToolCallError, ToolHandler, ToolInvocation, ToolOutput, ToolSpec, parse_arguments,
};
use crate::context::AgentContext;
use crate::tools::browser::{BrowserDriver, ScreenshotOptions};

/// Directory under the project root where screenshots are written.
pub const SCREENSHOT_DIR: &str = "screenshots";

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserAction {
    Navigate,
    Screenshot,
    Click,
    Fill,
    Evaluate,
    Close,
}

impl BrowserAction {
    pub const ALL: [BrowserAction; 6] = [
        Self::Navigate,
        Self::Screenshot,
        Self::Click,
        Self::Fill,
        Self::Evaluate,
        Self::Close,
    ];

    pub const fn tool_name(self) -> &'static str {
        match self {
            Self::Navigate => "browser_navigate",
            Self::Screenshot => "browser_screenshot",
            Self::Click => "browser_click",
            Self::Fill => "browser_fill",
            Self::Evaluate => "browser_evaluate",
            Self::Close => "browser_close",
        }
    }
}

#[derive(Debug, Deserialize)]
struct NavigateArgs {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SelectorArgs {
    selector: String,
}

#[derive(Debug, Deserialize)]
struct FillArgs {
    selector: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct EvaluateArgs {
    script: String,
}

/// One handler per action, all sharing the driver from the context.
pub struct BrowserHandler {
    action: BrowserAction,
}

impl BrowserHandler {
    pub fn new(action: BrowserAction) -> Self {
        Self { action }
    }

    async fn save_screenshot(
        context: &AgentContext,
        driver: &dyn BrowserDriver,
        options: ScreenshotOptions,
    ) -> Result<ToolOutput, ToolCallError> {
        let bytes = driver.screenshot(options).await?;
        let file_name = format!("screenshot_{}.png", Utc::now().format("%Y%m%d_%H%M%S_%3f"));
        let path = resolve_within_root(
            context.project_root(),
            &format!("{SCREENSHOT_DIR}/{file_name}"),
        )?;
        if let Some(directory) = path.parent() {
            tokio::fs::create_dir_all(directory)
                .await
                .with_context(|| format!("failed to create {}", directory.display()))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        let encoded = BASE64.encode(&bytes);
        let preview: String = encoded.chars().take(PREVIEW_CHARS).collect();
        Ok(ToolOutput::success(format!(
            "Screenshot saved to {SCREENSHOT_DIR}/{file_name} ({} bytes)\nBase64 preview: {preview}...",
            bytes.len()
        )))
    }
}

#[async_trait]
impl ToolHandler for BrowserHandler {
    fn spec(&self) -> ToolSpec {
        let name = self.action.tool_name();
        let mut properties = BTreeMap::new();
        let (description, required) = match self.action {
            BrowserAction::Navigate => {
                properties.insert("url".to_string(), JsonSchema::string("URL to open"));
                ("Open a URL in the browser.", vec!["url"])
            }
            BrowserAction::Screenshot => {
                properties.insert(
                    "full_page".to_string(),
                    JsonSchema::boolean("Capture the full scrollable page"),
                );
                ("Capture a PNG screenshot of the current page.", Vec::new())
            }
            BrowserAction::Click => {
                properties.insert(
                    "selector".to_string(),
                    JsonSchema::string("CSS selector of the element"),
                );
                ("Click an element.", vec!["selector"])
            }
            BrowserAction::Fill => {
                properties.insert(
                    "selector".to_string(),
                    JsonSchema::string("CSS selector of the input"),
                );
                properties.insert("value".to_string(), JsonSchema::string("Text to enter"));
                ("Fill an input field.", vec!["selector", "value"])
            }
            BrowserAction::Evaluate => {
                properties.insert(
                    "script".to_string(),
                    JsonSchema::string("JavaScript expression to evaluate"),
                );
                ("Evaluate JavaScript in the page.", vec!["script"])
            }
            BrowserAction::Close => ("Close the browser.", Vec::new()),
        };
        ToolSpec::new(name, description).with_parameters(JsonSchema::object(properties, required))
    }

    fn validate_arguments(&self, arguments: &Value) -> Result<(), ToolCallError> {
        match self.action {
            BrowserAction::Navigate => parse_arguments::<NavigateArgs>(arguments).map(|_| ()),
            BrowserAction::Click => parse_arguments::<SelectorArgs>(arguments).map(|_| ()),
            BrowserAction::Fill => parse_arguments::<FillArgs>(arguments).map(|_| ()),
            BrowserAction::Evaluate => parse_arguments::<EvaluateArgs>(arguments).map(|_| ()),
            BrowserAction::Screenshot | BrowserAction::Close => Ok(()),
        }
    }

    fn timeout(&self, context: &AgentContext) -> Option<Duration> {
        Some(context.config().timeouts.browser_timeout())
    }

    async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolCallError> {
        let context = &invocation.context;
        let Some(driver) = context.browser() else {
            if self.action == BrowserAction::Close {
                return Ok(ToolOutput::success("No browser session is open."));
            }
            return Err(ToolCallError::Unavailable(
                "Browser automation (no browser driver is configured)".to_string(),
            ));
        };
        let arguments = &invocation.arguments;

        match self.action {
            BrowserAction::Navigate => {
                let args: NavigateArgs = parse_arguments(arguments)?;
                let page = driver.navigate(&args.url).await?;
                let title = page.title.as_deref().unwrap_or("(untitled)");
                Ok(ToolOutput::success(format!(
                    "Navigated to {}\nTitle: {title}",
                    page.url
                )))
            }
            BrowserAction::Screenshot => {
                let options = if arguments.is_null() {
                    ScreenshotOptions::default()
                } else {
                    parse_arguments(arguments)?
                };
                Self::save_screenshot(context, driver.as_ref(), options).await
            }
            BrowserAction::Click => {
                let args: SelectorArgs = parse_arguments(arguments)?;
                driver.click(&args.selector).await?;
                Ok(ToolOutput::success(format!("Clicked {}", args.selector)))
            }
            BrowserAction::Fill => {
                let args: FillArgs = parse_arguments(arguments)?;
                driver.fill(&args.selector, &args.value).await?;
                Ok(ToolOutput::success(format!("Filled {}", args.selector)))
            }
            BrowserAction::Evaluate => {
                let args: EvaluateArgs = parse_arguments(arguments)?;
                let value = driver.evaluate(&args.script).await?;
                let rendered = serde_json::to_string_pretty(&value)
                    .unwrap_or_else(|_| value.to_string());
                Ok(ToolOutput::success(rendered))
            }
            BrowserAction::Close => {
                driver.close().await?;
                Ok(ToolOutput::success("Browser closed."))
            }
        }
    }
}
