//! Seam for browser automation.
//!
//! The sandbox only routes browser actions; a concrete driver (CDP, a
//! Playwright bridge, a test double) is supplied by the embedding agent.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page reached by a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub url: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotOptions {
    #[serde(default)]
    pub full_page: bool,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<PageSummary>;

    /// PNG bytes of the current page.
    async fn screenshot(&self, options: ScreenshotOptions) -> Result<Vec<u8>>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<Value>;

    async fn close(&self) -> Result<()>;
}
