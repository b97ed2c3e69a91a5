//! Live page handle over a CDP connection and session.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::warn;

use super::connection::CdpConnection;
use super::error::CdpError;
use super::session::{CdpSession, ProtocolSession};
use crate::agent::PageHandle;
use crate::diag;

/// [`PageHandle`] implementation reading straight from the browser.
///
/// Both reads degrade on protocol failure (placeholder URL, empty tab list)
/// with a logged diagnostic, so message building stays total.
pub struct CdpPage {
    connection: Arc<CdpConnection>,
    session: Arc<CdpSession>,
}

impl CdpPage {
    /// Create a page handle for an attached session.
    pub fn new(connection: Arc<CdpConnection>, session: Arc<CdpSession>) -> Self {
        Self {
            connection,
            session,
        }
    }

    /// The underlying session.
    pub fn session(&self) -> &Arc<CdpSession> {
        &self.session
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .session
            .send(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                })),
            )
            .await?;
        Ok(result["result"]["value"].clone())
    }
}

#[async_trait]
impl PageHandle for CdpPage {
    async fn current_url(&self) -> String {
        match self.evaluate("window.location.href").await {
            Ok(value) => url_from_value(value),
            Err(e) => {
                warn!("Reading page URL failed: {}", diag::describe_error(&e));
                "about:blank".to_string()
            }
        }
    }

    async fn tab_urls(&self) -> Vec<String> {
        match self.connection.page_targets().await {
            Ok(targets) => targets.into_iter().map(|t| t.url).collect(),
            Err(e) => {
                warn!("Listing open tabs failed: {}", diag::describe_error(&e));
                Vec::new()
            }
        }
    }
}

/// Unwrap an evaluated `window.location.href` result.
///
/// A detached or crashed frame can evaluate to undefined, and a shadowed
/// binding to an arbitrary object; both degrade to the placeholder with the
/// same warning the protocol-failure path gets.
fn url_from_value(value: Value) -> String {
    match value {
        Value::String(url) => url,
        other => {
            warn!(
                "Reading page URL returned a non-string: {}",
                diag::describe(&other)
            );
            "about:blank".to_string()
        }
    }
}
