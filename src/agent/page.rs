//! Read surface onto the live page.

use async_trait::async_trait;

/// The page reads the message builder performs at build time.
///
/// Deliberately narrow: current URL and open-tab URLs, nothing that
/// mutates the page. Browser-control code implements this over a real
/// session; tests implement it with canned values.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// URL of the document this page currently shows.
    async fn current_url(&self) -> String;

    /// URLs of every open page target, this one included.
    async fn tab_urls(&self) -> Vec<String>;
}
