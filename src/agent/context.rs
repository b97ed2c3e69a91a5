//! Context message assembly for one reasoning step.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::history::{AgentHistory, AgentStep, Variable};
use super::message::Message;
use super::page::PageHandle;
use crate::debug::DebugSnapshot;
use crate::diag;
use crate::dom::{DomStateSnapshot, ScrollInfo};
use crate::tokens::TokenCounter;

/// Steps shown in the history section. Older steps collapse into the
/// omission marker; the stored history itself is never trimmed.
const STEP_TRIM_WINDOW: usize = 10;

/// Appended to state text that was cut to fit the token budget.
const TRUNCATION_NOTICE: &str = "\n[State text truncated to fit the context limit]";

/// Builder options.
#[derive(Debug, Clone)]
pub struct MessageBuilderConfig {
    /// Model context limit in tokens. The state message is truncated to
    /// what remains after the system messages.
    pub max_context_tokens: usize,
    /// Elements listed in the page-state section before eliding.
    pub max_listed_elements: usize,
    /// When set, every build writes a debug snapshot here.
    pub debug_dir: Option<PathBuf>,
}

impl Default for MessageBuilderConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 128_000,
            max_listed_elements: 100,
            debug_dir: None,
        }
    }
}

/// Assembles the ordered message list sent to the model each step.
///
/// Every build produces fresh messages from current state; nothing from a
/// previous build is patched or reused.
pub struct MessageBuilder {
    system_messages: Vec<Message>,
    task: String,
    counter: TokenCounter,
    config: MessageBuilderConfig,
}

impl MessageBuilder {
    pub fn new(
        system_messages: Vec<Message>,
        task: impl Into<String>,
        counter: TokenCounter,
        config: MessageBuilderConfig,
    ) -> Self {
        Self {
            system_messages,
            task: task.into(),
            counter,
            config,
        }
    }

    /// Build the full message list: the system messages followed by one
    /// user message holding the state text, with the screenshot reference
    /// in its metadata.
    ///
    /// Section order within the state text is fixed: task, current URL,
    /// open tabs, page state (pixels above, elements, pixels below), user
    /// variables (omitted when empty), step history.
    pub async fn build(
        &self,
        page: &dyn PageHandle,
        snapshot: &DomStateSnapshot,
        scroll: ScrollInfo,
        history: &AgentHistory,
        variables: &[Variable],
        screenshot: Option<&str>,
    ) -> Vec<Message> {
        let url = page.current_url().await;
        let tabs = page.tab_urls().await;

        let mut sections: Vec<String> = Vec::new();
        sections.push(format!("Your task: {}", self.task));
        sections.push(format!("Current url: {url}"));
        sections.push(render_tabs(&tabs));
        sections.push(render_page_state(
            snapshot,
            scroll,
            self.config.max_listed_elements,
        ));
        if !variables.is_empty() {
            sections.push(render_variables(variables));
        }
        sections.push(render_history(history));

        let state = sections.join("\n\n");
        let budget = self.state_budget();
        let state = self
            .counter
            .truncate_to_token_limit(&state, budget, TRUNCATION_NOTICE);

        let mut user = Message::user(state);
        if let Some(reference) = screenshot {
            user = user.with_metadata("screenshot", Value::String(reference.to_string()));
        }

        let mut messages = self.system_messages.clone();
        messages.push(user);

        if let Some(dir) = &self.config.debug_dir {
            self.write_debug_snapshot(dir, &messages).await;
        }

        messages
    }

    /// Tokens left for the state text once the system messages are paid.
    fn state_budget(&self) -> usize {
        let reserved: usize = self
            .system_messages
            .iter()
            .map(|message| self.counter.count_tokens(&message.content))
            .sum();
        self.config.max_context_tokens.saturating_sub(reserved)
    }

    async fn write_debug_snapshot(&self, dir: &Path, messages: &[Message]) {
        let state = messages
            .last()
            .map(|message| message.content.as_str())
            .unwrap_or_default();
        let mut snapshot = DebugSnapshot::new()
            .section("task", self.task.as_str())
            .section("state", state);
        match serde_json::to_value(messages) {
            Ok(serialized) => snapshot = snapshot.section("messages", serialized),
            Err(e) => warn!(
                "Messages did not serialize for the debug snapshot: {}",
                diag::describe_error(&e)
            ),
        }
        let written = snapshot.write_to(dir).await;
        debug!(
            "Wrote {} debug snapshot sections to {}",
            written.len(),
            dir.display()
        );
    }
}

fn render_tabs(tabs: &[String]) -> String {
    let mut block = String::from("Open tabs:");
    if tabs.is_empty() {
        block.push_str("\n- (none)");
    } else {
        for url in tabs {
            block.push_str(&format!("\n- {url}"));
        }
    }
    block
}

fn render_page_state(snapshot: &DomStateSnapshot, scroll: ScrollInfo, max_listed: usize) -> String {
    let mut block = String::from("Page state:\n");
    block.push_str(&format!(
        "... {} pixels above - scroll up to see more ...\n",
        scroll.pixels_above
    ));
    block.push_str(&snapshot.element_listing(max_listed));
    block.push_str(&format!(
        "... {} pixels below - scroll down to see more ...",
        scroll.pixels_below
    ));
    block
}

fn render_variables(variables: &[Variable]) -> String {
    let mut block = String::from("User variables:");
    for variable in variables {
        block.push_str(&format!(
            "\n<<{}>> - {} | current value: {}",
            variable.key, variable.description, variable.value
        ));
    }
    block
}

fn render_history(history: &AgentHistory) -> String {
    let steps = history.steps();
    let total = steps.len();
    let mut block = if total > STEP_TRIM_WINDOW {
        format!(
            "Step history (latest {STEP_TRIM_WINDOW} of {total} steps, {} older steps omitted):",
            total - STEP_TRIM_WINDOW
        )
    } else {
        String::from("Step history:")
    };
    if steps.is_empty() {
        block.push_str("\n(no steps yet)");
        return block;
    }
    for step in &steps[total.saturating_sub(STEP_TRIM_WINDOW)..] {
        block.push_str(&render_step(step));
    }
    block
}

fn render_step(step: &AgentStep) -> String {
    let status = if step.outcome.success { "ok" } else { "failed" };
    format!(
        "\n[Step {}] {}\n  action: {} {}\n  memory: {}\n  result ({status}): {}",
        step.index,
        step.thoughts,
        step.action.kind,
        step.action.params,
        step.memory,
        step.outcome.message
    )
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
