//! Run history, message types, and per-step context assembly.

mod context;
mod history;
mod message;
mod page;

pub use context::{MessageBuilder, MessageBuilderConfig};
pub use history::{ActionRecord, AgentHistory, AgentStep, StepOutcome, Variable};
pub use message::{Message, MessageRole};
pub use page::PageHandle;
