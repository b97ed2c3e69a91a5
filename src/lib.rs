//! Browser page state tracking and LLM context assembly over the Chrome
//! DevTools Protocol (CDP).
//!
//! Maintains a cached, invalidation-driven picture of the DOM behind an
//! agent run and turns it into the ordered message list a model consumes
//! each step. Pure Rust, talking CDP over a WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐    WebSocket     ┌──────────────────┐
//! │   Agent loop     │ ◄──────────────► │   Chrome/Edge    │
//! │   (this crate)   │       CDP        │  (live browser)  │
//! └──────────────────┘                  └──────────────────┘
//! ```
//!
//! ## Setup
//!
//! Start Chrome with remote debugging enabled:
//!
//! ```bash
//! google-chrome --remote-debugging-port=9222
//! ```
//!
//! Then connect to the browser endpoint and attach to a page target:
//!
//! ```text
//! CdpConnection::connect  →  connection.attach(target)  →  CdpSession
//! ```
//!
//! ## Layers
//!
//! - [`cdp`] - WebSocket transport, flat-session multiplexing, typed
//!   protocol payloads
//! - [`dom`] - backend-id element maps, bounding boxes, scroll metrics,
//!   and the per-page snapshot cache
//! - [`agent`] - run history, chat messages, and the per-step message
//!   builder
//! - [`tokens`] - deterministic token counting and budget truncation
//! - [`debug`] - crash-proof debug snapshot files
//!
//! ## Caching
//!
//! DOM state is NOT refetched per read. [`dom::DomStateCache`] builds the
//! backend-id maps once and serves them until an explicit `invalidate`,
//! which navigation and mutation handlers call; the next read rebuilds.
//! Bounding boxes resolve lazily and memoize within one generation.

// The nested document fixtures in the test suite expand past the default
// macro recursion depth.
#![recursion_limit = "256"]

pub mod agent;
pub mod cdp;
pub mod debug;
pub mod diag;
pub mod dom;
pub mod tokens;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{
    ActionRecord, AgentHistory, AgentStep, Message, MessageBuilder, MessageBuilderConfig,
    MessageRole, PageHandle, StepOutcome, Variable,
};
pub use cdp::{CdpConnection, CdpError, CdpPage, CdpSession, ConnectionConfig, ProtocolSession};
pub use debug::{DebugSnapshot, SnapshotValue};
pub use dom::{
    build_backend_maps, read_scroll_info, resolve_bounding_box, BackendIdMaps, BackendNodeId,
    BoundingBox, DomStateCache, DomStateSnapshot, NodeDescriptor, ScrollInfo,
};
pub use tokens::{TokenCounter, TokenizerError};
