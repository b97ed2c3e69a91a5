//! CDP protocol types and message definitions.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP response message.
///
/// Covers both command responses (`id` set) and events (`method` set). The
/// error payload stays untyped here: browsers occasionally reject with
/// shapes that are not the documented `{code, message}` object, and those
/// must still reach the diagnostic formatter instead of failing the parse.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<Value>,
    pub method: Option<String>,
    pub params: Option<Value>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// The documented CDP error shape.
#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
    pub data: Option<String>,
}

/// Target info from CDP.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub title: String,
    pub url: String,
    pub attached: Option<bool>,
    pub browser_context_id: Option<String>,
}

// ============================================================================
// DOM Types
// ============================================================================

/// DOM node from `DOM.getDocument`.
///
/// Only the fields the map builder walks; Chrome sends more and serde drops
/// the rest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    pub node_id: i64,
    pub backend_node_id: i64,
    pub node_type: i64,
    pub node_name: String,
    pub local_name: Option<String>,
    pub children: Option<Vec<DomNode>>,
    pub attributes: Option<Vec<String>>,
    pub frame_id: Option<String>,
    pub content_document: Option<Box<DomNode>>,
    pub shadow_roots: Option<Vec<DomNode>>,
}

impl DomNode {
    /// Element node type constant from the DOM spec.
    pub const ELEMENT_NODE: i64 = 1;

    /// Document node type constant from the DOM spec.
    pub const DOCUMENT_NODE: i64 = 9;

    /// Lowercase tag name. Chrome reports `nodeName` uppercased for HTML
    /// elements; `localName` is already lowercase when present.
    pub fn tag_name(&self) -> String {
        match &self.local_name {
            Some(local) if !local.is_empty() => local.clone(),
            _ => self.node_name.to_lowercase(),
        }
    }

    /// Whether this node is an element.
    pub fn is_element(&self) -> bool {
        self.node_type == Self::ELEMENT_NODE
    }

    /// Whether this node is a document (top-level or frame-owned).
    pub fn is_document(&self) -> bool {
        self.node_type == Self::DOCUMENT_NODE
    }
}

// ============================================================================
// Layout Types
// ============================================================================

/// Visual viewport from `Page.getLayoutMetrics`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualViewport {
    pub page_x: f64,
    pub page_y: f64,
    pub client_width: f64,
    pub client_height: f64,
}

/// Content size rect from `Page.getLayoutMetrics`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSize {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

// ============================================================================
// Accessibility Types
// ============================================================================

/// AX node from the Accessibility domain.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AXNode {
    pub node_id: String,
    pub ignored: bool,
    pub role: Option<AXValue>,
    pub name: Option<AXValue>,
    pub child_ids: Option<Vec<String>>,
    // camelCase would derive backendDomNodeId; the wire key uppercases DOM.
    #[serde(rename = "backendDOMNodeId")]
    pub backend_dom_node_id: Option<i64>,
}

impl AXNode {
    /// The computed accessible name, when present and non-empty.
    pub fn accessible_name(&self) -> Option<&str> {
        let name = self.name.as_ref()?.value.as_ref()?.as_str()?;
        if name.is_empty() { None } else { Some(name) }
    }
}

/// AX value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AXValue {
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: Option<Value>,
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
