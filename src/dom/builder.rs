//! Backend-id map construction from a live document.

use std::collections::HashMap;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use super::maps::{BackendIdMaps, NodeDescriptor};
use crate::cdp::protocol::{AXNode, DomNode};
use crate::cdp::{CdpError, ProtocolSession};
use crate::diag;

/// Failures inside a map build. They never leave this module:
/// [`build_backend_maps`] recovers every one of them to an empty bundle.
#[derive(Debug, Error)]
enum BuildError {
    #[error(transparent)]
    Protocol(#[from] CdpError),
    #[error("Malformed protocol payload: {0}")]
    Malformed(String),
}

/// Build the full backend-id map bundle for the session's current document.
///
/// One `DOM.getDocument` fetch pierces every frame and shadow root, then
/// accessibility trees are fetched per discovered frame, sequentially in
/// discovery order. A failure at any step degrades the whole call to empty
/// maps; a partially assembled bundle is never returned.
pub async fn build_backend_maps(session: &dyn ProtocolSession) -> BackendIdMaps {
    match try_build(session).await {
        Ok(maps) => {
            debug!(
                "Built backend-id maps: {} elements across {} frames",
                maps.element_count(),
                maps.frame_nodes.len()
            );
            maps
        }
        Err(e) => {
            warn!(
                "DOM map build failed, degrading to empty maps: {}",
                diag::describe_error(&e)
            );
            BackendIdMaps::default()
        }
    }
}

async fn try_build(session: &dyn ProtocolSession) -> Result<BackendIdMaps, BuildError> {
    let document = session
        .send("DOM.getDocument", Some(json!({ "depth": -1, "pierce": true })))
        .await?;
    let root: DomNode = serde_json::from_value(document["root"].clone())
        .map_err(|e| BuildError::Malformed(format!("document root: {e}")))?;

    let mut walk = DocumentWalk::default();
    walk.visit(&root, "", None);

    let DocumentWalk {
        mut maps,
        frame_order,
    } = walk;

    // Accessible names come from a separate tree keyed by backend node id.
    session.send("Accessibility.enable", None).await?;
    if frame_order.is_empty() {
        let nodes = fetch_ax_nodes(session, None).await?;
        merge_accessible_names(&mut maps, &nodes);
    } else {
        for frame_id in &frame_order {
            let nodes = fetch_ax_nodes(session, Some(frame_id)).await?;
            merge_accessible_names(&mut maps, &nodes);
        }
    }

    Ok(maps)
}

async fn fetch_ax_nodes(
    session: &dyn ProtocolSession,
    frame_id: Option<&str>,
) -> Result<Vec<AXNode>, BuildError> {
    let params = frame_id.map(|frame| json!({ "frameId": frame }));
    let result = session.send("Accessibility.getFullAXTree", params).await?;
    serde_json::from_value(result["nodes"].clone())
        .map_err(|e| BuildError::Malformed(format!("accessibility nodes: {e}")))
}

fn merge_accessible_names(maps: &mut BackendIdMaps, nodes: &[AXNode]) {
    for ax in nodes {
        if ax.ignored {
            continue;
        }
        let Some(id) = ax.backend_dom_node_id else {
            continue;
        };
        let Some(name) = ax.accessible_name() else {
            continue;
        };
        maps.accessible_names.insert(id, name.to_string());
        if let Some(descriptor) = maps.descriptors.get_mut(&id) {
            descriptor.accessible_name = Some(name.to_string());
        }
    }
}

/// One depth-first pass over the pierced document tree.
#[derive(Default)]
struct DocumentWalk {
    maps: BackendIdMaps,
    /// Frame ids in the order the walk first saw them.
    frame_order: Vec<String>,
}

impl DocumentWalk {
    /// Visit one node. `path` is the node's xpath within its document
    /// scope, empty for non-elements and for scope roots themselves.
    fn visit(&mut self, node: &DomNode, path: &str, inherited_frame: Option<&str>) {
        if let Some(frame) = node.frame_id.as_deref() {
            self.register_frame(frame);
        }

        // Only a document node moves its subtree into another frame. The
        // frame id on an iframe element names the frame it hosts, not the
        // frame that owns the element.
        let owner_frame = if node.is_document() {
            node.frame_id.as_deref().or(inherited_frame)
        } else {
            inherited_frame
        };

        if node.is_element() && !path.is_empty() {
            self.record_element(node, path, owner_frame);
        }

        if let Some(children) = &node.children {
            // Each xpath segment is indexed among same-tag element
            // siblings, counting from 1, index always present.
            let mut tag_counts: HashMap<String, usize> = HashMap::new();
            for child in children {
                if child.is_element() {
                    let tag = child.tag_name();
                    let count = tag_counts
                        .entry(tag.clone())
                        .and_modify(|c| *c += 1)
                        .or_insert(1);
                    let child_path = format!("{path}/{tag}[{count}]");
                    self.visit(child, &child_path, owner_frame);
                } else {
                    self.visit(child, "", owner_frame);
                }
            }
        }

        // A frame document and a shadow root each open a fresh path scope.
        if let Some(content) = &node.content_document {
            self.visit(content, "", owner_frame);
        }
        if let Some(shadow_roots) = &node.shadow_roots {
            for shadow in shadow_roots {
                self.visit(shadow, "", owner_frame);
            }
        }
    }

    fn register_frame(&mut self, frame_id: &str) {
        if !self.frame_order.iter().any(|f| f == frame_id) {
            self.frame_order.push(frame_id.to_string());
        }
    }

    fn record_element(&mut self, node: &DomNode, path: &str, frame_id: Option<&str>) {
        let id = node.backend_node_id;
        let tag = node.tag_name();
        self.maps.tag_names.insert(id, tag.clone());
        self.maps.xpaths.insert(id, path.to_string());
        self.maps.descriptors.insert(
            id,
            NodeDescriptor {
                backend_node_id: id,
                node_id: node.node_id,
                frame_id: frame_id.map(str::to_string),
                tag_name: tag,
                xpath: path.to_string(),
                attributes: parse_attributes(node.attributes.as_deref()),
                accessible_name: None,
            },
        );
        if let Some(frame) = frame_id {
            self.maps
                .frame_nodes
                .entry(frame.to_string())
                .or_default()
                .insert(id);
        }
    }
}

/// `DOM.getDocument` flattens attributes into `[name, value, ..]` pairs.
fn parse_attributes(flat: Option<&[String]>) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    if let Some(flat) = flat {
        for pair in flat.chunks_exact(2) {
            attributes.insert(pair[0].clone(), pair[1].clone());
        }
    }
    attributes
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
