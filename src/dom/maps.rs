//! Backend-id keyed element maps.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

/// Protocol-stable DOM node identifier, distinct from page-visible ids.
pub type BackendNodeId = i64;

/// Everything one build learned about a single element.
///
/// Serializable so a resolved element can go straight into a debug
/// snapshot section.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDescriptor {
    pub backend_node_id: BackendNodeId,
    pub node_id: i64,
    pub frame_id: Option<String>,
    pub tag_name: String,
    pub xpath: String,
    pub attributes: HashMap<String, String>,
    pub accessible_name: Option<String>,
}

/// The element maps for one document generation.
///
/// Rebuilt wholesale on every build and never patched in place, so a
/// consumer holding one bundle never observes entries from two different
/// document generations.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BackendIdMaps {
    /// Backend node id → lowercase tag name.
    pub tag_names: HashMap<BackendNodeId, String>,
    /// Backend node id → root-relative xpath within its own document scope.
    pub xpaths: HashMap<BackendNodeId, String>,
    /// Backend node id → computed accessible name.
    pub accessible_names: HashMap<BackendNodeId, String>,
    /// Backend node id → full descriptor.
    pub descriptors: HashMap<BackendNodeId, NodeDescriptor>,
    /// Frame id → backend node ids that frame owns.
    pub frame_nodes: HashMap<String, HashSet<BackendNodeId>>,
}

impl BackendIdMaps {
    /// Number of elements recorded by the walk.
    pub fn element_count(&self) -> usize {
        self.descriptors.len()
    }

    /// True for a degraded build result (or a genuinely element-free page).
    pub fn is_empty(&self) -> bool {
        self.tag_names.is_empty()
            && self.xpaths.is_empty()
            && self.accessible_names.is_empty()
            && self.descriptors.is_empty()
            && self.frame_nodes.is_empty()
    }
}
