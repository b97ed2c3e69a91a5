//! Cached DOM state for one page.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::builder::build_backend_maps;
use super::geometry::{resolve_bounding_box, BoundingBox};
use super::maps::{BackendIdMaps, BackendNodeId, NodeDescriptor};
use crate::cdp::ProtocolSession;

/// One built document generation: the map bundle plus the bounding boxes
/// resolved against it so far.
///
/// Boxes are memoized per generation. Invalidation drops the whole
/// snapshot, so stale geometry can never outlive the maps it was resolved
/// under.
pub struct DomStateSnapshot {
    maps: BackendIdMaps,
    boxes: parking_lot::Mutex<HashMap<BackendNodeId, Option<BoundingBox>>>,
}

impl DomStateSnapshot {
    fn new(maps: BackendIdMaps) -> Self {
        Self {
            maps,
            boxes: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn maps(&self) -> &BackendIdMaps {
        &self.maps
    }

    pub fn tag_name(&self, id: BackendNodeId) -> Option<&str> {
        self.maps.tag_names.get(&id).map(String::as_str)
    }

    pub fn xpath(&self, id: BackendNodeId) -> Option<&str> {
        self.maps.xpaths.get(&id).map(String::as_str)
    }

    pub fn accessible_name(&self, id: BackendNodeId) -> Option<&str> {
        self.maps.accessible_names.get(&id).map(String::as_str)
    }

    pub fn descriptor(&self, id: BackendNodeId) -> Option<&NodeDescriptor> {
        self.maps.descriptors.get(&id)
    }

    pub fn element_count(&self) -> usize {
        self.maps.element_count()
    }

    /// Text listing of mapped elements for the page-state section.
    ///
    /// Ordered by backend node id so two listings of the same generation
    /// render identically. At most `max` entries, then an elision line.
    pub fn element_listing(&self, max: usize) -> String {
        if self.maps.descriptors.is_empty() {
            return "empty page\n".to_string();
        }
        let mut ids: Vec<BackendNodeId> = self.maps.descriptors.keys().copied().collect();
        ids.sort_unstable();

        let mut out = String::new();
        for id in ids.iter().take(max) {
            let descriptor = &self.maps.descriptors[id];
            match &descriptor.accessible_name {
                Some(name) => {
                    out.push_str(&format!("[{}] <{}> \"{}\"\n", id, descriptor.tag_name, name));
                }
                None => out.push_str(&format!("[{}] <{}>\n", id, descriptor.tag_name)),
            }
        }
        if ids.len() > max {
            out.push_str(&format!("... {} more elements ...\n", ids.len() - max));
        }
        out
    }

    fn cached_box(&self, id: BackendNodeId) -> Option<Option<BoundingBox>> {
        self.boxes.lock().get(&id).copied()
    }

    fn store_box(&self, id: BackendNodeId, bbox: Option<BoundingBox>) {
        self.boxes.lock().insert(id, bbox);
    }
}

/// Lazily built, explicitly invalidated DOM state for one page.
///
/// `get_or_build` reuses the current snapshot until `invalidate` discards
/// it; the next read then rebuilds from the live document. Navigation and
/// mutation handlers call `invalidate` and never rebuild themselves, which
/// keeps builds off the hot path and at most one per generation.
pub struct DomStateCache {
    session: Arc<dyn ProtocolSession>,
    snapshot: Mutex<Option<Arc<DomStateSnapshot>>>,
}

impl DomStateCache {
    pub fn new(session: Arc<dyn ProtocolSession>) -> Self {
        Self {
            session,
            snapshot: Mutex::new(None),
        }
    }

    /// Current snapshot, building one first if none is cached.
    ///
    /// The slot lock is held across the build, so concurrent readers of an
    /// empty cache wait for one build instead of racing several.
    pub async fn get_or_build(&self) -> Arc<DomStateSnapshot> {
        let mut slot = self.snapshot.lock().await;
        if let Some(snapshot) = slot.as_ref() {
            return snapshot.clone();
        }
        let maps = build_backend_maps(self.session.as_ref()).await;
        let snapshot = Arc::new(DomStateSnapshot::new(maps));
        *slot = Some(snapshot.clone());
        snapshot
    }

    /// Discard the cached snapshot. Idempotent, never fails; on an empty
    /// cache it is a no-op.
    pub async fn invalidate(&self) {
        let mut slot = self.snapshot.lock().await;
        if slot.take().is_some() {
            debug!("DOM snapshot invalidated");
        }
    }

    /// Whether a snapshot is currently cached.
    pub async fn is_fresh(&self) -> bool {
        self.snapshot.lock().await.is_some()
    }

    /// Bounding box for `id`, memoized within the current generation.
    ///
    /// Unresolvable boxes memoize as `None` too: an unrendered node stays
    /// unrendered until the document changes, and the next generation
    /// retries from scratch anyway.
    pub async fn bounding_box(&self, id: BackendNodeId) -> Option<BoundingBox> {
        let snapshot = self.get_or_build().await;
        if let Some(cached) = snapshot.cached_box(id) {
            return cached;
        }
        let resolved = resolve_bounding_box(self.session.as_ref(), id).await;
        snapshot.store_box(id, resolved);
        resolved
    }
}
