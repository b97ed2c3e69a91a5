//! DOM state: backend-id maps, on-screen geometry, and the per-page cache.

mod builder;
mod geometry;
mod maps;
mod state;

pub use builder::build_backend_maps;
pub use geometry::{read_scroll_info, resolve_bounding_box, BoundingBox, ScrollInfo};
pub use maps::{BackendIdMaps, BackendNodeId, NodeDescriptor};
pub use state::{DomStateCache, DomStateSnapshot};
