//! On-screen geometry from protocol quads and layout metrics.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::maps::BackendNodeId;
use crate::cdp::protocol::{ContentSize, VisualViewport};
use crate::cdp::{CdpError, ProtocolSession};
use crate::diag;

/// Browser-side rejection code for nodes without computable geometry.
const NO_QUADS_CODE: i64 = -32000;

/// Axis-aligned box in CSS pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Center point, the usual click target.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Axis-aligned box spanning a protocol quad's four vertices.
    ///
    /// Quads arrive as flat `[x1, y1, .., x4, y4]` arrays and may be
    /// rotated, so the box takes min/max over all four corners. Malformed
    /// or zero-area quads yield `None`.
    pub fn from_quad(quad: &[f64]) -> Option<Self> {
        if quad.len() < 8 {
            return None;
        }
        let xs = [quad[0], quad[2], quad[4], quad[6]];
        let ys = [quad[1], quad[3], quad[5], quad[7]];
        let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let width = max_x - min_x;
        let height = max_y - min_y;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width,
            height,
        })
    }
}

/// Scroll position summary for the page-state section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScrollInfo {
    /// Content pixels above the visual viewport.
    pub pixels_above: i64,
    /// Content pixels below the visual viewport.
    pub pixels_below: i64,
}

/// Resolve the current on-screen box for a backend node id.
///
/// Never errors: every failure degrades to `None` with a logged
/// diagnostic. The browser rejecting the quad query for unrendered or
/// zero-size nodes is routine and logged at debug level only.
pub async fn resolve_bounding_box(
    session: &dyn ProtocolSession,
    backend_node_id: BackendNodeId,
) -> Option<BoundingBox> {
    // DOM.enable is idempotent; repeating it guards against the domain
    // having been disabled since the last resolve.
    if let Err(e) = session.send("DOM.enable", None).await {
        warn!(
            "DOM.enable failed resolving node {}: {}",
            backend_node_id,
            diag::describe_error(&e)
        );
        return None;
    }

    let params = json!({ "backendNodeId": backend_node_id });
    let result = match session.send("DOM.getContentQuads", Some(params)).await {
        Ok(value) => value,
        Err(CdpError::Protocol { code, message }) if code == NO_QUADS_CODE => {
            debug!("Node {} has no content quads: {}", backend_node_id, message);
            return None;
        }
        Err(e) => {
            warn!(
                "DOM.getContentQuads failed for node {}: {}",
                backend_node_id,
                diag::describe_error(&e)
            );
            return None;
        }
    };

    let quads: Vec<Vec<f64>> = match serde_json::from_value(result["quads"].clone()) {
        Ok(quads) => quads,
        Err(e) => {
            warn!(
                "Malformed quads payload for node {}: {}",
                backend_node_id,
                diag::describe_error(&e)
            );
            return None;
        }
    };

    // First quad wins; later quads describe additional fragments of
    // inline elements.
    let resolved = quads.first().and_then(|quad| BoundingBox::from_quad(quad));
    if resolved.is_none() {
        debug!("Node {} is not rendered", backend_node_id);
    }
    resolved
}

/// Read how much content sits above and below the visual viewport.
///
/// Degrades to zeros with a warning when layout metrics are unavailable,
/// so the page-state section always renders.
pub async fn read_scroll_info(session: &dyn ProtocolSession) -> ScrollInfo {
    match try_read_scroll_info(session).await {
        Ok(info) => info,
        Err(e) => {
            warn!(
                "Page.getLayoutMetrics failed, reporting zero scroll: {}",
                diag::describe_error(&e)
            );
            ScrollInfo::default()
        }
    }
}

async fn try_read_scroll_info(session: &dyn ProtocolSession) -> Result<ScrollInfo, CdpError> {
    let metrics = session.send("Page.getLayoutMetrics", None).await?;
    let viewport: VisualViewport = serde_json::from_value(metrics["cssVisualViewport"].clone())?;
    let content: ContentSize = serde_json::from_value(metrics["cssContentSize"].clone())?;
    let above = viewport.page_y;
    let below = content.height - (viewport.page_y + viewport.client_height);
    Ok(ScrollInfo {
        pixels_above: above.max(0.0).round() as i64,
        pixels_below: below.max(0.0).round() as i64,
    })
}
