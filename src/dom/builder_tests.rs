use serde_json::{json, Value};

use super::*;
use crate::testing::{child_frame_ax_nodes, main_frame_ax_nodes, sample_document, MockSession};

fn single_frame_document(body_children: Value) -> Value {
    json!({
        "root": {
            "nodeId": 1,
            "backendNodeId": 101,
            "nodeType": 9,
            "nodeName": "#document",
            "children": [{
                "nodeId": 2,
                "backendNodeId": 102,
                "nodeType": 1,
                "nodeName": "HTML",
                "localName": "html",
                "children": [{
                    "nodeId": 3,
                    "backendNodeId": 103,
                    "nodeType": 1,
                    "nodeName": "BODY",
                    "localName": "body",
                    "children": body_children
                }]
            }]
        }
    })
}

#[tokio::test]
async fn test_build_records_elements_across_frames() {
    let session = MockSession::new();
    session.enqueue("DOM.getDocument", sample_document());
    session.enqueue("Accessibility.getFullAXTree", main_frame_ax_nodes());
    session.enqueue("Accessibility.getFullAXTree", child_frame_ax_nodes());

    let maps = build_backend_maps(&session).await;

    assert_eq!(maps.element_count(), 8);
    assert_eq!(maps.tag_names[&104], "h1");
    assert_eq!(maps.tag_names[&111], "button");
    assert_eq!(maps.xpaths[&104], "/html[1]/body[1]/h1[1]");
    // Child-frame paths restart at the frame's own document.
    assert_eq!(maps.xpaths[&111], "/html[1]/body[1]/button[1]");

    assert_eq!(maps.accessible_names[&104], "Orders");
    assert_eq!(maps.accessible_names[&106], "New order");
    assert_eq!(maps.accessible_names[&111], "Submit order");
    // Ignored AX nodes contribute no name.
    assert!(!maps.accessible_names.contains_key(&103));

    let main = &maps.frame_nodes["FRAME_MAIN"];
    let child = &maps.frame_nodes["FRAME_CHILD"];
    assert_eq!(main.len(), 5);
    assert_eq!(child.len(), 3);
    // The iframe element itself belongs to the parent frame.
    assert!(main.contains(&107));
    assert!(child.contains(&111));

    let link = &maps.descriptors[&106];
    assert_eq!(link.attributes["href"], "/orders/new");
    assert_eq!(link.attributes["class"], "primary");
    assert_eq!(link.frame_id.as_deref(), Some("FRAME_MAIN"));
    assert_eq!(
        maps.descriptors[&111].frame_id.as_deref(),
        Some("FRAME_CHILD")
    );
    assert_eq!(
        maps.descriptors[&111].accessible_name.as_deref(),
        Some("Submit order")
    );
}

#[tokio::test]
async fn test_ax_trees_fetched_per_frame_in_discovery_order() {
    let session = MockSession::new();
    session.enqueue("DOM.getDocument", sample_document());
    session.enqueue("Accessibility.getFullAXTree", main_frame_ax_nodes());
    session.enqueue("Accessibility.getFullAXTree", child_frame_ax_nodes());

    build_backend_maps(&session).await;

    let params = session.params_for("Accessibility.getFullAXTree");
    assert_eq!(
        params,
        vec![
            Some(json!({ "frameId": "FRAME_MAIN" })),
            Some(json!({ "frameId": "FRAME_CHILD" })),
        ]
    );
}

#[tokio::test]
async fn test_sibling_indexes_count_per_tag() {
    let session = MockSession::new();
    session.enqueue(
        "DOM.getDocument",
        single_frame_document(json!([
            { "nodeId": 4, "backendNodeId": 104, "nodeType": 1, "nodeName": "DIV", "localName": "div" },
            { "nodeId": 5, "backendNodeId": 105, "nodeType": 1, "nodeName": "SPAN", "localName": "span" },
            { "nodeId": 6, "backendNodeId": 106, "nodeType": 1, "nodeName": "DIV", "localName": "div" },
            { "nodeId": 7, "backendNodeId": 107, "nodeType": 1, "nodeName": "DIV", "localName": "div" },
        ])),
    );
    session.enqueue("Accessibility.getFullAXTree", json!({ "nodes": [] }));

    let maps = build_backend_maps(&session).await;

    assert_eq!(maps.xpaths[&104], "/html[1]/body[1]/div[1]");
    assert_eq!(maps.xpaths[&105], "/html[1]/body[1]/span[1]");
    assert_eq!(maps.xpaths[&106], "/html[1]/body[1]/div[2]");
    assert_eq!(maps.xpaths[&107], "/html[1]/body[1]/div[3]");
}

#[tokio::test]
async fn test_shadow_roots_open_fresh_path_scope() {
    let session = MockSession::new();
    session.enqueue(
        "DOM.getDocument",
        single_frame_document(json!([{
            "nodeId": 4,
            "backendNodeId": 104,
            "nodeType": 1,
            "nodeName": "MY-WIDGET",
            "localName": "my-widget",
            "shadowRoots": [{
                "nodeId": 5,
                "backendNodeId": 105,
                "nodeType": 11,
                "nodeName": "#document-fragment",
                "children": [{
                    "nodeId": 6,
                    "backendNodeId": 106,
                    "nodeType": 1,
                    "nodeName": "SPAN",
                    "localName": "span"
                }]
            }]
        }])),
    );
    session.enqueue("Accessibility.getFullAXTree", json!({ "nodes": [] }));

    let maps = build_backend_maps(&session).await;

    assert_eq!(maps.xpaths[&104], "/html[1]/body[1]/my-widget[1]");
    assert_eq!(maps.xpaths[&106], "/span[1]");
}

#[tokio::test]
async fn test_non_element_nodes_are_not_mapped() {
    let session = MockSession::new();
    session.enqueue(
        "DOM.getDocument",
        single_frame_document(json!([
            { "nodeId": 4, "backendNodeId": 104, "nodeType": 3, "nodeName": "#text", "nodeValue": "hello" },
            { "nodeId": 5, "backendNodeId": 105, "nodeType": 8, "nodeName": "#comment" },
            { "nodeId": 6, "backendNodeId": 106, "nodeType": 1, "nodeName": "P", "localName": "p" },
        ])),
    );
    session.enqueue("Accessibility.getFullAXTree", json!({ "nodes": [] }));

    let maps = build_backend_maps(&session).await;

    assert!(!maps.tag_names.contains_key(&104));
    assert!(!maps.tag_names.contains_key(&105));
    assert_eq!(maps.xpaths[&106], "/html[1]/body[1]/p[1]");
}

#[tokio::test]
async fn test_build_degrades_on_document_failure() {
    let session = MockSession::new();
    session.enqueue_error("DOM.getDocument", -32000, "Cannot find context");

    let maps = build_backend_maps(&session).await;

    assert!(maps.is_empty());
    // No point fetching accessibility trees for a document that never came.
    assert!(!session
        .call_methods()
        .contains(&"Accessibility.enable".to_string()));
}

#[tokio::test]
async fn test_build_degrades_on_malformed_document() {
    let session = MockSession::new();
    session.enqueue("DOM.getDocument", json!({ "root": { "nodeId": "bogus" } }));

    let maps = build_backend_maps(&session).await;
    assert!(maps.is_empty());
}

#[tokio::test]
async fn test_build_degrades_whole_bundle_on_ax_failure() {
    let session = MockSession::new();
    session.enqueue("DOM.getDocument", sample_document());
    session.enqueue("Accessibility.getFullAXTree", main_frame_ax_nodes());
    session.enqueue_error("Accessibility.getFullAXTree", -32000, "Frame gone");

    let maps = build_backend_maps(&session).await;

    // The DOM walk succeeded, but the bundle degrades as a whole; no
    // partially named result escapes.
    assert!(maps.is_empty());
}

#[tokio::test]
async fn test_build_degrades_on_ax_timeout() {
    let session = MockSession::new();
    session.enqueue("DOM.getDocument", sample_document());
    session.enqueue_timeout("Accessibility.getFullAXTree");

    let maps = build_backend_maps(&session).await;
    assert!(maps.is_empty());
}

#[tokio::test]
async fn test_document_without_frame_ids_uses_default_target() {
    let session = MockSession::new();
    session.enqueue(
        "DOM.getDocument",
        single_frame_document(json!([
            { "nodeId": 4, "backendNodeId": 104, "nodeType": 1, "nodeName": "P", "localName": "p" },
        ])),
    );
    session.enqueue("Accessibility.getFullAXTree", json!({ "nodes": [] }));

    let maps = build_backend_maps(&session).await;

    assert_eq!(maps.element_count(), 3);
    assert!(maps.frame_nodes.is_empty());
    // No frame ids discovered, so one fetch against the session's default.
    assert_eq!(
        session.params_for("Accessibility.getFullAXTree"),
        vec![None]
    );
}

#[test]
fn test_parse_attributes_ignores_dangling_name() {
    let flat = vec![
        "href".to_string(),
        "/a".to_string(),
        "dangling".to_string(),
    ];
    let attributes = parse_attributes(Some(&flat));
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes["href"], "/a");
}
