//! Shared test doubles and fixtures.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::cdp::{CdpError, ProtocolSession};

enum MockFailure {
    Protocol { code: i64, message: String },
    Timeout,
}

impl MockFailure {
    fn into_error(self, method: &str) -> CdpError {
        match self {
            MockFailure::Protocol { code, message } => CdpError::Protocol { code, message },
            MockFailure::Timeout => CdpError::Timeout(format!("Request {method} timed out")),
        }
    }
}

/// Scripted protocol session.
///
/// Responses are queued per method and handed out in order; methods with
/// no queued response succeed with `null`, which keeps enable-style calls
/// out of test setup. Every call is recorded for assertions.
pub(crate) struct MockSession {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, MockFailure>>>>,
    calls: Mutex<Vec<(String, Option<Value>)>>,
    detached: AtomicBool,
}

impl MockSession {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            detached: AtomicBool::new(false),
        }
    }

    pub(crate) fn enqueue(&self, method: &str, result: Value) {
        self.responses
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(Ok(result));
    }

    pub(crate) fn enqueue_error(&self, method: &str, code: i64, message: &str) {
        self.responses
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(Err(MockFailure::Protocol {
                code,
                message: message.to_string(),
            }));
    }

    pub(crate) fn enqueue_timeout(&self, method: &str) {
        self.responses
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(Err(MockFailure::Timeout));
    }

    /// Methods called so far, in order.
    pub(crate) fn call_methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    /// Params of every call to `method`, in order.
    pub(crate) fn params_for(&self, method: &str) -> Vec<Option<Value>> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl ProtocolSession for MockSession {
    async fn send(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        if self.detached.load(Ordering::SeqCst) {
            return Err(CdpError::Detached);
        }
        self.calls.lock().push((method.to_string(), params));
        let next = self
            .responses
            .lock()
            .get_mut(method)
            .and_then(|queue| queue.pop_front());
        match next {
            Some(Ok(value)) => Ok(value),
            Some(Err(failure)) => Err(failure.into_error(method)),
            None => Ok(Value::Null),
        }
    }

    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    async fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }
}

/// A two-frame document: the main frame holds a heading, a link and an
/// iframe; the child frame holds a button. Shapes match real
/// `DOM.getDocument` output with `depth: -1, pierce: true`.
pub(crate) fn sample_document() -> Value {
    json!({
        "root": {
            "nodeId": 1,
            "backendNodeId": 101,
            "nodeType": 9,
            "nodeName": "#document",
            "frameId": "FRAME_MAIN",
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
                    "children": [
                        {
                            "nodeId": 4,
                            "backendNodeId": 104,
                            "nodeType": 1,
                            "nodeName": "H1",
                            "localName": "h1",
                            "children": [{
                                "nodeId": 5,
                                "backendNodeId": 105,
                                "nodeType": 3,
                                "nodeName": "#text",
                                "nodeValue": "Orders"
                            }]
                        },
                        {
                            "nodeId": 6,
                            "backendNodeId": 106,
                            "nodeType": 1,
                            "nodeName": "A",
                            "localName": "a",
                            "attributes": ["href", "/orders/new", "class", "primary"]
                        },
                        {
                            "nodeId": 7,
                            "backendNodeId": 107,
                            "nodeType": 1,
                            "nodeName": "IFRAME",
                            "localName": "iframe",
                            "frameId": "FRAME_CHILD",
                            "contentDocument": {
                                "nodeId": 8,
                                "backendNodeId": 108,
                                "nodeType": 9,
                                "nodeName": "#document",
                                "frameId": "FRAME_CHILD",
                                "children": [{
                                    "nodeId": 9,
                                    "backendNodeId": 109,
                                    "nodeType": 1,
                                    "nodeName": "HTML",
                                    "localName": "html",
                                    "children": [{
                                        "nodeId": 10,
                                        "backendNodeId": 110,
                                        "nodeType": 1,
                                        "nodeName": "BODY",
                                        "localName": "body",
                                        "children": [{
                                            "nodeId": 11,
                                            "backendNodeId": 111,
                                            "nodeType": 1,
                                            "nodeName": "BUTTON",
                                            "localName": "button",
                                            "attributes": ["type", "submit"]
                                        }]
                                    }]
                                }]
                            }
                        }
                    ]
                }]
            }]
        }
    })
}

/// Accessibility nodes for the main frame of [`sample_document`].
pub(crate) fn main_frame_ax_nodes() -> Value {
    json!({
        "nodes": [
            {
                "nodeId": "1",
                "ignored": false,
                "role": { "type": "role", "value": "heading" },
                "name": { "type": "computedString", "value": "Orders" },
                "backendDOMNodeId": 104
            },
            {
                "nodeId": "2",
                "ignored": false,
                "role": { "type": "role", "value": "link" },
                "name": { "type": "computedString", "value": "New order" },
                "backendDOMNodeId": 106
            },
            {
                "nodeId": "3",
                "ignored": true,
                "role": { "type": "role", "value": "generic" },
                "backendDOMNodeId": 103
            }
        ]
    })
}

/// Accessibility nodes for the child frame of [`sample_document`].
pub(crate) fn child_frame_ax_nodes() -> Value {
    json!({
        "nodes": [
            {
                "nodeId": "1",
                "ignored": false,
                "role": { "type": "role", "value": "button" },
                "name": { "type": "computedString", "value": "Submit order" },
                "backendDOMNodeId": 111
            }
        ]
    })
}
