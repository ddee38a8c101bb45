use super::*;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use crate::cdp::CdpClient;

type Log = Arc<Mutex<Vec<(String, Value)>>>;

/// A page endpoint answering the `Runtime` commands `CdpDom` issues. Every
/// command after the attach handshake is logged.
async fn fake_page() -> (String, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: Log = Arc::default();
    let recorded = log.clone();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else { continue };
            let request: Value = serde_json::from_str(&text).unwrap();
            let id = request["id"].clone();
            let method = request["method"].as_str().unwrap().to_string();
            let params = request["params"].clone();
            let by_value = params["returnByValue"].as_bool().unwrap_or(false);

            let result = match method.as_str() {
                "Target.attachToTarget" => json!({"sessionId": "S1"}),
                "Page.enable" | "Runtime.enable" => json!({}),
                "Runtime.evaluate" => {
                    json!({"result": {"type": "object", "subtype": "array", "objectId": "list"}})
                }
                "Runtime.callFunctionOn" if !by_value => {
                    json!({"result": {"type": "object", "subtype": "node", "objectId": "overlay-1"}})
                }
                "Runtime.callFunctionOn" => {
                    let function = params["functionDeclaration"].as_str().unwrap_or("");
                    if function.contains("this.map") {
                        json!({"result": {"type": "object", "value": [7, 9]}})
                    } else {
                        json!({"result": {"type": "number", "value": 3}})
                    }
                }
                "Runtime.getProperties" => json!({"result": [
                    {"name": "1", "value": {"type": "object", "subtype": "node", "objectId": "el-b"}},
                    {"name": "0", "value": {"type": "object", "subtype": "node", "objectId": "el-a"}},
                    {"name": "length", "value": {"type": "number", "value": 2}}
                ]}),
                _ => json!({}),
            };
            if !matches!(method.as_str(), "Target.attachToTarget" | "Page.enable" | "Runtime.enable") {
                recorded.lock().push((method, params));
            }
            let reply = json!({"id": id, "result": result});
            ws.send(Message::Text(reply.to_string().into())).await.unwrap();
        }
    });

    (format!("ws://{}/devtools/browser/test", addr), log)
}

async fn page_dom() -> (CdpDom, Log) {
    let (url, log) = fake_page().await;
    let client = CdpClient::connect_ws(&url).await.unwrap();
    let session = client.attach("T1").await.unwrap();
    (CdpDom::new(Arc::new(session)), log)
}

fn methods(log: &Log) -> Vec<String> {
    log.lock().iter().map(|(method, _)| method.clone()).collect()
}

#[tokio::test]
async fn test_focusable_elements_in_three_round_trips() {
    let (dom, log) = page_dom().await;

    let nodes = dom.focusable_elements().await.unwrap();
    let ids: Vec<_> = nodes.iter().map(|n| (n.key, n.object_id())).collect();
    assert_eq!(ids, vec![(7, "el-a"), (9, "el-b")]);

    assert_eq!(
        methods(&log),
        vec!["Runtime.evaluate", "Runtime.callFunctionOn", "Runtime.getProperties"]
    );
    let (_, evaluate) = log.lock()[0].clone();
    assert_eq!(evaluate["objectGroup"], MESSAGE_GROUP);
    assert!(evaluate["expression"].as_str().unwrap().contains("getClientRects"));
}

#[tokio::test]
async fn test_release_handles_drops_message_group() {
    let (dom, log) = page_dom().await;
    dom.release_handles().await.unwrap();

    let log = log.lock();
    assert_eq!(log[0].0, "Runtime.releaseObjectGroup");
    assert_eq!(log[0].1["objectGroup"], MESSAGE_GROUP);
}

#[tokio::test]
async fn test_overlay_outlives_message_group() {
    let (dom, log) = page_dom().await;

    let overlay = dom.create_overlay("ring", &[("opacity", "0")]).await.unwrap();
    assert_eq!(overlay.object_id(), "overlay-1");
    let create = log
        .lock()
        .iter()
        .find(|(method, params)| {
            method == "Runtime.callFunctionOn" && params["returnByValue"] == false
        })
        .cloned()
        .unwrap();
    assert_eq!(create.1["objectGroup"], OVERLAY_GROUP);

    dom.remove_node(&overlay).await.unwrap();
    let (method, params) = log.lock().last().cloned().unwrap();
    assert_eq!(method, "Runtime.releaseObject");
    assert_eq!(params["objectId"], "overlay-1");
}

#[test]
fn test_array_nodes_skips_non_index_properties() {
    let properties: Vec<PropertyDescriptor> = serde_json::from_value(json!([
        {"name": "length", "value": {"type": "number", "value": 1}},
        {"name": "0", "value": {"type": "object", "subtype": "node", "objectId": "a"}},
        {"name": "__proto__"}
    ]))
    .unwrap();
    let nodes = array_nodes(properties, &[5]);
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].key, 5);
    assert_eq!(nodes[0].object_id(), "a");
}

#[test]
fn test_node_equality_uses_key() {
    let a = CdpNode {
        key: 4,
        object_id: "obj-1".into(),
    };
    let b = CdpNode {
        key: 4,
        object_id: "obj-2".into(),
    };
    let c = CdpNode {
        key: 5,
        object_id: "obj-1".into(),
    };
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_element_info_from_page() {
    let raw: RawElementInfo = serde_json::from_value(json!({
        "tag": "input",
        "id": "q",
        "kind": "input",
        "inputType": "search",
        "name": null,
        "role": null,
        "focusable": true,
        "hasLayoutBox": true
    }))
    .unwrap();
    let info = ElementInfo::from(raw);
    assert_eq!(info.kind, ElementKind::Input);
    assert_eq!(info.describe(), "input#q");
    assert!(info.is_search_like());

    let raw: RawElementInfo = serde_json::from_value(json!({
        "tag": "div",
        "id": null,
        "kind": "contenteditable",
        "inputType": null,
        "name": null,
        "role": "textbox",
        "focusable": true,
        "hasLayoutBox": false
    }))
    .unwrap();
    let info = ElementInfo::from(raw);
    assert_eq!(info.kind, ElementKind::ContentEditable);
    assert!(!info.has_layout_box);
}

#[test]
fn test_dom_error_mapping() {
    let stale = CdpError::Protocol {
        code: -32000,
        message: "Could not find object with given id".into(),
    };
    assert!(matches!(dom_error(stale), DomError::Detached(_)));
    assert!(matches!(
        dom_error(CdpError::JavaScript("ReferenceError".into())),
        DomError::Script(_)
    ));
    assert!(matches!(dom_error(CdpError::SessionClosed), DomError::Bridge(_)));
}

#[test]
fn test_decode_reports_shape_errors() {
    let err = decode::<(usize, usize)>(json!("nope"), "selection range").unwrap_err();
    assert!(err.to_string().contains("selection range"));
    assert_eq!(decode::<(usize, usize)>(json!([1, 3]), "selection range").unwrap(), (1, 3));
}
