use super::*;
use tokio::net::TcpListener;

/// A minimal browser endpoint answering a handful of commands.
async fn fake_browser() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else { continue };
            let request: Value = serde_json::from_str(&text).unwrap();
            let id = request["id"].clone();
            let reply = match request["method"].as_str().unwrap() {
                "Target.getTargets" => json!({"id": id, "result": {"targetInfos": [
                    {"targetId": "T1", "type": "page", "title": "One", "url": "https://one.test/"},
                    {"targetId": "W1", "type": "service_worker", "title": "", "url": "https://one.test/sw.js"},
                    {"targetId": "T2", "type": "page", "title": "Two", "url": "chrome://newtab/"}
                ]}}),
                "Target.createTarget" => json!({"id": id, "result": {"targetId": "T3"}}),
                "Target.attachToTarget" => json!({"id": id, "result": {"sessionId": "S1"}}),
                "Page.enable" | "Runtime.enable" => {
                    assert_eq!(request["sessionId"], "S1");
                    json!({"id": id, "result": {}})
                }
                "Page.reload" => {
                    let event = json!({
                        "method": "Page.loadEventFired",
                        "params": {"timestamp": 1.5},
                        "sessionId": "S1"
                    });
                    ws.send(Message::Text(event.to_string().into())).await.unwrap();
                    json!({"id": id, "result": {}})
                }
                "Close" => {
                    let _ = ws.close(None).await;
                    break;
                }
                other => json!({"id": id, "error": {"code": -32601, "message": format!("'{}' wasn't found", other)}}),
            };
            ws.send(Message::Text(reply.to_string().into())).await.unwrap();
        }
    });

    format!("ws://{}/devtools/browser/test", addr)
}

#[tokio::test]
async fn test_call_and_protocol_error() {
    let client = CdpClient::connect_ws(&fake_browser().await).await.unwrap();
    assert!(client.is_connected());

    let err = client.call("Nope.nothing", None).await.unwrap_err();
    match err {
        CdpError::Protocol { code, message } => {
            assert_eq!(code, -32601);
            assert!(message.contains("Nope.nothing"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_page_targets_filters_non_pages() {
    let client = CdpClient::connect_ws(&fake_browser().await).await.unwrap();
    let pages = client.page_targets().await.unwrap();
    let ids: Vec<_> = pages.iter().map(|t| t.target_id.as_str()).collect();
    assert_eq!(ids, vec!["T1", "T2"]);
}

#[tokio::test]
async fn test_attach_routes_session_events() {
    let client = CdpClient::connect_ws(&fake_browser().await).await.unwrap();
    let target = client.create_target("about:blank").await.unwrap();
    assert_eq!(target, "T3");

    let session = client.attach(&target).await.unwrap();
    assert_eq!(session.session_id(), "S1");
    let mut events = session.take_events().unwrap();
    assert!(session.take_events().is_none());

    session.reload().await.unwrap();
    let event = events.recv().await.unwrap();
    assert_eq!(event.method, "Page.loadEventFired");
    assert_eq!(event.params["timestamp"], 1.5);
}

#[tokio::test]
async fn test_socket_close_fails_pending_calls() {
    let client = CdpClient::connect_ws(&fake_browser().await).await.unwrap();
    let err = client.call("Close", None).await.unwrap_err();
    assert!(matches!(err, CdpError::SessionClosed), "{err}");
}

#[tokio::test]
async fn test_connect_ws_rejects_bad_url() {
    let err = CdpClient::connect_ws("not a url").await.err().unwrap();
    assert!(matches!(err, CdpError::ConnectionFailed(_)));
}
