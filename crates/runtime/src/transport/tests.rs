use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::{ORIGIN, SEC_WEBSOCKET_PROTOCOL};

use super::*;
use crate::error::Error;

fn target(url: &str) -> ConnectTarget {
	ConnectTarget {
		url: url.to_string(),
		subprotocol: "ubus-json".to_string(),
		origin: url.to_string(),
	}
}

#[tokio::test]
async fn test_memory_frames_flow_both_ways() {
	let (connector, mut peer) = MemoryConnector::new();
	let TransportParts { mut sender, mut events } = connector.connect(&target("ws://mem")).await.unwrap();

	sender.send(r#"{"id":1}"#.to_string()).await.unwrap();
	assert_eq!(peer.next_frame().await.as_deref(), Some(r#"{"id":1}"#));

	peer.reply(r#"{"id":1,"result":[0]}"#);
	assert_eq!(
		events.recv().await,
		Some(TransportEvent::Message(r#"{"id":1,"result":[0]}"#.to_string()))
	);

	assert_eq!(peer.target(), Some(target("ws://mem")));
}

#[tokio::test]
async fn test_memory_close_is_acknowledged_once() {
	let (connector, peer) = MemoryConnector::new();
	let TransportParts { mut sender, mut events } = connector.connect(&target("ws://mem")).await.unwrap();

	sender.close().await.unwrap();
	sender.close().await.unwrap();
	assert!(peer.is_closed());

	assert_eq!(events.recv().await, Some(TransportEvent::Closed(Some(1000))));
	assert!(events.try_recv().is_err());

	let err = sender.send("late".to_string()).await.unwrap_err();
	assert!(matches!(err, Error::Send(_)));
}

#[tokio::test]
async fn test_memory_send_failure() {
	let (connector, mut peer) = MemoryConnector::new();
	let TransportParts { mut sender, .. } = connector.connect(&target("ws://mem")).await.unwrap();

	peer.fail_sends(true);
	assert!(matches!(sender.send("a".to_string()).await, Err(Error::Send(_))));
	assert!(peer.try_next_frame().is_none());

	peer.fail_sends(false);
	sender.send("b".to_string()).await.unwrap();
	assert_eq!(peer.try_next_frame().as_deref(), Some("b"));
}

#[tokio::test]
async fn test_memory_connects_once() {
	let (connector, _peer) = MemoryConnector::new();
	assert!(connector.connect(&target("ws://mem")).await.is_ok());

	let err = connector.connect(&target("ws://mem")).await.err().unwrap();
	assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn test_memory_refusing() {
	let connector = MemoryConnector::refusing("connection refused");
	let err = connector.connect(&target("ws://mem")).await.err().unwrap();
	assert_eq!(err.to_string(), "transport error: connection refused");
}

#[tokio::test]
async fn test_websocket_handshake_and_echo() {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let url = format!("ws://{}", listener.local_addr().unwrap());
	let (headers_tx, headers_rx) = oneshot::channel();

	let server = tokio::spawn(async move {
		let (stream, _) = listener.accept().await.unwrap();
		let callback = |request: &Request, mut response: Response| -> std::result::Result<Response, ErrorResponse> {
			let protocol = request.headers().get(SEC_WEBSOCKET_PROTOCOL).cloned();
			let origin = request.headers().get(ORIGIN).cloned();
			if let Some(protocol) = protocol.clone() {
				response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocol);
			}
			let _ = headers_tx.send((protocol, origin));
			Ok(response)
		};

		let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await.unwrap();
		let frame = ws.next().await.unwrap().unwrap();
		ws.send(frame).await.unwrap();
		ws.close(None).await.unwrap();
	});

	let TransportParts { mut sender, mut events } = WebSocketConnector.connect(&target(&url)).await.unwrap();

	let (protocol, origin) = headers_rx.await.unwrap();
	assert_eq!(protocol.unwrap().to_str().unwrap(), "ubus-json");
	assert_eq!(origin.unwrap().to_str().unwrap(), url);

	sender.send(r#"{"jsonrpc":"2.0","id":0}"#.to_string()).await.unwrap();
	assert_eq!(
		events.recv().await,
		Some(TransportEvent::Message(r#"{"jsonrpc":"2.0","id":0}"#.to_string()))
	);
	assert!(matches!(events.recv().await, Some(TransportEvent::Closed(_))));

	server.await.unwrap();
}

#[tokio::test]
async fn test_websocket_connect_refused() {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let url = format!("ws://{}", listener.local_addr().unwrap());
	drop(listener);

	let err = WebSocketConnector.connect(&target(&url)).await.err().unwrap();
	assert!(err.to_string().contains("websocket connect failed"), "got: {}", err);
}

#[test]
fn test_target_from_config() {
	let config = ClientConfig::for_host("10.0.0.1", 8080, "u", "p").with_origin("http://10.0.0.1");
	let target = ConnectTarget::from(&config);
	assert_eq!(target.url, "ws://10.0.0.1:8080");
	assert_eq!(target.subprotocol, "ubus-json");
	assert_eq!(target.origin, "http://10.0.0.1");
}
