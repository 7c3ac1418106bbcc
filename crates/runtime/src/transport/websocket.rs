//! WebSocket transport over tokio-tungstenite.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{ORIGIN, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::{ConnectTarget, Connector, TransportEvent, TransportFuture, TransportParts, TransportSender};
use crate::error::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens `ws://` and `wss://` connections with the requested sub-protocol.
///
/// tungstenite masks every client frame, as RFC 6455 requires, so there is no
/// per-frame mask switch.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
	fn connect<'a>(&'a self, target: &'a ConnectTarget) -> TransportFuture<'a, TransportParts> {
		Box::pin(async move {
			let mut request = target
				.url
				.as_str()
				.into_client_request()
				.map_err(|e| Error::Transport(format!("invalid websocket url '{}': {}", target.url, e)))?;

			let headers = request.headers_mut();
			headers.insert(SEC_WEBSOCKET_PROTOCOL, header_value(&target.subprotocol)?);
			headers.insert(ORIGIN, header_value(&target.origin)?);

			tracing::debug!(url = %target.url, subprotocol = %target.subprotocol, "Opening websocket");

			let (stream, response) = connect_async(request)
				.await
				.map_err(|e| Error::Transport(format!("websocket connect failed: {}", e)))?;

			tracing::debug!(status = %response.status(), "Websocket handshake complete");

			let (sink, stream) = stream.split();
			let (events_tx, events_rx) = mpsc::unbounded_channel();
			tokio::spawn(read_loop(stream, events_tx));

			Ok(TransportParts {
				sender: Box::new(WebSocketSender { sink }),
				events: events_rx,
			})
		})
	}
}

fn header_value(value: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(value).map_err(|e| Error::Transport(format!("invalid header value '{}': {}", value, e)))
}

/// Forwards frames until the socket ends or nobody listens anymore.
async fn read_loop(mut stream: SplitStream<WsStream>, events: mpsc::UnboundedSender<TransportEvent>) {
	while let Some(message) = stream.next().await {
		let event = match message {
			Ok(Message::Text(text)) => TransportEvent::Message(text),
			Ok(Message::Binary(data)) => match String::from_utf8(data) {
				Ok(text) => TransportEvent::Message(text),
				Err(_) => {
					tracing::warn!("Ignoring non-UTF-8 binary frame");
					continue;
				}
			},
			Ok(Message::Close(frame)) => {
				let code = frame.map(|f| u16::from(f.code));
				let _ = events.send(TransportEvent::Closed(code));
				return;
			}
			Ok(_) => continue,
			Err(e) => {
				let _ = events.send(TransportEvent::Error(e.to_string()));
				return;
			}
		};

		if events.send(event).is_err() {
			return;
		}
	}

	let _ = events.send(TransportEvent::Closed(None));
}

/// Sending half of a websocket.
pub struct WebSocketSender {
	sink: SplitSink<WsStream, Message>,
}

impl TransportSender for WebSocketSender {
	fn send(&mut self, frame: String) -> TransportFuture<'_, ()> {
		Box::pin(async move { self.sink.send(Message::Text(frame)).await.map_err(|e| Error::Send(e.to_string())) })
	}

	fn close(&mut self) -> TransportFuture<'_, ()> {
		Box::pin(async move { self.sink.close().await.map_err(|e| Error::Transport(e.to_string())) })
	}
}
