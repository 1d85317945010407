use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};

use crate::bridge::HubHandle;

/// Upgrades the connection into an observer channel
///
/// GET / (WebSocket)
///
/// The first frame is always the `init` snapshot; live events follow. Frames
/// sent by the client are ignored.
pub async fn observe(ws: WebSocketUpgrade, State(hub): State<HubHandle>) -> Response {
    ws.on_upgrade(move |socket| serve_observer(socket, hub))
}

async fn serve_observer(socket: WebSocket, hub: HubHandle) {
    let (observer, mut frames) = match hub.connect() {
        Ok(connection) => connection,
        Err(err) => {
            tracing::warn!(error = %err, "rejecting observer");
            return;
        }
    };
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if sink.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    hub.disconnect(observer);
}
