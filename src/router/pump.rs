//! Per-connection read and write loops.
//!
//! Every connection runs one read loop and one write loop. Whichever ends
//! first ends the connection, and the cleanup order on every exit path is:
//! unregister from the hub (closing the outbound queue), then the handler's
//! disconnect hook. Cleanup only removes this connection's own hub entry, so
//! a session replaced by a newer one with the same client id leaves the newer
//! one running.

use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::{Client, ClientId, Session};
use crate::hub::Hub;
use crate::router::handler::MessageHandler;
use crate::transport::message::Frame;
use crate::utils::error::GatewayError;

/// Decode inbound messages and hand each one to `handler` until the stream
/// ends, fails, or the peer sends a close frame.
///
/// Handler errors and panics are logged and do not end the loop.
pub async fn read_pump<S, E>(mut stream: S, session: &Session, handler: &dyn MessageHandler)
where
    S: Stream<Item = Result<WsMessage, E>> + Unpin,
    E: Display,
{
    let client_id = session.client_id.as_str();

    while let Some(next) = stream.next().await {
        let msg = match next {
            Ok(msg) => msg,
            Err(e) => {
                debug!(client_id, error = %e, "read failed");
                break;
            }
        };
        if msg.is_close() {
            debug!(client_id, "peer closed connection");
            break;
        }
        let Some(frame) = Frame::from_ws(msg) else {
            continue;
        };

        match AssertUnwindSafe(handler.on_message(session, frame))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(client_id, error = %e, "message handler error"),
            Err(_) => error!(client_id, "message handler panicked"),
        }
    }
}

/// Drain the outbound queue into `sink` in arrival order.
///
/// Stops on the first write error. When the hub closes the queue, a close
/// frame is sent before returning.
pub async fn write_pump<K>(mut sink: K, mut outbound: mpsc::Receiver<Frame>, client_id: ClientId)
where
    K: Sink<WsMessage> + Unpin,
    K::Error: Display,
{
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = sink.send(WsMessage::from(frame)).await {
            warn!(%client_id, error = %e, "write failed");
            return;
        }
    }

    let _ = sink.send(WsMessage::Close(None)).await;
    debug!(%client_id, "outbound queue closed");
}

/// Run one connection from registration to teardown.
///
/// Registers the session with `hub`, runs the connect hook, then pumps
/// messages until either direction stops. If the connect hook fails the
/// connection is unregistered and no pumps are started.
pub async fn serve_connection<W, E>(
    socket: W,
    session: Session,
    hub: Arc<Hub>,
    handler: Arc<dyn MessageHandler>,
    queue_capacity: usize,
) -> Result<(), GatewayError>
where
    W: Stream<Item = Result<WsMessage, E>> + Sink<WsMessage, Error = E> + Send + 'static,
    E: Display + Send + 'static,
{
    let client_id = session.client_id.clone();
    let (client, outbound) = Client::new(session.clone(), queue_capacity);
    let connection_id = client.connection_id;
    hub.register(client);

    if let Err(e) = handler.on_connect(&session).await {
        hub.unregister_connection(&client_id, connection_id);
        warn!(%client_id, error = %e, "connect hook failed, dropping connection");
        return Err(e);
    }

    let (sink, stream) = socket.split::<WsMessage>();
    let mut writer = tokio::spawn(write_pump(sink, outbound, client_id.clone()));

    let writer_finished = tokio::select! {
        _ = read_pump(stream, &session, handler.as_ref()) => false,
        _ = &mut writer => true,
    };

    hub.unregister_connection(&client_id, connection_id);
    if let Err(e) = handler.on_disconnect(&session).await {
        warn!(%client_id, error = %e, "disconnect hook failed");
    }
    if !writer_finished {
        let _ = writer.await;
    }

    info!(%client_id, "connection closed");
    Ok(())
}
