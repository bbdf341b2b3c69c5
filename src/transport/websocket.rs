//! WebSocket server
//!
//! Accepts TCP connections, runs the WebSocket handshake, resolves the
//! request to a [`Route`] and serves the connection through the
//! [`Router`] with the matching handler. Every connection runs on its own
//! task; a failed handshake or a dead connection affects nobody else.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use uuid::Uuid;

use crate::client::Session;
use crate::router::{MessageHandler, Router};
use crate::transport::route::{Route, RouteError, USER_ID_HEADER};
use crate::utils::error::GatewayError;

#[derive(Clone)]
struct Handlers {
    echo: Arc<dyn MessageHandler>,
    document: Arc<dyn MessageHandler>,
}

/// Bind `addr` and serve connections until the task is dropped.
pub async fn start_websocket_server(addr: &str, router: Arc<Router>) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, router).await;
    Ok(())
}

/// Serve connections accepted on `listener`.
pub async fn serve(listener: TcpListener, router: Arc<Router>) {
    let handlers = Handlers {
        echo: router.echo_handler(),
        document: router.document_handler(),
    };

    if let Ok(addr) = listener.local_addr() {
        info!("WebSocket server listening on ws://{addr}");
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };

        let router = router.clone();
        let handlers = handlers.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, router, handlers).await {
                debug!(%peer, error = %e, "connection ended with error");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Arc<Router>,
    handlers: Handlers,
) -> Result<(), GatewayError> {
    let mut route = None;
    let resolve = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let user_header = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok());
        let target = req
            .uri()
            .path_and_query()
            .map_or("/", |target| target.as_str());

        match Route::parse(target, user_header) {
            Ok(resolved) => {
                route = Some(resolved);
                Ok(resp)
            }
            Err(e) => Err(reject(&e)),
        }
    };

    let socket = match accept_hdr_async(stream, resolve).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!(%peer, error = %e, "WebSocket handshake error");
            return Ok(());
        }
    };
    let Some(route) = route else {
        return Ok(());
    };

    let (session, handler) = match route {
        Route::Echo => (
            Session::new(format!("client-{}", Uuid::new_v4())),
            handlers.echo,
        ),
        Route::Document {
            document_id,
            user_id,
        } => (
            Session::new(user_id).with_document(document_id),
            handlers.document,
        ),
    };

    debug!(%peer, client_id = %session.client_id, "handshake complete");
    router
        .serve(socket, session.with_remote_addr(peer), handler)
        .await
}

fn reject(error: &RouteError) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(error.to_string()));
    *response.status_mut() = error.status();
    response
}
