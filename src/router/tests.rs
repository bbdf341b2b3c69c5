use super::envelope::{DocumentEvent, EditPayload};
use super::forward::forward_delivery;
use super::handler::MessageHandler;
use super::pump::{read_pump, write_pump};
use super::Router;
use crate::bus::SubjectScheme;
use crate::client::{Client, Session};
use crate::hub::Hub;
use crate::tests::support::{BusCall, RecordingBus};
use crate::transport::message::Frame;
use crate::utils::error::GatewayError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::{Sink, Stream};
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde_json::json;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tungstenite::protocol::Message as WsMessage;

fn edit() -> EditPayload {
    EditPayload {
        action: "insert".to_string(),
        position: 5,
        data: "x".to_string(),
    }
}

fn join(hub: &Hub, id: &str, topic: &str) -> mpsc::Receiver<Frame> {
    let (client, rx) = Client::new(Session::new(id).with_document(topic), 8);
    hub.register(client);
    rx
}

async fn recv(rx: &mut mpsc::Receiver<Frame>) -> Option<Frame> {
    tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .ok()
        .flatten()
}

#[test]
fn test_envelope_wire_shape() {
    let event = DocumentEvent {
        document_id: "doc1".to_string(),
        user_id: "alice".to_string(),
        timestamp: 1_725_000_000,
        payload: edit(),
    };

    let value: serde_json::Value = serde_json::from_slice(&event.to_bytes().unwrap()).unwrap();
    assert_eq!(
        value,
        json!({
            "document_id": "doc1",
            "user_id": "alice",
            "timestamp": 1_725_000_000,
            "payload": {"action": "insert", "position": 5, "data": "x"}
        })
    );
    assert!(DocumentEvent::from_bytes(b"{\"document_id\":1}").is_err());
}

#[test]
fn test_forward_skips_originating_client() {
    let hub = Hub::new();
    let mut alice = join(&hub, "alice", "doc1");
    let mut bob = join(&hub, "bob", "doc1");
    let mut carol = join(&hub, "carol", "doc2");

    let data = DocumentEvent::new("doc1", "alice", edit()).to_bytes().unwrap();
    assert_eq!(forward_delivery(&hub, "doc1", data.clone()), 1);

    assert_eq!(bob.try_recv().unwrap(), Frame::text(data));
    assert!(alice.try_recv().is_err());
    assert!(carol.try_recv().is_err());
}

#[test]
fn test_forward_undecodable_message_goes_to_whole_topic() {
    let hub = Hub::new();
    let mut alice = join(&hub, "alice", "doc1");
    let mut bob = join(&hub, "bob", "doc1");

    let garbage = Bytes::from_static(b"not json");
    assert_eq!(forward_delivery(&hub, "doc1", garbage.clone()), 2);
    assert_eq!(alice.try_recv().unwrap(), Frame::text(garbage.clone()));
    assert_eq!(bob.try_recv().unwrap(), Frame::text(garbage));
}

#[tokio::test]
async fn test_write_pump_preserves_order_and_closes() {
    let (client, outbound) = Client::new(Session::new("alice"), 8);
    for msg in ["o1", "o2", "o3"] {
        client.sender.try_send(Frame::text(msg)).unwrap();
    }
    drop(client);

    let (sink, written) = futures::channel::mpsc::unbounded::<WsMessage>();
    write_pump(sink, outbound, "alice".to_string()).await;

    let written: Vec<WsMessage> = written.collect().await;
    assert_eq!(
        written,
        vec![
            WsMessage::text("o1"),
            WsMessage::text("o2"),
            WsMessage::text("o3"),
            WsMessage::Close(None),
        ]
    );
}

#[tokio::test]
async fn test_write_pump_stops_on_write_error() {
    let (client, outbound) = Client::new(Session::new("alice"), 8);
    client.sender.try_send(Frame::text("o1")).unwrap();

    let (sink, written) = futures::channel::mpsc::unbounded::<WsMessage>();
    drop(written);

    // Returns even though the queue is still open.
    tokio::time::timeout(
        Duration::from_secs(1),
        write_pump(sink, outbound, "alice".to_string()),
    )
    .await
    .expect("write loop should stop on a dead transport");
    drop(client);
}

#[derive(Default)]
struct ScriptedHandler {
    seen: Mutex<Vec<Frame>>,
}

#[async_trait]
impl MessageHandler for ScriptedHandler {
    async fn on_connect(&self, _session: &Session) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn on_message(&self, session: &Session, frame: Frame) -> Result<(), GatewayError> {
        self.seen.lock().push(frame.clone());
        match &frame.data[..] {
            b"bad" => Err(GatewayError::MissingDocument(session.client_id.clone())),
            b"panic" => panic!("handler blew up"),
            _ => Ok(()),
        }
    }

    async fn on_disconnect(&self, _session: &Session) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_read_pump_survives_handler_failures_and_stops_on_error() {
    let handler = ScriptedHandler::default();
    let inbound: Vec<Result<WsMessage, String>> = vec![
        Ok(WsMessage::text("bad")),
        Ok(WsMessage::text("panic")),
        Ok(WsMessage::Ping(Bytes::new())),
        Ok(WsMessage::binary(vec![7u8])),
        Err("connection reset".to_string()),
        Ok(WsMessage::text("never")),
    ];

    read_pump(futures::stream::iter(inbound), &Session::new("alice"), &handler).await;

    assert_eq!(
        *handler.seen.lock(),
        vec![
            Frame::text("bad"),
            Frame::text("panic"),
            Frame::binary(vec![7u8]),
        ]
    );
}

#[tokio::test]
async fn test_read_pump_stops_on_close_frame() {
    let handler = ScriptedHandler::default();
    let inbound: Vec<Result<WsMessage, String>> = vec![
        Ok(WsMessage::text("one")),
        Ok(WsMessage::Close(None)),
        Ok(WsMessage::text("two")),
    ];

    read_pump(futures::stream::iter(inbound), &Session::new("alice"), &handler).await;
    assert_eq!(*handler.seen.lock(), vec![Frame::text("one")]);
}

#[tokio::test]
async fn test_document_handler_round_trip_excludes_sender() {
    let bus = RecordingBus::new();
    let router = Router::new(bus.clone(), SubjectScheme::default(), 8);
    let handler = router.document_handler();
    let hub = router.hub().clone();

    let alice = Session::new("alice").with_document("doc1");
    let bob = Session::new("bob").with_document("doc1");
    let mut alice_rx = join(&hub, "alice", "doc1");
    let mut bob_rx = join(&hub, "bob", "doc1");
    handler.on_connect(&alice).await.unwrap();
    handler.on_connect(&bob).await.unwrap();
    assert_eq!(router.registry().connection_count("doc1").await, 2);
    assert_eq!(bus.subscribes(), 1);

    let frame = Frame::text(r#"{"action":"insert","position":5,"data":"x"}"#);
    handler.on_message(&alice, frame).await.unwrap();
    assert!(bus.calls().contains(&BusCall::Publish("document.doc1.edit".to_string())));

    let received = recv(&mut bob_rx).await.expect("bob should receive the edit");
    let event = DocumentEvent::from_bytes(&received.data).unwrap();
    assert_eq!(event.user_id, "alice");
    assert_eq!(event.document_id, "doc1");
    assert_eq!(event.payload, edit());
    assert!(recv(&mut alice_rx).await.is_none());

    handler.on_disconnect(&alice).await.unwrap();
    handler.on_disconnect(&bob).await.unwrap();
    assert!(!router.registry().is_subscribed("doc1").await);
    assert_eq!(bus.unsubscribes(), 1);
}

#[tokio::test]
async fn test_document_handler_rejects_malformed_edit() {
    let bus = RecordingBus::new();
    let router = Router::new(bus.clone(), SubjectScheme::default(), 8);
    let handler = router.document_handler();
    let alice = Session::new("alice").with_document("doc1");

    let result = handler.on_message(&alice, Frame::text("{oops")).await;
    assert!(matches!(result, Err(GatewayError::Decode(_))));
    assert_eq!(bus.count(|call| matches!(call, BusCall::Publish(_))), 0);
}

#[tokio::test]
async fn test_document_handler_requires_document_id() {
    let bus = RecordingBus::new();
    let router = Router::new(bus.clone(), SubjectScheme::default(), 8);
    let handler = router.document_handler();

    let result = handler.on_connect(&Session::new("alice")).await;
    assert!(matches!(result, Err(GatewayError::MissingDocument(id)) if id == "alice"));
    assert_eq!(bus.subscribes(), 0);
}

#[tokio::test]
async fn test_echo_handler_sends_back_to_sender() {
    let bus = RecordingBus::new();
    let router = Router::new(bus, SubjectScheme::default(), 8);
    let handler = router.echo_handler();
    let (client, mut rx) = Client::new(Session::new("echo-1"), 8);
    router.hub().register(client);

    handler
        .on_message(&Session::new("echo-1"), Frame::binary(vec![1u8, 2, 3]))
        .await
        .unwrap();
    assert_eq!(rx.try_recv().unwrap(), Frame::binary(vec![1u8, 2, 3]));

    let result = handler
        .on_message(&Session::new("ghost"), Frame::text("x"))
        .await;
    assert!(matches!(result, Err(GatewayError::Hub(_))));
}

#[tokio::test]
async fn test_subjects_follow_configured_scheme() {
    let bus = RecordingBus::new();
    let router = Router::new(bus.clone(), SubjectScheme::new("notes", "change"), 8);
    let handler = router.document_handler();
    let alice = Session::new("alice").with_document("n1");

    handler.on_connect(&alice).await.unwrap();
    let payload = serde_json::to_vec(&edit()).unwrap();
    handler
        .on_message(&alice, Frame::binary(payload))
        .await
        .unwrap();

    assert_eq!(
        bus.calls(),
        vec![
            BusCall::Subscribe("notes.n1.change".to_string()),
            BusCall::Publish("notes.n1.change".to_string()),
        ]
    );
}

/// WebSocket stand-in backed by two unbounded channels.
struct MemorySocket {
    inbound: UnboundedReceiver<Result<WsMessage, String>>,
    outbound: UnboundedSender<WsMessage>,
}

/// The remote end of a [`MemorySocket`].
struct MemoryPeer {
    inbound: UnboundedSender<Result<WsMessage, String>>,
    outbound: UnboundedReceiver<WsMessage>,
}

fn memory_socket() -> (MemorySocket, MemoryPeer) {
    let (in_tx, in_rx) = unbounded();
    let (out_tx, out_rx) = unbounded();
    (
        MemorySocket {
            inbound: in_rx,
            outbound: out_tx,
        },
        MemoryPeer {
            inbound: in_tx,
            outbound: out_rx,
        },
    )
}

impl Stream for MemorySocket {
    type Item = Result<WsMessage, String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inbound.poll_next_unpin(cx)
    }
}

impl Sink<WsMessage> for MemorySocket {
    type Error = String;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), String>> {
        self.outbound.poll_ready(cx).map_err(|e| e.to_string())
    }

    fn start_send(self: Pin<&mut Self>, item: WsMessage) -> Result<(), String> {
        self.get_mut()
            .outbound
            .start_send(item)
            .map_err(|e| e.to_string())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
        self.outbound.close_channel();
        Poll::Ready(Ok(()))
    }
}

fn spawn_document_session(
    router: &Arc<Router>,
    socket: MemorySocket,
    user: &str,
    document: &str,
) -> JoinHandle<Result<(), GatewayError>> {
    let router = router.clone();
    let session = Session::new(user).with_document(document);
    tokio::spawn(async move {
        let handler = router.document_handler();
        router.serve(socket, session, handler).await
    })
}

async fn wait_for_connections(router: &Router, topic: &str, expected: usize) {
    for _ in 0..100 {
        if router.registry().connection_count(topic).await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{topic} never reached {expected} connections");
}

#[tokio::test]
async fn test_backpressure_eviction_runs_disconnect_hook() {
    let bus = RecordingBus::new();
    let router = Arc::new(Router::new(bus.clone(), SubjectScheme::default(), 1));
    let (socket, peer) = memory_socket();

    let session = spawn_document_session(&router, socket, "alice", "doc1");
    wait_for_connections(&router, "doc1", 1).await;
    assert_eq!(bus.subscribes(), 1);

    // Single-threaded runtime: the writer cannot drain between these calls.
    let hub = router.hub();
    assert_eq!(hub.broadcast_to_topic("doc1", Frame::text("e1"), None), 1);
    assert_eq!(hub.broadcast_to_topic("doc1", Frame::text("e2"), None), 0);
    assert!(!hub.contains("alice"));

    let result = tokio::time::timeout(Duration::from_secs(1), session)
        .await
        .expect("evicted connection should shut down")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(router.registry().connection_count("doc1").await, 0);
    assert!(!router.registry().is_subscribed("doc1").await);
    assert_eq!(bus.unsubscribes(), 1);
    assert_eq!(bus.live_subscriptions("document.doc1.edit"), 0);

    let written: Vec<WsMessage> =
        tokio::time::timeout(Duration::from_secs(1), peer.outbound.collect())
            .await
            .unwrap();
    assert_eq!(written, vec![WsMessage::text("e1"), WsMessage::Close(None)]);
}

#[tokio::test]
async fn test_reconnect_with_same_client_id_keeps_new_session() {
    let bus = RecordingBus::new();
    let router = Arc::new(Router::new(bus.clone(), SubjectScheme::default(), 8));
    let (first_socket, first_peer) = memory_socket();
    let (second_socket, mut second_peer) = memory_socket();

    let first = spawn_document_session(&router, first_socket, "alice", "doc1");
    wait_for_connections(&router, "doc1", 1).await;
    let second = spawn_document_session(&router, second_socket, "alice", "doc1");

    // Registering the second session closes the first one's queue.
    tokio::time::timeout(Duration::from_secs(1), first)
        .await
        .expect("replaced session should shut down")
        .unwrap()
        .unwrap();
    wait_for_connections(&router, "doc1", 1).await;

    assert!(router.hub().contains("alice"));
    assert_eq!(
        router
            .hub()
            .broadcast_to_topic("doc1", Frame::text("edit"), None),
        1
    );
    let next = tokio::time::timeout(Duration::from_secs(1), second_peer.outbound.next())
        .await
        .unwrap();
    assert_eq!(next, Some(WsMessage::text("edit")));

    let first_written: Vec<WsMessage> =
        tokio::time::timeout(Duration::from_secs(1), first_peer.outbound.collect())
            .await
            .unwrap();
    assert_eq!(first_written, vec![WsMessage::Close(None)]);

    drop(second_peer.inbound);
    tokio::time::timeout(Duration::from_secs(1), second)
        .await
        .expect("second session should end with its stream")
        .unwrap()
        .unwrap();
    assert_eq!(router.registry().connection_count("doc1").await, 0);
    assert!(!router.registry().is_subscribed("doc1").await);
    assert!(router.hub().is_empty());
}
