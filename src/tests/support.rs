//! Test doubles shared by the unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::broker::Broker;
use crate::bus::{BusSubscription, DeliveryCallback, PubSubTransport};
use crate::utils::error::BusError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusCall {
    Subscribe(String),
    Unsubscribe(String),
    Publish(String),
}

/// Bus that records every call and delivers through an in-process broker.
#[derive(Default)]
pub struct RecordingBus {
    inner: Broker,
    calls: Arc<Mutex<Vec<BusCall>>>,
    fail_subscribe: AtomicBool,
    fail_unsubscribe: Arc<AtomicBool>,
}

impl RecordingBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<BusCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&BusCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| pred(call)).count()
    }

    pub fn subscribes(&self) -> usize {
        self.count(|call| matches!(call, BusCall::Subscribe(_)))
    }

    pub fn unsubscribes(&self) -> usize {
        self.count(|call| matches!(call, BusCall::Unsubscribe(_)))
    }

    pub fn live_subscriptions(&self, subject: &str) -> usize {
        self.inner.subscriber_count(subject)
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn fail_unsubscribe(&self, fail: bool) {
        self.fail_unsubscribe.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PubSubTransport for RecordingBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        self.calls.lock().push(BusCall::Publish(subject.to_string()));
        self.inner.publish(subject, payload).await
    }

    async fn subscribe(
        &self,
        subject: &str,
        callback: DeliveryCallback,
    ) -> Result<Box<dyn BusSubscription>, BusError> {
        // Give concurrent joins a chance to interleave.
        tokio::task::yield_now().await;
        self.calls
            .lock()
            .push(BusCall::Subscribe(subject.to_string()));

        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(BusError::Subscribe {
                subject: subject.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let inner = self.inner.subscribe(subject, callback).await?;
        Ok(Box::new(RecordingSubscription {
            inner,
            calls: self.calls.clone(),
            fail: self.fail_unsubscribe.clone(),
        }))
    }
}

struct RecordingSubscription {
    inner: Box<dyn BusSubscription>,
    calls: Arc<Mutex<Vec<BusCall>>>,
    fail: Arc<AtomicBool>,
}

#[async_trait]
impl BusSubscription for RecordingSubscription {
    fn subject(&self) -> &str {
        self.inner.subject()
    }

    async fn unsubscribe(self: Box<Self>) -> Result<(), BusError> {
        let subject = self.inner.subject().to_string();
        self.calls.lock().push(BusCall::Unsubscribe(subject.clone()));
        // The local delivery is torn down either way so tests can observe it.
        self.inner.unsubscribe().await?;

        if self.fail.load(Ordering::SeqCst) {
            return Err(BusError::Unsubscribe {
                subject,
                reason: "connection lost".to_string(),
            });
        }
        Ok(())
    }
}
