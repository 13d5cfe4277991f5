//! Instrumented Store - Metrics Decorator for any `RemoteStore`
//!
//! Wraps a store adapter and records operation counts, outcomes and
//! latency in the Prometheus registry. Behaviour is otherwise unchanged.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::prometheus::MetricsRegistry;
use crate::error::StoreError;
use crate::ports::store::{RemoteStore, Revision, StorePath, Subscription, Versioned};

/// `RemoteStore` that reports every call to a [`MetricsRegistry`].
pub struct InstrumentedStore {
    inner: Arc<dyn RemoteStore>,
    metrics: Arc<MetricsRegistry>,
}

impl InstrumentedStore {
    pub fn new(inner: Arc<dyn RemoteStore>, metrics: Arc<MetricsRegistry>) -> Self {
        Self { inner, metrics }
    }

    fn record<T>(&self, op: &str, started: Instant, result: &Result<T, StoreError>) {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.observe_store_op(op, result.is_ok(), elapsed_ms);
    }
}

#[async_trait]
impl RemoteStore for InstrumentedStore {
    async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let started = Instant::now();
        let result = self.inner.read_once(path).await;
        self.record("read", started, &result);
        result
    }

    async fn read_versioned(&self, path: &StorePath) -> Result<Versioned, StoreError> {
        let started = Instant::now();
        let result = self.inner.read_versioned(path).await;
        self.record("read_versioned", started, &result);
        result
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        let started = Instant::now();
        let result = self.inner.subscribe(path).await;
        self.record("subscribe", started, &result);
        let subscription = result?;

        // Re-wrap so the gauge drops when the listener detaches
        let gauge = self.metrics.live_subscriptions.clone();
        gauge.inc();
        let (tx, rx) = tokio::sync::watch::channel(subscription.current());
        let forward_path = subscription.path().clone();
        let task = tokio::spawn(forward(subscription, tx));
        let abort = task.abort_handle();
        Ok(Subscription::new(forward_path, rx, move || {
            abort.abort();
            gauge.dec();
        }))
    }

    async fn write(&self, path: &StorePath, value: &Value) -> Result<(), StoreError> {
        let started = Instant::now();
        let result = self.inner.write(path, value).await;
        self.record("write", started, &result);
        result
    }

    async fn write_if(
        &self,
        path: &StorePath,
        value: &Value,
        expected: &Revision,
    ) -> Result<Revision, StoreError> {
        let started = Instant::now();
        let result = self.inner.write_if(path, value, expected).await;
        self.record("write_if", started, &result);
        result
    }

    async fn merge(&self, path: &StorePath, fields: &Map<String, Value>) -> Result<(), StoreError> {
        let started = Instant::now();
        let result = self.inner.merge(path, fields).await;
        self.record("merge", started, &result);
        result
    }

    fn append(&self, path: &StorePath) -> StorePath {
        self.inner.append(path)
    }

    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        let started = Instant::now();
        let result = self.inner.delete(path).await;
        self.record("delete", started, &result);
        result
    }

    async fn is_healthy(&self) -> bool {
        self.inner.is_healthy().await
    }
}

/// Relay snapshots from the wrapped subscription until either side closes.
async fn forward(mut inner: Subscription, tx: tokio::sync::watch::Sender<Option<Value>>) {
    loop {
        let next = tokio::select! {
            () = tx.closed() => return,
            next = inner.changed() => next,
        };
        let Ok(value) = next else {
            return;
        };
        tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
